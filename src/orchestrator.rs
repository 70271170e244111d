//! Top-level entry points: `update_quarter` runs the three pipeline stages
//! sequentially; `update_day` fans the per-stock Day Recomputer out over a
//! bounded worker pool, grounded in `stock_crawler::backfill::quote::process_quotes`'s
//! `stream::iter(..).for_each_concurrent(..)` pattern -- the async
//! equivalent of the original's fixed worker pool draining a shared queue.

use std::sync::Arc;

use anyhow::Result;
use futures::{stream, StreamExt};

use crate::codemap::CodeMaps;
use crate::database;
use crate::logging;
use crate::pipeline::{prepare, research, strategy};

/// Runs Research, then Prepare, then Strategy, over the whole instrument
/// universe. `first`: full rebuild vs. incremental (§4.2.1, §4.5).
pub async fn update_quarter(codemaps: &CodeMaps, first: bool, timeslot: i64) -> Result<()> {
    database::ensure_quarter_tables().await?;

    if first {
        research::run_first_full(codemaps).await?;
    } else {
        research::run_incremental(codemaps, timeslot).await?;
    }

    let stockcodes: Vec<String> = codemaps.all_stockcodes().map(str::to_string).collect();
    prepare::run(stockcodes.iter().map(String::as_str)).await?;
    strategy::run(stockcodes.iter().map(String::as_str)).await?;

    Ok(())
}

/// Ensures the day-level output tables exist, then recomputes every stock
/// in the universe concurrently, bounded by `pool_size` in-flight jobs. One
/// stock's failure is logged and does not cancel its siblings (§5).
pub async fn update_day(codemaps: Arc<CodeMaps>, first: bool, pool_size: usize) -> Result<()> {
    database::ensure_day_tables().await?;

    let stockcodes: Vec<String> = codemaps.all_stockcodes().map(str::to_string).collect();

    stream::iter(stockcodes)
        .for_each_concurrent(pool_size, |stockcode| {
            let codemaps = Arc::clone(&codemaps);
            async move {
                if let Err(e) = crate::pipeline::recomputer::run_for_stock(&codemaps, &stockcode, first).await {
                    logging::error(format!("day recompute failed for {stockcode}: {e:#}"));
                }
            }
        })
        .await;

    Ok(())
}
