//! Strategy stage: copies `prepare_quarter` into `strategy_quarter`, then
//! re-upserts `(stockcode, end_date, announce_to, comcode)` from
//! `prepare_quarter` to refresh `announce_to` for the newest quarter whose
//! downstream neighbor did not exist yet at Prepare time (§4.2.3), then runs
//! the post-pipeline `verify_declare` assertion for the stock.

use anyhow::Result;

use crate::database::table::quarter::{self, QuarterTable};
use crate::logging;
use crate::pipeline::verify;

pub async fn run(stockcodes: impl Iterator<Item = &str>) -> Result<()> {
    for stockcode in stockcodes {
        if let Err(e) = run_for_stock(stockcode).await {
            logging::error(format!("strategy stage failed for {stockcode}: {e:#}"));
        }
    }
    Ok(())
}

async fn run_for_stock(stockcode: &str) -> Result<()> {
    let prepared = quarter::fetch_for_stockcode(QuarterTable::Prepare, stockcode).await?;
    for row in &prepared {
        quarter::upsert(QuarterTable::Strategy, row).await?;
    }

    let mut refresh = quarter::fetch_for_stockcode(QuarterTable::Prepare, stockcode).await?;
    refresh.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    for row in refresh {
        quarter::upsert(QuarterTable::Strategy, &row).await?;
    }

    verify::verify_declare(stockcode).await?;
    Ok(())
}
