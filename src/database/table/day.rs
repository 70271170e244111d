//! Day-level source data: `ana_stk_val_idx` (raw valuation columns) and
//! `stk_mkt` (closing prices), both filtered by `isvalid = 1`.

use std::collections::HashMap;

use anyhow::Result;
use sqlx::Row;

use crate::database;
use crate::model::{ClosingPrice, DayRow, RecalDayRow};

/// Physical-column -> canonical-name pairs for the 19 day-level metrics
/// (§3 `DayRow`), grounded in `fdhandle/metrics.py::Day`.
const DAY_METRICS: &[(&str, &str)] = &[
    ("PE", "pe_ratio"),
    ("PC", "pcf_ratio"),
    ("PB", "pb_ratio"),
    ("TCAP_1", "market_cap"),
    ("TCAP_2", "market_cap_2"),
    ("A_TCAP_1", "a_share_market_val"),
    ("A_TCAP_2", "a_share_market_val_2"),
    ("SRV", "val_of_stk_right"),
    ("EV1", "ev"),
    ("EV2", "ev_2"),
    ("EV_EBIT", "ev_to_ebit"),
    ("DIV_RATE", "dividend_yield"),
    ("PE1", "pe_ratio_1"),
    ("PE2", "pe_ratio_2"),
    ("PEG", "peg_ratio"),
    ("PC1", "pcf_ratio_1"),
    ("PC2", "pcf_ratio_2"),
    ("PC3", "pcf_ratio_3"),
    ("PS", "ps_ratio"),
];

fn select_list() -> String {
    let mut cols = vec!["inner_code".to_string(), "trd_date".to_string()];
    for (physical, canonical) in DAY_METRICS {
        cols.push(format!("{physical} AS \"{canonical}\""));
    }
    cols.join(", ")
}

/// §4.4 Step 1: rows for `inner_code`, optionally bounded to
/// `trd_date > latest_date` for incremental runs. Returned in the same
/// `trd_date DESC` order the source query returns; the Day Recomputer
/// reverses it to ascending before walking.
pub async fn fetch_day_rows(stockcode: &str, inner_code: i64, latest_date: Option<i32>) -> Result<Vec<DayRow>> {
    let sql = if latest_date.is_some() {
        format!(
            "SELECT {} FROM ana_stk_val_idx WHERE isvalid = 1 AND inner_code = $1 AND trd_date > $2 ORDER BY trd_date DESC",
            select_list()
        )
    } else {
        format!(
            "SELECT {} FROM ana_stk_val_idx WHERE isvalid = 1 AND inner_code = $1 ORDER BY trd_date DESC",
            select_list()
        )
    };

    let query = sqlx::query(&sql).bind(inner_code);
    let rows = if let Some(latest) = latest_date {
        query.bind(latest).fetch_all(database::source()).await?
    } else {
        query.fetch_all(database::source()).await?
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut metrics = HashMap::new();
            for (_, canonical) in DAY_METRICS {
                if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(*canonical) {
                    metrics.insert(*canonical, v);
                }
            }
            DayRow {
                stockcode: stockcode.to_string(),
                trd_date: row.try_get("trd_date").unwrap_or_default(),
                metrics,
            }
        })
        .collect())
}

/// §4.4 Step 2: `{tradedate -> tclose}` for `inner_code`.
pub async fn fetch_closing_prices(inner_code: i64) -> Result<HashMap<i32, f64>> {
    let rows = sqlx::query("SELECT tradedate, tclose FROM stk_mkt WHERE isvalid = 1 AND inner_code = $1")
        .bind(inner_code)
        .fetch_all(database::source())
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let price = ClosingPrice {
                inner_code,
                tradedate: row.try_get("tradedate").ok()?,
                tclose: row.try_get("tclose").ok()?,
            };
            Some((price.tradedate, price.tclose))
        })
        .collect())
}

/// Upserts one `orig_day` row: the as-read source metrics, unchanged, kept
/// so the Day Recomputer's output can be diffed against the raw input.
pub async fn upsert_orig_day(row: &DayRow) -> Result<()> {
    let metrics_json = serde_json::to_value(&row.metrics)?;
    sqlx::query(
        r#"
INSERT INTO orig_day (stockcode, tradedate, metrics)
VALUES ($1, $2, $3)
ON CONFLICT (stockcode, tradedate) DO UPDATE SET metrics = EXCLUDED.metrics
"#,
    )
    .bind(&row.stockcode)
    .bind(row.trd_date)
    .bind(metrics_json)
    .execute(database::dest())
    .await?;
    Ok(())
}

/// Upserts one `recal_day` row: the Day Recomputer's output (§4.4).
pub async fn upsert_recal_day(row: &RecalDayRow) -> Result<()> {
    let metrics_json = serde_json::to_value(&row.metrics)?;
    sqlx::query(
        r#"
INSERT INTO recal_day (stockcode, tradedate, metrics)
VALUES ($1, $2, $3)
ON CONFLICT (stockcode, tradedate) DO UPDATE SET metrics = EXCLUDED.metrics
"#,
    )
    .bind(&row.stockcode)
    .bind(row.trd_date)
    .bind(metrics_json)
    .execute(database::dest())
    .await?;
    Ok(())
}

/// `MIN(trd_date)` already present in `orig_day` for this stock: the
/// (intentionally inverted) incremental lower bound (§4.4, §9 Open
/// Questions). Reprocessing re-walks everything newer than the *earliest*
/// date already written rather than the latest, a known quirk inherited
/// from upstream and preserved here rather than silently fixed.
pub async fn min_processed_trd_date(stockcode: &str) -> Result<Option<i32>> {
    let row = sqlx::query("SELECT MIN(tradedate) AS min_date FROM orig_day WHERE stockcode = $1")
        .bind(stockcode)
        .fetch_one(database::dest())
        .await?;
    Ok(row.try_get("min_date").ok())
}
