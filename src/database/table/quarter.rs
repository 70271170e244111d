//! `research_quarter` / `prepare_quarter` / `strategy_quarter`: the three
//! quarter-pipeline tables, all sharing the same row shape and upsert
//! pattern, grounded in `financial_statement.rs`'s `ON CONFLICT ... DO
//! UPDATE SET ... EXCLUDED` idiom.

use std::collections::HashMap;

use anyhow::Result;
use sqlx::{postgres::PgQueryResult, Row};

use crate::database;
use crate::declare::RptSrc;
use crate::model::QuarterReport;

/// Which of the three identically-shaped tables a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterTable {
    Research,
    Prepare,
    Strategy,
}

impl QuarterTable {
    fn name(&self) -> &'static str {
        match self {
            QuarterTable::Research => "research_quarter",
            QuarterTable::Prepare => "prepare_quarter",
            QuarterTable::Strategy => "strategy_quarter",
        }
    }
}

/// All rows for one stock, ordered oldest-first (ascending `end_date`) --
/// the order `QuarterMetrics` and the gap-filling pass expect.
pub async fn fetch_for_stockcode(table: QuarterTable, stockcode: &str) -> Result<Vec<QuarterReport>> {
    let sql = format!(
        "SELECT stockcode, comcode, end_date, announce_date, announce_to, rpt_year, rpt_quarter, rpt_src, metrics \
         FROM {} WHERE stockcode = $1 ORDER BY end_date ASC",
        table.name()
    );
    let rows = sqlx::query(&sql).bind(stockcode).fetch_all(database::dest()).await?;
    Ok(rows.into_iter().map(row_to_report).collect())
}

/// Upserts one row, keyed on `(stockcode, end_date)`.
pub async fn upsert(table: QuarterTable, report: &QuarterReport) -> Result<PgQueryResult> {
    let sql = format!(
        r#"
INSERT INTO {table} (stockcode, comcode, end_date, announce_date, announce_to, rpt_year, rpt_quarter, rpt_src, metrics)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (stockcode, end_date) DO UPDATE SET
    comcode = EXCLUDED.comcode,
    announce_date = EXCLUDED.announce_date,
    announce_to = EXCLUDED.announce_to,
    rpt_year = EXCLUDED.rpt_year,
    rpt_quarter = EXCLUDED.rpt_quarter,
    rpt_src = EXCLUDED.rpt_src,
    metrics = EXCLUDED.metrics
"#,
        table = table.name()
    );

    let metrics_json = serde_json::to_value(&report.metrics)?;

    Ok(sqlx::query(&sql)
        .bind(&report.stockcode)
        .bind(report.comcode)
        .bind(report.end_date)
        .bind(report.announce_date)
        .bind(report.announce_to)
        .bind(report.rpt_year)
        .bind(report.rpt_quarter as i16)
        .bind(report.rpt_src.map(|s| s.source_literal()))
        .bind(metrics_json)
        .execute(database::dest())
        .await?)
}

/// Deletes one row by its primary key, used by Prepare's late-announcement
/// pruning pass (§4.2.2).
pub async fn delete(table: QuarterTable, stockcode: &str, end_date: i32) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE stockcode = $1 AND end_date = $2", table.name());
    sqlx::query(&sql).bind(stockcode).bind(end_date).execute(database::dest()).await?;
    Ok(())
}

/// Deletes every row whose `rpt_src IS NULL` for a stock, used by Research
/// cleanup pass 1 (§4.2.1): rows that never matched a statement table.
pub async fn delete_unmatched(stockcode: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM research_quarter WHERE stockcode = $1 AND rpt_src IS NULL")
        .bind(stockcode)
        .execute(database::dest())
        .await?;
    Ok(result.rows_affected())
}

fn row_to_report(row: sqlx::postgres::PgRow) -> QuarterReport {
    let rpt_src: Option<String> = row.try_get("rpt_src").ok();
    let metrics_json: serde_json::Value = row.try_get("metrics").unwrap_or(serde_json::json!({}));
    QuarterReport {
        stockcode: row.try_get("stockcode").unwrap_or_default(),
        comcode: row.try_get("comcode").unwrap_or_default(),
        end_date: row.try_get("end_date").unwrap_or_default(),
        announce_date: row.try_get("announce_date").ok(),
        announce_to: row.try_get("announce_to").unwrap_or(crate::model::ANNOUNCE_TO_OPEN),
        rpt_year: row.try_get("rpt_year").unwrap_or_default(),
        rpt_quarter: row.try_get::<i16, _>("rpt_quarter").unwrap_or_default() as u8,
        rpt_src: rpt_src.as_deref().and_then(RptSrc::from_source_literal),
        metrics: json_to_metrics(metrics_json),
    }
}

fn json_to_metrics(value: serde_json::Value) -> HashMap<&'static str, f64> {
    let mut metrics = HashMap::new();
    if let serde_json::Value::Object(map) = value {
        for (key, v) in map {
            if let (Some(canonical), Some(num)) = (intern_metric_name(&key), v.as_f64()) {
                metrics.insert(canonical, num);
            }
        }
    }
    metrics
}

/// Maps a JSON key back to the catalogue's static string, since the metric
/// map key type is `&'static str` rather than an owned `String`. Only
/// catalogue metrics are persisted here; the bundle values `QuarterMetrics`
/// derives at read time are never written back to these tables.
fn intern_metric_name(name: &str) -> Option<&'static str> {
    crate::metric_schema::METRICS
        .iter()
        .find(|m| m.canonical_name == name)
        .map(|m| m.canonical_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_table_names_are_distinct() {
        assert_eq!(QuarterTable::Research.name(), "research_quarter");
        assert_eq!(QuarterTable::Prepare.name(), "prepare_quarter");
        assert_eq!(QuarterTable::Strategy.name(), "strategy_quarter");
    }

    #[test]
    fn json_roundtrips_known_metric() {
        let mut metrics = HashMap::new();
        metrics.insert("revenue", 123.4);
        let json = serde_json::to_value(&metrics).unwrap();
        let back = json_to_metrics(json);
        assert_eq!(back.get("revenue"), Some(&123.4));
    }

    #[test]
    fn unknown_metric_name_is_dropped() {
        let json = serde_json::json!({ "not_a_real_metric": 1.0 });
        let back = json_to_metrics(json);
        assert!(back.is_empty());
    }
}
