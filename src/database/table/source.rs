//! Queries against the four upstream source tables that feed the Research
//! stage (§4.2.1, §6.2).

use anyhow::Result;
use sqlx::Row;

use crate::database;
use crate::metric_schema::{metrics_for, SourceTable};

#[derive(Debug, Clone)]
pub struct SourceRow {
    pub comcode: i64,
    pub end_date: i32,
    /// Absent for the indicator table, which carries no declaration date.
    pub announce_date: Option<i32>,
    /// Absent for the indicator table, which carries no `rpt_src` column.
    pub rpt_src: Option<String>,
    pub mtime: chrono::NaiveDate,
    pub metrics: std::collections::HashMap<&'static str, f64>,
}

fn select_list(source: SourceTable) -> String {
    let mut cols = vec!["comcode".to_string(), "enddate AS end_date".to_string(), "mtime".to_string()];
    if source.has_rpt_src() {
        cols.push("declaredate AS announce_date".to_string());
        cols.push("rpt_src".to_string());
    }
    for metric in metrics_for(source) {
        cols.push(format!("{} AS \"{}\"", metric.physical_name, metric.canonical_name));
    }
    cols.join(", ")
}

/// Queries `source` for one `comcode`, applying its table's standard filter
/// plus `rpt_date = enddate` already baked into that filter (§6.2).
pub async fn fetch_for_comcode(source: SourceTable, comcode: i64) -> Result<Vec<SourceRow>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} AND comcode = $1",
        select_list(source),
        source.table_name(),
        source.filter_sql()
    );
    let rows = sqlx::query(&sql).bind(comcode).fetch_all(database::source()).await?;
    Ok(rows.into_iter().map(|r| row_to_source_row(source, r)).collect())
}

/// Incremental variant: rows whose `mtime` falls on `day` (§4.2.1).
pub async fn fetch_for_mtime_day(source: SourceTable, day: chrono::NaiveDate) -> Result<Vec<SourceRow>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} AND mtime::date = $1",
        select_list(source),
        source.table_name(),
        source.filter_sql()
    );
    let rows = sqlx::query(&sql).bind(day).fetch_all(database::source()).await?;
    Ok(rows.into_iter().map(|r| row_to_source_row(source, r)).collect())
}

fn row_to_source_row(source: SourceTable, row: sqlx::postgres::PgRow) -> SourceRow {
    let mut metrics = std::collections::HashMap::new();
    for metric in metrics_for(source) {
        if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(metric.canonical_name) {
            metrics.insert(metric.canonical_name, value);
        }
    }

    SourceRow {
        comcode: row.try_get("comcode").unwrap_or_default(),
        end_date: row.try_get("end_date").unwrap_or_default(),
        announce_date: if source.has_rpt_src() {
            row.try_get("announce_date").ok()
        } else {
            None
        },
        rpt_src: if source.has_rpt_src() {
            row.try_get("rpt_src").ok()
        } else {
            None
        },
        mtime: row.try_get("mtime").unwrap_or_default(),
        metrics,
    }
}

/// Distinct `mtime` calendar days >= `since` for a source table, driving
/// the incremental Research build's outer loop (§4.2.1).
pub async fn distinct_mtime_days(source: SourceTable, since: chrono::NaiveDate) -> Result<Vec<chrono::NaiveDate>> {
    let sql = format!(
        "SELECT DISTINCT mtime::date AS d FROM {} WHERE {} AND mtime::date >= $1 ORDER BY d",
        source.table_name(),
        source.filter_sql()
    );
    let rows = sqlx::query(&sql).bind(since).fetch_all(database::source()).await?;
    Ok(rows.into_iter().filter_map(|r| r.try_get::<chrono::NaiveDate, _>("d").ok()).collect())
}
