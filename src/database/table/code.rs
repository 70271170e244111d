//! `stk_code`: the static `inner_code ↔ stockcode ↔ comcode` lookup table.

use anyhow::Result;
use sqlx::Row;

use crate::codemap::StkCodeRow;
use crate::database;

/// Fetches `stk_code` rows restricted to the short codes present in the
/// instrument universe (mirrors the `stockcode IN (...)` filter in
/// `fdhandle/stocks.py::_get_code_map`).
pub async fn fetch_restricted_to(short_codes: &[String]) -> Result<Vec<StkCodeRow>> {
    if short_codes.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        "SELECT comcode, inner_code, stockcode FROM stk_code WHERE stockcode = ANY($1)",
    )
    .bind(short_codes)
    .fetch_all(database::source())
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StkCodeRow {
            comcode: row.get("comcode"),
            inner_code: row.get("inner_code"),
            short_code: row.get("stockcode"),
        })
        .collect())
}
