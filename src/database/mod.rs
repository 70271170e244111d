//! Two lazily-initialized connection pools: `source` (the upstream Genius
//! database, read-only) and `dest` (the database this engine owns and
//! writes `research_quarter`/`prepare_quarter`/`strategy_quarter`/
//! `orig_day`/`recal_day` into). Mirrors `stock_crawler::database`'s
//! `OnceLock`-backed `PostgresSQL`, generalized to two independently
//! configured pools instead of one.

use std::sync::OnceLock;

use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::Connection;

pub mod table;

static SOURCE: OnceLock<PgPool> = OnceLock::new();
static DEST: OnceLock<PgPool> = OnceLock::new();

/// Must be called once at process startup before `source()`/`dest()` are
/// used. Connects lazily (no round-trip yet); failures surface on first
/// query.
pub fn init(source: &Connection, dest: &Connection) {
    let source_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&source.url())
        .unwrap_or_else(|_| panic!("wrong source database URL {}", source.url()));
    let dest_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&dest.url())
        .unwrap_or_else(|_| panic!("wrong dest database URL {}", dest.url()));

    SOURCE.set(source_pool).ok();
    DEST.set(dest_pool).ok();
}

pub fn source() -> &'static PgPool {
    SOURCE.get().expect("database::init was not called")
}

pub fn dest() -> &'static PgPool {
    DEST.get().expect("database::init was not called")
}

/// `CREATE TABLE IF NOT EXISTS` for the two day-level output tables,
/// grounded in `fdhandle/createtable.py::_create_day`. Called once before
/// `update_day` starts writing (§4.5).
pub async fn ensure_day_tables() -> Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS orig_day (
    stockcode TEXT NOT NULL,
    tradedate INTEGER NOT NULL,
    metrics JSONB NOT NULL DEFAULT '{}'::jsonb,
    PRIMARY KEY (stockcode, tradedate)
)"#,
    )
    .execute(dest())
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS recal_day (
    stockcode TEXT NOT NULL,
    tradedate INTEGER NOT NULL,
    metrics JSONB NOT NULL DEFAULT '{}'::jsonb,
    PRIMARY KEY (stockcode, tradedate)
)"#,
    )
    .execute(dest())
    .await?;

    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` for the three quarter-pipeline tables,
/// grounded in `fdhandle/createtable.py::_create_quarter`.
pub async fn ensure_quarter_tables() -> Result<()> {
    for table in ["research_quarter", "prepare_quarter", "strategy_quarter"] {
        let sql = format!(
            r#"
CREATE TABLE IF NOT EXISTS {table} (
    stockcode TEXT NOT NULL,
    comcode BIGINT NOT NULL,
    end_date INTEGER NOT NULL,
    announce_date INTEGER,
    announce_to INTEGER NOT NULL DEFAULT 29991231,
    rpt_year INTEGER NOT NULL,
    rpt_quarter SMALLINT NOT NULL,
    rpt_src TEXT,
    metrics JSONB NOT NULL DEFAULT '{{}}'::jsonb,
    PRIMARY KEY (stockcode, end_date)
)"#
        );
        sqlx::query(&sql).execute(dest()).await?;
    }
    Ok(())
}
