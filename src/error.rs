//! Error taxonomy for the parts of the pipeline that callers need to match on.
//!
//! Everything else flows through `anyhow::Error` with `.context(...)` added
//! at the point of failure, the same way `stock_crawler` does it. These
//! variants exist only where the caller's behavior actually branches on the
//! failure kind (§7 of the spec): a mapping miss aborts one stock's job but
//! not its siblings, a schema assertion aborts one stock's announce-date
//! pass, a config failure is fatal at process init.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    FileNotFound(String),
    #[error("missing required config key: {0}")]
    MissingKey(String),
    #[error("failed to read instrument file {path}: {source}")]
    InstrumentFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("orderbookid {0} has no corresponding inner_code in the code map")]
    OrderBookIdNotFound(String),
    #[error("comcode {0} maps to no stockcode in the instrument universe")]
    ComcodeNotFound(i64),
}

#[derive(Debug, Error)]
pub enum PipelineInvariant {
    #[error("record for stockcode is missing required field `{0}` during announce date adjustment")]
    MissingField(&'static str),
    #[error(
        "announce_date non-monotone for {stockcode}: end_date={end_date} announce_date={announce_date} is not strictly older than the previous {previous_announce_date}"
    )]
    NonMonotoneAnnounceDate {
        stockcode: String,
        end_date: i32,
        announce_date: i32,
        previous_announce_date: i32,
    },
    #[error(
        "announce_to mismatch for {stockcode} end_date={end_date}: expected {expected}, found {found}"
    )]
    AnnounceToMismatch {
        stockcode: String,
        end_date: i32,
        expected: i32,
        found: i32,
    },
    #[error("end_date {end_date} is not older than its own announce_date {announce_date} for {stockcode}")]
    EndDateNotBeforeAnnounce {
        stockcode: String,
        end_date: i32,
        announce_date: i32,
    },
}
