//! Core data shapes moved between pipeline stages.
//!
//! Metrics are kept in an open map rather than fixed struct fields: the set
//! of columns that exist is a property of the metric catalogue
//! (`metric_schema`), not of the type system.

use std::collections::HashMap;

use crate::declare::RptSrc;

/// One row of `research_quarter` / `prepare_quarter` / `strategy_quarter`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterReport {
    pub stockcode: String,
    pub comcode: i64,
    pub end_date: i32,
    pub announce_date: Option<i32>,
    pub announce_to: i32,
    pub rpt_year: i32,
    pub rpt_quarter: u8,
    pub rpt_src: Option<RptSrc>,
    pub metrics: HashMap<&'static str, f64>,
}

/// Sentinel `announce_to` for a report that has no newer neighbor yet.
pub const ANNOUNCE_TO_OPEN: i32 = 29991231;

impl QuarterReport {
    pub fn new(stockcode: String, comcode: i64, end_date: i32) -> Self {
        let rpt_year = end_date / 10000;
        let rpt_quarter = ((end_date % 10000) / 300) as u8;
        QuarterReport {
            stockcode,
            comcode,
            end_date,
            announce_date: None,
            announce_to: ANNOUNCE_TO_OPEN,
            rpt_year,
            rpt_quarter,
            rpt_src: None,
            metrics: HashMap::new(),
        }
    }

    /// A "placeholder" report materialized to fill a gap in the per-stock
    /// history (§4.3): carries period identity only, no announce date and no
    /// metrics, and is skipped by every consumer that requires announced data.
    pub fn placeholder(stockcode: String, rpt_year: i32, rpt_quarter: u8, end_date: i32) -> Self {
        QuarterReport {
            stockcode,
            comcode: 0,
            end_date,
            announce_date: None,
            announce_to: ANNOUNCE_TO_OPEN,
            rpt_year,
            rpt_quarter,
            rpt_src: None,
            metrics: HashMap::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.announce_date.is_none()
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn set_metric(&mut self, name: &'static str, value: Option<f64>) {
        match value {
            Some(v) => {
                self.metrics.insert(name, v);
            }
            None => {
                self.metrics.remove(name);
            }
        }
    }
}

/// A raw day-level row sourced from `ana_stk_val_idx`.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRow {
    pub stockcode: String,
    pub trd_date: i32,
    pub metrics: HashMap<&'static str, f64>,
}

impl DayRow {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn set_metric(&mut self, name: &'static str, value: Option<f64>) {
        match value {
            Some(v) => {
                self.metrics.insert(name, v);
            }
            None => {
                self.metrics.remove(name);
            }
        }
    }
}

/// Day-level close, from `stk_mkt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosingPrice {
    pub inner_code: i64,
    pub tradedate: i32,
    pub tclose: f64,
}

/// Same shape as `DayRow` plus the ratio columns computed by the Day
/// Recomputer (§4.4). Kept as a thin wrapper rather than a distinct field
/// list since every ratio is just another entry in the same metric map.
#[derive(Debug, Clone, PartialEq)]
pub struct RecalDayRow {
    pub stockcode: String,
    pub trd_date: i32,
    pub metrics: HashMap<&'static str, f64>,
}

impl RecalDayRow {
    pub fn from_day_row(row: &DayRow) -> Self {
        RecalDayRow {
            stockcode: row.stockcode.clone(),
            trd_date: row.trd_date,
            metrics: row.metrics.clone(),
        }
    }

    pub fn set_metric(&mut self, name: &'static str, value: Option<f64>) {
        match value {
            Some(v) => {
                self.metrics.insert(name, v);
            }
            None => {
                self.metrics.remove(name);
            }
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Metric names pulled from `QuarterMetrics::get`'s returned bundle,
/// consumed directly by name at the Day Recomputer's ratio formulas.
pub mod bundle_keys {
    pub const END_DATE: &str = "end_date";
    pub const INTEREST_BEARING_DEBT: &str = "interest_bearing_debt";
    pub const EBITDA: &str = "ebitda";
    pub const NET_PROFIT_PARENT_COMPANY: &str = "net_profit_parent_company";
    pub const BOOK_VALUE_PER_SHARE: &str = "book_value_per_share";
    pub const CASH_TOTAL: &str = "cash_total";

    pub const STRAIGHT_NET_PROFIT: &str = "straight_net_profit";
    pub const STRAIGHT_CASH_FLOW_FROM_OPERATING_ACTIVITIES: &str =
        "straight_cash_flow_from_operating_activities";
    pub const STRAIGHT_CASH: &str = "straight_cash";
    pub const STRAIGHT_CASH_EQUIVALENT: &str = "straight_cash_equivalent";
    pub const STRAIGHT_CASH_EQUIVALENT_INC_NET: &str = "straight_cash_equivalent_inc_net";

    pub const LATEST_CASH_FLOW_FROM_OPERATING_ACTIVITIES: &str =
        "latest_cash_flow_from_operating_activities";
    pub const LATEST_CASH: &str = "latest_cash";
    pub const LATEST_CASH_EQUIVALENT: &str = "latest_cash_equivalent";
    pub const LATEST_REVENUE: &str = "latest_revenue";
    pub const LATEST_OPERATING_REVENUE: &str = "latest_operating_revenue";
    pub const LATEST_NET_PROFIT_PARENT_COMPANY: &str = "latest_net_profit_parent_company";
    pub const LATEST_CASH_EQUIVALENT_INC_NET: &str = "latest_cash_equivalent_inc_net";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_derives_year_and_quarter() {
        let r = QuarterReport::new("000001.XSHE".to_string(), 1, 20230930);
        assert_eq!(r.rpt_year, 2023);
        assert_eq!(r.rpt_quarter, 3);
        assert_eq!(r.announce_to, ANNOUNCE_TO_OPEN);
    }

    #[test]
    fn placeholder_has_no_announce_date() {
        let p = QuarterReport::placeholder("000001.XSHE".to_string(), 2022, 4, 20221231);
        assert!(p.is_placeholder());
        assert!(p.metrics.is_empty());
    }

    #[test]
    fn metric_set_none_removes_entry() {
        let mut r = QuarterReport::new("000001.XSHE".to_string(), 1, 20230930);
        r.set_metric("revenue", Some(10.0));
        assert_eq!(r.metric("revenue"), Some(10.0));
        r.set_metric("revenue", None);
        assert_eq!(r.metric("revenue"), None);
    }
}
