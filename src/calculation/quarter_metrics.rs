//! Per-stock cursor over a finalized (`strategy_quarter`) report history.
//!
//! The upstream algorithm this is based on keeps a mutable cursor that only
//! ever advances, and assumes callers invoke `get` with non-decreasing
//! trading dates. Here `get` instead binary-searches the as-of report fresh
//! on every call: the report list is sorted by `end_date` descending, so
//! locating the report for a given candidate period-end is a
//! `binary_search_by` over the reversed ordering. This drops the
//! monotonicity requirement entirely — any call order gives the same answer
//! a freshly constructed instance would — while selecting the same report
//! and computing the same four-straight/four-latest bundle as the original
//! for the ascending, monotonic access pattern the Day Recomputer actually
//! uses. The four-straight/four-latest bundle for a resolved report index
//! is computed once and memoized in a map keyed by that index, which is
//! what a "cache keyed by the would-be generation counter" collapses to
//! once the cursor itself is no longer mutable state.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::calculation::calendar::{latest_ends, period_end};
use crate::model::{bundle_keys as k, QuarterReport};

const STRAIGHT_METRICS: &[&str] = &[
    "net_profit",
    "cash_flow_from_operating_activities",
    "cash",
    "cash_equivalent",
    "cash_equivalent_inc_net",
];

const LATEST_METRICS: &[&str] = &[
    "cash_flow_from_operating_activities",
    "cash",
    "cash_equivalent",
    "revenue",
    "operating_revenue",
    "net_profit_parent_company",
    "cash_equivalent_inc_net",
];

pub struct QuarterMetrics {
    /// Contiguous history, newest first, with placeholders filling any gap
    /// quarter so that `index + offset` addressing is always valid.
    reports: Vec<QuarterReport>,
    bundle_cache: RefCell<HashMap<usize, HashMap<&'static str, f64>>>,
}

impl QuarterMetrics {
    /// `raw` must already be in `end_date` descending order (as queried from
    /// `strategy_quarter`). Gaps between consecutive quarters are filled
    /// with placeholder reports so offset addressing (`index + quarter`,
    /// `index + 4`) is always in range for any quarter that exists between
    /// the oldest and newest report.
    pub fn new(stockcode: &str, raw: Vec<QuarterReport>) -> Self {
        QuarterMetrics {
            reports: fill_gaps(stockcode, raw),
            bundle_cache: RefCell::new(HashMap::new()),
        }
    }

    fn index_for_end_date(&self, end_date: i32) -> Option<usize> {
        self.reports
            .binary_search_by(|probe| probe.end_date.cmp(&end_date).reverse())
            .ok()
    }

    /// Resolves the as-of report for `trading_date` and returns its metric
    /// bundle. Empty if no announced report covers this trading date yet.
    pub fn get(&self, trading_date: i32) -> HashMap<&'static str, f64> {
        let Some(cur_index) = self.resolve_index(trading_date) else {
            return HashMap::new();
        };

        let mut bundle = self.bundle_for(cur_index).clone();
        bundle.insert(k::END_DATE, self.reports[cur_index].end_date as f64);
        bundle
    }

    fn resolve_index(&self, trading_date: i32) -> Option<usize> {
        for candidate in latest_ends(trading_date) {
            let Some(idx) = self.index_for_end_date(candidate) else {
                continue;
            };
            let report = &self.reports[idx];
            match report.announce_date {
                Some(announce_date) if announce_date <= trading_date => return Some(idx),
                _ => continue,
            }
        }
        None
    }

    fn bundle_for(&self, cur_index: usize) -> std::cell::Ref<'_, HashMap<&'static str, f64>> {
        if !self.bundle_cache.borrow().contains_key(&cur_index) {
            let bundle = self.compute_bundle(cur_index);
            self.bundle_cache.borrow_mut().insert(cur_index, bundle);
        }
        std::cell::Ref::map(self.bundle_cache.borrow(), |cache| &cache[&cur_index])
    }

    fn compute_bundle(&self, cur_index: usize) -> HashMap<&'static str, f64> {
        let mut ret = HashMap::new();
        let report = &self.reports[cur_index];

        if let Some(v) = report.metric("interest_bearing_debt") {
            ret.insert(k::INTEREST_BEARING_DEBT, v);
        }
        if let Some(v) = report.metric("ebitda") {
            ret.insert(k::EBITDA, v);
        }
        if let Some(v) = report.metric("net_profit_parent_company") {
            ret.insert(k::NET_PROFIT_PARENT_COMPANY, v);
        }
        if let Some(v) = report.metric("book_value_per_share") {
            ret.insert(k::BOOK_VALUE_PER_SHARE, v);
        }

        let cash_total = report.metric("cash").unwrap_or(0.0) + report.metric("cash_equivalent").unwrap_or(0.0);
        ret.insert(k::CASH_TOTAL, cash_total);

        for (name, value) in self.four_straight(cur_index) {
            ret.insert(straight_key(name), value);
        }
        for (name, value) in self.four_latest(cur_index) {
            ret.insert(latest_key(name), value);
        }

        ret
    }

    /// `straight_<name> = R[name]` when `R` is an annual report; otherwise
    /// `R[name] + A[name] - S[name]` where `A` is the prior fiscal year's
    /// Q4 and `S` is the same quarter one year earlier. Skipped if `A`/`S`
    /// are placeholders, out of range, or any of the three values is absent.
    fn four_straight(&self, cur_index: usize) -> Vec<(&'static str, f64)> {
        let report = &self.reports[cur_index];
        let mut out = Vec::new();

        if report.rpt_quarter == 4 {
            for name in STRAIGHT_METRICS {
                if let Some(v) = report.metric(name) {
                    out.push((*name, v));
                }
            }
            return out;
        }

        let annual_index = cur_index + report.rpt_quarter as usize;
        let same_index = cur_index + 4;
        if annual_index >= self.reports.len() || same_index >= self.reports.len() {
            return out;
        }
        let annual = &self.reports[annual_index];
        let same = &self.reports[same_index];
        if annual.is_placeholder() || same.is_placeholder() {
            return out;
        }

        for name in STRAIGHT_METRICS {
            let (Some(cur), Some(a), Some(s)) = (report.metric(name), annual.metric(name), same.metric(name)) else {
                continue;
            };
            out.push((*name, cur + a - s));
        }
        out
    }

    /// Annualizes a partial-year accumulation by a quarter-count multiplier.
    fn four_latest(&self, cur_index: usize) -> Vec<(&'static str, f64)> {
        let report = &self.reports[cur_index];
        let mut out = Vec::new();
        for name in LATEST_METRICS {
            let Some(v) = report.metric(name) else {
                continue;
            };
            let scaled = match report.rpt_quarter {
                4 => v,
                3 => v * 4.0 / 3.0,
                2 => v * 2.0,
                _ => v * 4.0,
            };
            out.push((*name, scaled));
        }
        out
    }

    /// The placeholder-aware report whose `end_date` is the prior calendar
    /// year's Q4 period-end. Used only for PEG's growth denominator.
    pub fn latest_annual_report(&self, trading_date: i32) -> Option<&QuarterReport> {
        let prior_year = trading_date / 10000 - 1;
        let end_date = period_end(prior_year, 4);
        self.index_for_end_date(end_date).map(|idx| &self.reports[idx])
    }
}

fn straight_key(name: &str) -> &'static str {
    match name {
        "net_profit" => k::STRAIGHT_NET_PROFIT,
        "cash_flow_from_operating_activities" => k::STRAIGHT_CASH_FLOW_FROM_OPERATING_ACTIVITIES,
        "cash" => k::STRAIGHT_CASH,
        "cash_equivalent" => k::STRAIGHT_CASH_EQUIVALENT,
        "cash_equivalent_inc_net" => k::STRAIGHT_CASH_EQUIVALENT_INC_NET,
        other => panic!("unknown straight metric {other}"),
    }
}

fn latest_key(name: &str) -> &'static str {
    match name {
        "cash_flow_from_operating_activities" => k::LATEST_CASH_FLOW_FROM_OPERATING_ACTIVITIES,
        "cash" => k::LATEST_CASH,
        "cash_equivalent" => k::LATEST_CASH_EQUIVALENT,
        "revenue" => k::LATEST_REVENUE,
        "operating_revenue" => k::LATEST_OPERATING_REVENUE,
        "net_profit_parent_company" => k::LATEST_NET_PROFIT_PARENT_COMPANY,
        "cash_equivalent_inc_net" => k::LATEST_CASH_EQUIVALENT_INC_NET,
        other => panic!("unknown latest metric {other}"),
    }
}

/// Materializes the contiguous newest-to-oldest sequence, inserting
/// placeholder reports (period identity only, no announce date or metrics)
/// for any `(year, quarter)` between the newest and oldest actual report
/// that the raw query didn't return.
fn fill_gaps(stockcode: &str, raw: Vec<QuarterReport>) -> Vec<QuarterReport> {
    if raw.is_empty() {
        return raw;
    }

    let latest = (raw[0].rpt_year, raw[0].rpt_quarter);
    let first = (raw[raw.len() - 1].rpt_year, raw[raw.len() - 1].rpt_quarter);

    let mut filled = Vec::with_capacity(raw.len());
    let mut raw_iter = raw.into_iter().peekable();

    let mut year = latest.0;
    let mut quarter = latest.1;
    loop {
        if let Some(next) = raw_iter.peek() {
            if (next.rpt_year, next.rpt_quarter) == (year, quarter) {
                filled.push(raw_iter.next().unwrap());
            } else {
                filled.push(QuarterReport::placeholder(
                    stockcode.to_string(),
                    year,
                    quarter,
                    period_end(year, quarter),
                ));
            }
        } else {
            break;
        }

        if (year, quarter) == first {
            break;
        }
        if quarter == 1 {
            year -= 1;
            quarter = 4;
        } else {
            quarter -= 1;
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stockcode: &str, end_date: i32, announce_date: i32, metrics: &[(&'static str, f64)]) -> QuarterReport {
        let mut r = QuarterReport::new(stockcode.to_string(), 1, end_date);
        r.announce_date = Some(announce_date);
        r.rpt_src = None;
        for (name, value) in metrics {
            r.set_metric(name, Some(*value));
        }
        r
    }

    #[test]
    fn fills_gap_quarters_with_placeholders() {
        let raw = vec![
            report("000001.XSHE", 20230930, 20231030, &[]),
            report("000001.XSHE", 20221231, 20230430, &[]),
        ];
        let qm = QuarterMetrics::new("000001.XSHE", raw);
        // 20230930 -> 20230630 (missing, placeholder) -> 20230331 (placeholder) -> 20221231
        assert_eq!(qm.reports.len(), 4);
        assert!(qm.reports[1].is_placeholder());
        assert!(qm.reports[2].is_placeholder());
        assert!(!qm.reports[3].is_placeholder());
    }

    // S3: four-straight annual short circuit
    #[test]
    fn four_straight_annual_short_circuits() {
        let raw = vec![report("000001.XSHE", 20221231, 20230330, &[("net_profit", 100.0)])];
        let qm = QuarterMetrics::new("000001.XSHE", raw);
        let bundle = qm.get(20230401);
        assert_eq!(bundle.get(k::STRAIGHT_NET_PROFIT), Some(&100.0));
    }

    // S5: four-latest Q3 scaling
    #[test]
    fn four_latest_scales_q3_by_four_thirds() {
        let raw = vec![report("000001.XSHE", 20230930, 20231015, &[("revenue", 75.0)])];
        let qm = QuarterMetrics::new("000001.XSHE", raw);
        let bundle = qm.get(20231020);
        assert_eq!(bundle.get(k::LATEST_REVENUE), Some(&100.0));
    }

    // S4: four-straight general case (non-annual report with real A/S operands)
    #[test]
    fn four_straight_general_case_combines_current_annual_and_same_quarter() {
        let raw = vec![
            report("000001.XSHE", 20230930, 20231020, &[("net_profit", 40.0)]),
            report("000001.XSHE", 20230630, 20230815, &[("net_profit", 35.0)]),
            report("000001.XSHE", 20230331, 20230420, &[("net_profit", 30.0)]),
            report("000001.XSHE", 20221231, 20230330, &[("net_profit", 100.0)]),
            report("000001.XSHE", 20220930, 20221020, &[("net_profit", 25.0)]),
        ];
        let qm = QuarterMetrics::new("000001.XSHE", raw);
        let bundle = qm.get(20231025);
        // cur(40) + annual(100) - same_quarter_last_year(25) = 115
        assert_eq!(bundle.get(k::STRAIGHT_NET_PROFIT), Some(&115.0));
    }

    #[test]
    fn out_of_order_calls_give_same_answer_as_fresh_instance() {
        let raw = vec![
            report("000001.XSHE", 20230930, 20231015, &[("net_profit", 30.0)]),
            report("000001.XSHE", 20230630, 20230810, &[("net_profit", 20.0)]),
            report("000001.XSHE", 20230331, 20230410, &[("net_profit", 10.0)]),
            report("000001.XSHE", 20221231, 20230330, &[("net_profit", 100.0)]),
        ];
        let qm = QuarterMetrics::new("000001.XSHE", raw.clone());

        let forward = qm.get(20231020);
        let qm2 = QuarterMetrics::new("000001.XSHE", raw);
        // Query an earlier date first, then the later one out of order.
        let _ = qm2.get(20230420);
        let out_of_order = qm2.get(20231020);

        assert_eq!(forward.get(k::END_DATE), out_of_order.get(k::END_DATE));
    }

    #[test]
    fn empty_bundle_when_no_report_announced_yet() {
        let raw = vec![report("000001.XSHE", 20230930, 20231101, &[("net_profit", 30.0)])];
        let qm = QuarterMetrics::new("000001.XSHE", raw);
        // Announce date is 2023-11-01; asking for 2023-10-20 should yield nothing.
        let bundle = qm.get(20231020);
        assert!(bundle.is_empty());
    }
}
