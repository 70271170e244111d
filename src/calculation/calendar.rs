//! Fiscal period-end arithmetic.
//!
//! Dates are plain `i32` YYYYMMDD integers throughout, matching how they are
//! stored upstream and compared across the pipeline (`announce_date <=
//! trading_date`, etc.) — using `chrono::NaiveDate` here would invite silent
//! timezone-normalization bugs in comparisons that must be exact integer
//! comparisons.

/// `year * 10000 + [0331, 0630, 0930, 1231][quarter - 1]`. Panics on an
/// out-of-range quarter; callers only ever pass `1..=4`.
pub fn period_end(year: i32, quarter: u8) -> i32 {
    let mmdd = match quarter {
        1 => 331,
        2 => 630,
        3 => 930,
        4 => 1231,
        other => panic!("quarter must be 1..=4, got {other}"),
    };
    year * 10000 + mmdd
}

/// Inverse of `period_end`: `(year, quarter)` for a YYYYMMDD period-end.
/// Used by invariant checks and by `QuarterMetrics` placeholder filling.
pub fn year_quarter_of(end_date: i32) -> (i32, u8) {
    let year = end_date / 10000;
    let quarter = ((end_date % 10000) / 300) as u8;
    (year, quarter)
}

/// Candidate fiscal period-ends that could be the most recent public report
/// as of `trading_date`, most-recent first. The Day Recomputer additionally
/// filters these by the actual `announce_date <= trading_date` of whatever
/// report is being considered; this table only encodes calendar knowledge.
pub fn latest_ends(trading_date: i32) -> Vec<i32> {
    let year = trading_date / 10000;
    let mmdd = trading_date % 10000;

    match mmdd {
        101..=430 => vec![
            period_end(year, 1),
            period_end(year - 1, 4),
            period_end(year - 1, 3),
        ],
        501..=630 => vec![period_end(year, 1)],
        701..=831 => vec![period_end(year, 2), period_end(year, 1)],
        901..=930 => vec![period_end(year, 2)],
        1001..=1031 => vec![period_end(year, 3), period_end(year, 2)],
        1101..=1231 => vec![period_end(year, 3)],
        other => panic!("trading_date {trading_date} has an invalid MMDD suffix {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_end_matches_canonical_dates() {
        assert_eq!(period_end(2023, 1), 20230331);
        assert_eq!(period_end(2023, 2), 20230630);
        assert_eq!(period_end(2023, 3), 20230930);
        assert_eq!(period_end(2023, 4), 20231231);
    }

    #[test]
    fn year_quarter_roundtrips_through_period_end() {
        for year in [2019, 2020, 2021, 2022] {
            for quarter in 1..=4u8 {
                let end = period_end(year, quarter);
                assert_eq!(year_quarter_of(end), (year, quarter));
            }
        }
    }

    // S1
    #[test]
    fn latest_ends_early_april_includes_prior_year_candidates() {
        let candidates = latest_ends(20230405);
        assert_eq!(
            candidates,
            vec![20230331, 20221231, 20220930]
        );
    }

    #[test]
    fn latest_ends_late_may_is_q1_only() {
        assert_eq!(latest_ends(20230520), vec![20230331]);
    }

    #[test]
    fn latest_ends_august_includes_q1_and_q2() {
        assert_eq!(latest_ends(20230810), vec![20230630, 20230331]);
    }

    #[test]
    fn latest_ends_september_is_q2_only() {
        assert_eq!(latest_ends(20230915), vec![20230630]);
    }

    #[test]
    fn latest_ends_october_includes_q2_and_q3() {
        assert_eq!(latest_ends(20231015), vec![20230930, 20230630]);
    }

    #[test]
    fn latest_ends_november_is_q3_only() {
        assert_eq!(latest_ends(20231115), vec![20230930]);
    }
}
