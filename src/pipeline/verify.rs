//! Post-pipeline invariant check, grounded directly in
//! `examples/original_source/verify.py::verify_declare`: scans
//! `strategy_quarter` for one stock and raises on the first violation of
//! strict `announce_date` monotonicity.

use anyhow::Result;

use crate::database::table::quarter::{self, QuarterTable};
use crate::error::PipelineInvariant;

pub async fn verify_declare(stockcode: &str) -> Result<()> {
    let mut rows = quarter::fetch_for_stockcode(QuarterTable::Strategy, stockcode).await?;
    rows.sort_by(|a, b| b.end_date.cmp(&a.end_date));

    let mut previous_announce: Option<i32> = None;

    for row in rows {
        let Some(announce_date) = row.announce_date else {
            return Err(PipelineInvariant::MissingField("announce_date").into());
        };

        let Some(pre_ann) = previous_announce else {
            previous_announce = Some(announce_date);
            continue;
        };

        if announce_date >= pre_ann {
            return Err(PipelineInvariant::NonMonotoneAnnounceDate {
                stockcode: stockcode.to_string(),
                end_date: row.end_date,
                announce_date,
                previous_announce_date: pre_ann,
            }
            .into());
        }

        if row.announce_to != pre_ann {
            return Err(PipelineInvariant::AnnounceToMismatch {
                stockcode: stockcode.to_string(),
                end_date: row.end_date,
                expected: pre_ann,
                found: row.announce_to,
            }
            .into());
        }

        if row.end_date >= announce_date {
            return Err(PipelineInvariant::EndDateNotBeforeAnnounce {
                stockcode: stockcode.to_string(),
                end_date: row.end_date,
                announce_date,
            }
            .into());
        }

        previous_announce = Some(announce_date);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::PipelineInvariant;
    use crate::model::QuarterReport;

    /// Mirrors `verify_declare`'s scan without a database round-trip.
    fn check(mut rows: Vec<QuarterReport>) -> Result<(), PipelineInvariant> {
        rows.sort_by(|a, b| b.end_date.cmp(&a.end_date));
        let mut previous_announce: Option<i32> = None;

        for row in rows {
            let Some(announce_date) = row.announce_date else {
                return Err(PipelineInvariant::MissingField("announce_date"));
            };
            let Some(pre_ann) = previous_announce else {
                previous_announce = Some(announce_date);
                continue;
            };
            if announce_date >= pre_ann {
                return Err(PipelineInvariant::NonMonotoneAnnounceDate {
                    stockcode: row.stockcode.clone(),
                    end_date: row.end_date,
                    announce_date,
                    previous_announce_date: pre_ann,
                });
            }
            if row.announce_to != pre_ann {
                return Err(PipelineInvariant::AnnounceToMismatch {
                    stockcode: row.stockcode.clone(),
                    end_date: row.end_date,
                    expected: pre_ann,
                    found: row.announce_to,
                });
            }
            previous_announce = Some(announce_date);
        }
        Ok(())
    }

    fn report(end_date: i32, announce_date: i32, announce_to: i32) -> QuarterReport {
        let mut r = QuarterReport::new("000001.XSHE".to_string(), 1, end_date);
        r.announce_date = Some(announce_date);
        r.announce_to = announce_to;
        r
    }

    #[test]
    fn monotone_chain_passes() {
        let rows = vec![
            report(20231231, 20240320, crate::model::ANNOUNCE_TO_OPEN),
            report(20230930, 20231020, 20240320),
            report(20230630, 20230815, 20231020),
        ];
        assert!(check(rows).is_ok());
    }

    #[test]
    fn non_monotone_announce_date_is_rejected() {
        let rows = vec![
            report(20231231, 20240320, crate::model::ANNOUNCE_TO_OPEN),
            report(20230930, 20240401, 20240320),
        ];
        assert!(matches!(check(rows), Err(PipelineInvariant::NonMonotoneAnnounceDate { .. })));
    }

    #[test]
    fn announce_to_mismatch_is_rejected() {
        let rows = vec![
            report(20231231, 20240320, crate::model::ANNOUNCE_TO_OPEN),
            report(20230930, 20231020, 19991231),
        ];
        assert!(matches!(check(rows), Err(PipelineInvariant::AnnounceToMismatch { .. })));
    }
}
