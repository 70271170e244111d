//! Prepare stage: copies `research_quarter` into `prepare_quarter`, then
//! deletes late-announced rows and extends `announce_to` across the gaps
//! they leave behind (§4.2.2).

use anyhow::Result;

use crate::database::table::quarter::{self, QuarterTable};
use crate::logging;
use crate::model::ANNOUNCE_TO_OPEN;

pub async fn run(stockcodes: impl Iterator<Item = &str>) -> Result<()> {
    for stockcode in stockcodes {
        if let Err(e) = run_for_stock(stockcode).await {
            logging::error(format!("prepare stage failed for {stockcode}: {e:#}"));
        }
    }
    Ok(())
}

async fn run_for_stock(stockcode: &str) -> Result<()> {
    let research_rows = quarter::fetch_for_stockcode(QuarterTable::Research, stockcode).await?;
    for row in &research_rows {
        quarter::upsert(QuarterTable::Prepare, row).await?;
    }

    let mut rows = quarter::fetch_for_stockcode(QuarterTable::Prepare, stockcode).await?;
    rows.sort_by(|a, b| b.end_date.cmp(&a.end_date));

    let mut latest_ann = ANNOUNCE_TO_OPEN;
    let mut last_deleted = false;

    for mut row in rows {
        let announce_date = row.announce_date.unwrap_or(ANNOUNCE_TO_OPEN);

        if announce_date >= latest_ann {
            quarter::delete(QuarterTable::Prepare, stockcode, row.end_date).await?;
            last_deleted = true;
            continue;
        }

        if last_deleted {
            row.announce_to = latest_ann;
            quarter::upsert(QuarterTable::Prepare, &row).await?;
        }

        latest_ann = announce_date;
        last_deleted = false;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::model::QuarterReport;

    /// Mirrors the late-pruning walk without touching a database: verifies
    /// the `>=` deletion rule and `announce_to` gap extension in isolation.
    fn simulate(mut rows: Vec<QuarterReport>) -> Vec<QuarterReport> {
        rows.sort_by(|a, b| b.end_date.cmp(&a.end_date));
        let mut latest_ann = super::ANNOUNCE_TO_OPEN;
        let mut last_deleted = false;
        let mut kept = Vec::new();

        for mut row in rows {
            let announce_date = row.announce_date.unwrap_or(super::ANNOUNCE_TO_OPEN);
            if announce_date >= latest_ann {
                last_deleted = true;
                continue;
            }
            if last_deleted {
                row.announce_to = latest_ann;
            }
            latest_ann = announce_date;
            last_deleted = false;
            kept.push(row);
        }
        kept
    }

    fn report(end_date: i32, announce_date: i32) -> QuarterReport {
        let mut r = QuarterReport::new("000001.XSHE".to_string(), 1, end_date);
        r.announce_date = Some(announce_date);
        r
    }

    #[test]
    fn equal_announce_dates_delete_the_older_row() {
        let rows = vec![report(20230930, 20231020), report(20230630, 20231020)];
        let kept = simulate(rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].end_date, 20230930);
    }

    #[test]
    fn deleted_gap_extends_next_surviving_rows_announce_to() {
        // row2 is a simultaneous filing with row1 and gets pruned; row3
        // should inherit row1's announce_date as its announce_to rather
        // than the deleted row2's.
        let rows =
            vec![report(20231231, 20240320), report(20230930, 20240320), report(20230630, 20230815)];
        let kept = simulate(rows);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].end_date, 20230630);
        assert_eq!(kept[1].announce_to, 20240320);
    }
}
