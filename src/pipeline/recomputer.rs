//! The per-stock Day Recomputer (§4.4): walks a stock's day rows ascending,
//! writing the as-read row to `orig_day` and the ratio-augmented row to
//! `recal_day`.

use anyhow::Result;

use crate::calculation::day_ratios as ratios;
use crate::calculation::quarter_metrics::QuarterMetrics;
use crate::codemap::CodeMaps;
use crate::database::table::{day, quarter};
use crate::model::{bundle_keys as k, RecalDayRow};

/// Runs the recomputer for one stock end to end: loads its quarter history,
/// its day rows (optionally bounded for an incremental run), and its
/// closing prices, then walks ascending writing `orig_day`/`recal_day`.
pub async fn run_for_stock(codemaps: &CodeMaps, stockcode: &str, first: bool) -> Result<()> {
    let inner_code = codemaps.inner_code_of_stockcode(stockcode)?;

    let mut quarter_reports = quarter::fetch_for_stockcode(quarter::QuarterTable::Strategy, stockcode).await?;
    quarter_reports.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    let qm = QuarterMetrics::new(stockcode, quarter_reports);

    let latest_date = if first { None } else { day::min_processed_trd_date(stockcode).await? };

    let mut rows = day::fetch_day_rows(stockcode, inner_code, latest_date).await?;
    // Source query returns newest-first; the recomputer walks oldest-first.
    rows.reverse();

    let closing_prices = day::fetch_closing_prices(inner_code).await?;

    for row in rows {
        day::upsert_orig_day(&row).await?;

        let trading_date = row.trd_date;
        let bundle = qm.get(trading_date);
        let tclose = closing_prices.get(&trading_date).copied();

        let recal = recompute(&qm, &row, &bundle, tclose, trading_date);
        day::upsert_recal_day(&recal).await?;
    }

    Ok(())
}

fn recompute(
    qm: &QuarterMetrics,
    row: &crate::model::DayRow,
    bundle: &std::collections::HashMap<&'static str, f64>,
    tclose: Option<f64>,
    trading_date: i32,
) -> RecalDayRow {
    let mut out = RecalDayRow::from_day_row(row);
    let mc = row.metric("market_cap").unwrap_or(0.0);

    out.set_metric("pe_ratio", ratios::pe_ratio(mc, bundle.get(k::STRAIGHT_NET_PROFIT).copied()));
    out.set_metric(
        "pcf_ratio",
        ratios::pcf_ratio(mc, bundle.get(k::STRAIGHT_CASH_FLOW_FROM_OPERATING_ACTIVITIES).copied()),
    );
    out.set_metric(
        "pcf_ratio_1",
        ratios::pcf_ratio_1(mc, bundle.get(k::LATEST_CASH_FLOW_FROM_OPERATING_ACTIVITIES).copied()),
    );
    out.set_metric(
        "ps_ratio",
        ratios::ps_ratio(
            mc,
            bundle.get(k::LATEST_REVENUE).copied(),
            bundle.get(k::LATEST_OPERATING_REVENUE).copied(),
        ),
    );
    out.set_metric("pe_ratio_2", ratios::pe_ratio_2(mc, bundle.get(k::LATEST_NET_PROFIT_PARENT_COMPANY).copied()));
    out.set_metric("pe_ratio_1", ratios::pe_ratio_1(mc, bundle.get(k::NET_PROFIT_PARENT_COMPANY).copied()));

    let val_of_stk_right = row.metric("val_of_stk_right");
    let interest_bearing_debt = bundle.get(k::INTEREST_BEARING_DEBT).copied();
    let ev = ratios::ev(val_of_stk_right, interest_bearing_debt);
    out.set_metric("ev", Some(ev));

    let cash_total = bundle.get(k::CASH_TOTAL).copied();
    out.set_metric("ev_2", Some(ratios::ev_2(ev, cash_total)));
    out.set_metric("ev_to_ebit", ratios::ev_to_ebit(ev, bundle.get(k::EBITDA).copied()));

    out.set_metric("pb_ratio", ratios::pb_ratio(tclose, bundle.get(k::BOOK_VALUE_PER_SHARE).copied()));
    out.set_metric(
        "pcf_ratio_2",
        ratios::pcf_ratio_2(mc, bundle.get(k::LATEST_CASH_EQUIVALENT_INC_NET).copied()),
    );
    out.set_metric(
        "pcf_ratio_3",
        ratios::pcf_ratio_3(mc, bundle.get(k::STRAIGHT_CASH_EQUIVALENT_INC_NET).copied()),
    );

    let pe_ratio_2 = out.metric("pe_ratio_2");
    let prior_annual_nppc = qm
        .latest_annual_report(trading_date)
        .and_then(|report| report.metric("net_profit_parent_company"));
    out.set_metric(
        "peg_ratio",
        ratios::peg_ratio(prior_annual_nppc, bundle.get(k::LATEST_NET_PROFIT_PARENT_COMPANY).copied(), pe_ratio_2),
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn ev_is_always_emitted_even_with_no_operands() {
        let row = crate::model::DayRow { stockcode: "000001.XSHE".to_string(), trd_date: 20231020, metrics: HashMap::new() };
        let raw = vec![crate::model::QuarterReport::new("000001.XSHE".to_string(), 1, 20230930)];
        let qm = QuarterMetrics::new("000001.XSHE", raw);
        let bundle = HashMap::new();
        let recal = recompute(&qm, &row, &bundle, None, 20231020);
        assert_eq!(recal.metric("ev"), Some(0.0));
    }

    #[test]
    fn missing_pb_ratio_operand_drops_the_metric() {
        let row = crate::model::DayRow { stockcode: "000001.XSHE".to_string(), trd_date: 20231020, metrics: HashMap::new() };
        let raw = vec![crate::model::QuarterReport::new("000001.XSHE".to_string(), 1, 20230930)];
        let qm = QuarterMetrics::new("000001.XSHE", raw);
        let bundle = HashMap::new();
        let recal = recompute(&qm, &row, &bundle, None, 20231020);
        assert_eq!(recal.metric("pb_ratio"), None);
    }
}
