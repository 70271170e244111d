/// Fiscal period-end arithmetic and the `latestEnds` candidate table.
pub mod calendar;
/// Pure day-level ratio formulas and the shared `round4` helper.
pub mod day_ratios;
/// Per-stock cursor over finalized quarter reports.
pub mod quarter_metrics;
