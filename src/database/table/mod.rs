/// Code lookup (`stk_code`).
pub mod code;
/// Day-level source rows (`ana_stk_val_idx`) and closing prices (`stk_mkt`).
pub mod day;
/// The three quarter-pipeline tables.
pub mod quarter;
/// Source statement tables (income, balance, cash-flow, indicator).
pub mod source;
