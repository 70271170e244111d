//! Pure day-level ratio formulas (§4.4).
//!
//! Every formula here is a free function over plain `f64`s and returns
//! `None` when an operand is missing or the denominator is zero, so a ratio
//! is simply omitted from the output row rather than persisted as `NaN` or
//! `0.0`.

/// Half-away-from-zero rounding to 4 decimal places, shared by every ratio.
/// `f64::round` already rounds halves away from zero, so this is a plain
/// scale/round/unscale.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn safe_div(numerator: f64, denominator: Option<f64>) -> Option<f64> {
    let d = denominator?;
    if d == 0.0 {
        return None;
    }
    Some(round4(numerator / d))
}

pub fn pe_ratio(market_cap: f64, straight_net_profit: Option<f64>) -> Option<f64> {
    safe_div(market_cap, straight_net_profit)
}

pub fn pcf_ratio(market_cap: f64, straight_cfoa: Option<f64>) -> Option<f64> {
    safe_div(market_cap, straight_cfoa)
}

pub fn pcf_ratio_1(market_cap: f64, latest_cfoa: Option<f64>) -> Option<f64> {
    safe_div(market_cap, latest_cfoa)
}

/// `ps_ratio = mc / r` where `r` is `latest_revenue` if present and
/// nonzero, else `latest_operating_revenue` (financial-sector fallback,
/// since financial issuers often report revenue as zero).
pub fn ps_ratio(market_cap: f64, latest_revenue: Option<f64>, latest_operating_revenue: Option<f64>) -> Option<f64> {
    let r = match latest_revenue {
        Some(v) if v != 0.0 => Some(v),
        _ => latest_operating_revenue,
    };
    safe_div(market_cap, r)
}

pub fn pe_ratio_2(market_cap: f64, latest_net_profit_parent_company: Option<f64>) -> Option<f64> {
    safe_div(market_cap, latest_net_profit_parent_company)
}

pub fn pe_ratio_1(market_cap: f64, net_profit_parent_company: Option<f64>) -> Option<f64> {
    safe_div(market_cap, net_profit_parent_company)
}

pub fn ev(val_of_stk_right: Option<f64>, interest_bearing_debt: Option<f64>) -> f64 {
    val_of_stk_right.unwrap_or(0.0) + interest_bearing_debt.unwrap_or(0.0)
}

pub fn ev_2(ev: f64, cash_total: Option<f64>) -> f64 {
    ev - cash_total.unwrap_or(0.0)
}

/// Despite the name, this divides by `ebitda`, matching the upstream column.
pub fn ev_to_ebit(ev: f64, ebitda: Option<f64>) -> Option<f64> {
    safe_div(ev, ebitda)
}

pub fn pb_ratio(tclose: Option<f64>, book_value_per_share: Option<f64>) -> Option<f64> {
    let close = tclose?;
    safe_div(close, book_value_per_share)
}

pub fn pcf_ratio_2(market_cap: f64, latest_cash_equivalent_inc_net: Option<f64>) -> Option<f64> {
    safe_div(market_cap, latest_cash_equivalent_inc_net)
}

pub fn pcf_ratio_3(market_cap: f64, straight_cash_equivalent_inc_net: Option<f64>) -> Option<f64> {
    safe_div(market_cap, straight_cash_equivalent_inc_net)
}

/// `peg_ratio`: growth `g = (L - A) / A * 100`, `peg = pe2 / g`. Requires
/// `A`, `L`, `pe2` all present, `A != 0`, and `g != 0` (a flat-earnings
/// quarter has no meaningful PEG).
pub fn peg_ratio(prior_annual_net_profit_parent_company: Option<f64>, latest_net_profit_parent_company: Option<f64>, pe_ratio_2: Option<f64>) -> Option<f64> {
    let a = prior_annual_net_profit_parent_company?;
    let l = latest_net_profit_parent_company?;
    let pe2 = pe_ratio_2?;
    if a == 0.0 {
        return None;
    }
    let g = (l - a) / a * 100.0;
    if g == 0.0 {
        return None;
    }
    Some(round4(pe2 / g))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round4_rounds_half_away_from_zero() {
        assert_eq!(round4(1.23455), 1.2346);
        assert_eq!(round4(-1.23455), -1.2346);
        assert_eq!(round4(1.0 / 3.0), 0.3333);
    }

    #[test]
    fn pe_ratio_omitted_when_denominator_zero_or_missing() {
        assert_eq!(pe_ratio(100.0, Some(0.0)), None);
        assert_eq!(pe_ratio(100.0, None), None);
        assert_eq!(pe_ratio(100.0, Some(10.0)), Some(10.0));
    }

    #[test]
    fn ps_ratio_falls_back_to_operating_revenue() {
        assert_eq!(ps_ratio(100.0, Some(0.0), Some(50.0)), Some(2.0));
        assert_eq!(ps_ratio(100.0, None, Some(25.0)), Some(4.0));
        assert_eq!(ps_ratio(100.0, Some(20.0), Some(25.0)), Some(5.0));
    }

    #[test]
    fn ev_defaults_missing_operands_to_zero() {
        assert_eq!(ev(None, None), 0.0);
        assert_eq!(ev(Some(10.0), None), 10.0);
        assert_eq!(ev(Some(10.0), Some(5.0)), 15.0);
    }

    // S7
    #[test]
    fn peg_ratio_matches_worked_example() {
        // pe_ratio_2 = 15, latest nppc = 120, prior-annual nppc = 100
        // g = (120 - 100) / 100 * 100 = 20, peg = 15 / 20 = 0.75
        let result = peg_ratio(Some(100.0), Some(120.0), Some(15.0));
        assert_eq!(result, Some(0.75));
    }

    #[test]
    fn peg_ratio_omitted_when_growth_is_zero() {
        assert_eq!(peg_ratio(Some(100.0), Some(100.0), Some(15.0)), None);
    }

    #[test]
    fn peg_ratio_omitted_when_prior_annual_is_zero() {
        assert_eq!(peg_ratio(Some(0.0), Some(120.0), Some(15.0)), None);
    }
}
