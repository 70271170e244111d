//! Code mapping: the three bijections needed to move between the upstream
//! `Genius` database's identifiers and the `stockcode` (order-book id, e.g.
//! `000001.XSHE`) used everywhere downstream.
//!
//! Built once per process from the instrument universe and the `stk_code`
//! lookup table, then handed to jobs as an `Arc<CodeMaps>` rather than kept
//! behind a process-global `Lazy`/`RwLock` the way `stock_crawler::cache`
//! does it: nothing here needs runtime mutation after construction, and an
//! explicit context object is easier to substitute in tests than a global.

use std::collections::HashMap;

use crate::error::MappingError;

/// One row of the upstream `stk_code` static mapping table.
#[derive(Debug, Clone)]
pub struct StkCodeRow {
    pub comcode: i64,
    pub inner_code: i64,
    /// Short code without market suffix, e.g. `"000001"`.
    pub short_code: String,
}

#[derive(Debug)]
pub struct CodeMaps {
    stockcode_by_comcode: HashMap<i64, String>,
    stockcode_by_inner_code: HashMap<i64, String>,
    inner_code_by_stockcode: HashMap<String, i64>,
    comcode_by_stockcode: HashMap<String, i64>,
}

impl CodeMaps {
    /// `universe`: short code -> full stockcode, from the instrument CSV
    /// (`fdhandle/stocks.py::get_stockcode_map`). `stk_code_rows`: the
    /// `stk_code` table restricted to short codes present in the universe
    /// (mirrors the `stockcode IN (...)` filter in the original query).
    pub fn build(universe: &HashMap<String, String>, stk_code_rows: &[StkCodeRow]) -> Self {
        let mut stockcode_by_comcode = HashMap::new();
        let mut stockcode_by_inner_code = HashMap::new();
        let mut inner_code_by_stockcode = HashMap::new();
        let mut comcode_by_stockcode = HashMap::new();

        for row in stk_code_rows {
            let Some(stockcode) = universe.get(&row.short_code) else {
                continue;
            };
            stockcode_by_comcode.insert(row.comcode, stockcode.clone());
            stockcode_by_inner_code.insert(row.inner_code, stockcode.clone());
            inner_code_by_stockcode.insert(stockcode.clone(), row.inner_code);
            comcode_by_stockcode.insert(stockcode.clone(), row.comcode);
        }

        CodeMaps {
            stockcode_by_comcode,
            stockcode_by_inner_code,
            inner_code_by_stockcode,
            comcode_by_stockcode,
        }
    }

    pub fn stockcode_of_comcode(&self, comcode: i64) -> Option<&str> {
        self.stockcode_by_comcode.get(&comcode).map(String::as_str)
    }

    pub fn stockcode_of_inner_code(&self, inner_code: i64) -> Option<&str> {
        self.stockcode_by_inner_code.get(&inner_code).map(String::as_str)
    }

    pub fn comcode_of_stockcode(&self, stockcode: &str) -> Option<i64> {
        self.comcode_by_stockcode.get(stockcode).copied()
    }

    pub fn inner_code_of_stockcode(&self, stockcode: &str) -> Result<i64, MappingError> {
        self.inner_code_by_stockcode
            .get(stockcode)
            .copied()
            .ok_or_else(|| MappingError::OrderBookIdNotFound(stockcode.to_string()))
    }

    pub fn all_comcodes(&self) -> impl Iterator<Item = i64> + '_ {
        self.stockcode_by_comcode.keys().copied()
    }

    pub fn all_stockcodes(&self) -> impl Iterator<Item = &str> {
        self.inner_code_by_stockcode.keys().map(String::as_str)
    }
}
