//! Instrument universe reader.
//!
//! Reads one or more CSV files each carrying an `OrderBookID` column (e.g.
//! `000001.XSHE`) and builds the short-code -> full-stockcode map `CodeMaps`
//! is built from, grounded in `fdhandle/stocks.py::get_stockcode_map`.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, serde::Deserialize)]
struct InstrumentRecord {
    #[serde(rename = "OrderBookID")]
    order_book_id: String,
}

/// Reads `paths`, returning a map from short code (the portion of
/// `OrderBookID` before the first `.`) to the full order-book id.
pub fn read_universe(paths: &[String]) -> Result<HashMap<String, String>, ConfigError> {
    let mut universe = HashMap::new();

    for path in paths {
        let mut reader = csv::Reader::from_path(Path::new(path)).map_err(|e| ConfigError::InstrumentFile {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?;

        for record in reader.deserialize() {
            let record: InstrumentRecord = record.map_err(|e| ConfigError::InstrumentFile {
                path: path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?;
            if let Some((short, _)) = record.order_book_id.split_once('.') {
                universe.insert(short.to_string(), record.order_book_id.clone());
            }
        }
    }

    Ok(universe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_order_book_id_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "OrderBookID,Symbol").unwrap();
        writeln!(file, "000001.XSHE,PAB").unwrap();
        writeln!(file, "600000.XSHG,SPDB").unwrap();

        let universe = read_universe(&[file.path().to_string_lossy().to_string()]).unwrap();
        assert_eq!(universe.get("000001"), Some(&"000001.XSHE".to_string()));
        assert_eq!(universe.get("600000"), Some(&"600000.XSHG".to_string()));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = read_universe(&["/nonexistent/a_share.csv".to_string()]);
        assert!(result.is_err());
    }
}
