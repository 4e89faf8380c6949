//! CSV dataset loading.
//!
//! Headers are validated against the dataset schema before any row is
//! deserialized; a missing column or a bad row aborts the load instead of
//! returning partial data.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::models::{AdRecord, CustomerRecord, FinancialRecord, SalesRecord};
use crate::schema::Dataset;

pub fn load_path<T: Dataset>(path: &Path) -> EngineResult<Vec<T>> {
    let file = File::open(path).map_err(|source| EngineError::DataUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let records = load_reader(file, path)?;
    info!(
        dataset = T::KIND.name(),
        path = %path.display(),
        rows = records.len(),
        "loaded dataset"
    );
    Ok(records)
}

/// Load records from any reader; `origin` only labels errors.
pub fn load_reader<T: Dataset, R: Read>(reader: R, origin: &Path) -> EngineResult<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|err| malformed(origin, 1, &err))?
        .iter()
        .map(str::to_string)
        .collect();
    T::KIND.validate_headers(&headers)?;

    let mut records = Vec::new();
    for (index, result) in csv_reader.deserialize::<T>().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = result.map_err(|err| {
            let line = err
                .position()
                .map(|position| position.line())
                .unwrap_or(fallback_line);
            malformed(origin, line, &err)
        })?;
        records.push(record);
    }

    debug!(dataset = T::KIND.name(), rows = records.len(), "parsed rows");
    Ok(records)
}

fn malformed(origin: &Path, line: u64, err: &csv::Error) -> EngineError {
    EngineError::MalformedRow {
        path: origin.to_path_buf(),
        line,
        message: err.to_string(),
    }
}

/// Raw datasets keyed by source path. Loaded rows are never mutated, so
/// they are handed out behind an `Arc`.
#[derive(Debug)]
pub struct DatasetCache<T> {
    entries: HashMap<PathBuf, Arc<Vec<T>>>,
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Dataset> DatasetCache<T> {
    pub fn get_or_load(&mut self, path: &Path) -> EngineResult<Arc<Vec<T>>> {
        if let Some(records) = self.entries.get(path) {
            debug!(path = %path.display(), "dataset cache hit");
            return Ok(Arc::clone(records));
        }
        let records = Arc::new(load_path::<T>(path)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&records));
        Ok(records)
    }
}

/// One cache per dataset kind.
#[derive(Debug, Default)]
pub struct DataStore {
    pub sales: DatasetCache<SalesRecord>,
    pub ads: DatasetCache<AdRecord>,
    pub financial: DatasetCache<FinancialRecord>,
    pub customers: DatasetCache<CustomerRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINANCIAL: &str = "Date,Type,Category,Amount\n\
2023-01-01,Income,Product A Sales,25100.5\n\
2023-01-01,Expense,Rent,5000\n";

    #[test]
    fn reads_rows_after_valid_header() {
        let records: Vec<FinancialRecord> =
            load_reader(FINANCIAL.as_bytes(), Path::new("inline.csv")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].amount, 5000.0);
    }

    #[test]
    fn missing_column_is_a_schema_mismatch() {
        let data = "Date,Category,Amount\n2023-01-01,Rent,5000\n";
        let result: EngineResult<Vec<FinancialRecord>> =
            load_reader(data.as_bytes(), Path::new("inline.csv"));
        match result {
            Err(EngineError::SchemaMismatch { missing, .. }) => assert_eq!(missing, vec!["Type"]),
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn bad_row_reports_its_line() {
        let data = "Date,Type,Category,Amount\n2023-01-01,Expense,Rent,5000\n2023-02-01,Expense,Rent,lots\n";
        let result: EngineResult<Vec<FinancialRecord>> =
            load_reader(data.as_bytes(), Path::new("inline.csv"));
        match result {
            Err(EngineError::MalformedRow { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn unknown_transaction_type_is_malformed() {
        let data = "Date,Type,Category,Amount\n2023-01-01,Refund,Rent,5000\n";
        let result: EngineResult<Vec<FinancialRecord>> =
            load_reader(data.as_bytes(), Path::new("inline.csv"));
        assert!(matches!(result, Err(EngineError::MalformedRow { .. })));
    }
}
