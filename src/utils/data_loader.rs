//! CSV loading and saving

use crate::error::{Result, ServeError};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

/// Cell values read as null, in addition to empty fields
const NULL_TOKENS: &[&str] = &["NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A"];

/// CSV reader for files and in-memory uploads.
///
/// Column types are inferred from every row, so a float that first appears
/// deep in an integer-looking column still parses.
#[derive(Debug, Clone, Default)]
pub struct DataLoader;

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self
    }

    fn options(&self) -> CsvReadOptions {
        let null_values = NullValues::AllColumns(NULL_TOKENS.iter().map(|t| (*t).into()).collect());
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ServeError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        self.options()
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| ServeError::DataError(e.to_string()))
    }

    /// Parse CSV bytes with a header row
    pub fn read_csv_bytes(&self, bytes: &[u8]) -> Result<DataFrame> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ServeError::InvalidInput("uploaded file is empty".to_string()));
        }

        self.options()
            .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
            .finish()
            .map_err(|e| ServeError::DataError(format!("could not parse CSV: {}", e)))
    }
}

/// CSV writer
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| ServeError::DataError(e.to_string()))
    }

    /// Render as CSV text with a header row
    pub fn to_csv_string(df: &mut DataFrame) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(df)
            .map_err(|e| ServeError::DataError(e.to_string()))?;

        String::from_utf8(buf).map_err(|e| ServeError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "Age,Class,Flight Distance").unwrap();
        writeln!(file, "35,Business,1200").unwrap();
        writeln!(file, "22,Eco,300").unwrap();
        writeln!(file, "51,,950").unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("Class").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DataLoader::new().load_csv("/nonexistent/data.csv").unwrap_err();
        assert!(matches!(err, ServeError::DataError(_)));
    }

    #[test]
    fn test_read_csv_bytes() {
        let df = DataLoader::new()
            .read_csv_bytes(b"Age,Gender\n35,Male\n41,Female\n")
            .unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("Age").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_late_float_in_integer_column() {
        let mut csv = String::from("Age,Class\n");
        for _ in 0..1000 {
            csv.push_str("30,Eco\n");
        }
        csv.push_str("30.5,Eco\n");

        let df = DataLoader::new().read_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(df.height(), 1001);
        assert_eq!(df.column("Age").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Age").unwrap().f64().unwrap().get(1000), Some(30.5));
    }

    #[test]
    fn test_na_tokens_are_null() {
        let df = DataLoader::new()
            .read_csv_bytes(b"Age,Class\n35,NA\nn/a,Eco\n41,Business\n")
            .unwrap();
        assert_eq!(df.column("Age").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Age").unwrap().null_count(), 1);
        assert_eq!(df.column("Class").unwrap().null_count(), 1);
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let err = DataLoader::new().read_csv_bytes(b"  \n").unwrap_err();
        assert!(matches!(err, ServeError::InvalidInput(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let mut df = DataFrame::new(vec![
            Series::new("a".into(), &[1i64, 2, 3]).into(),
            Series::new("b".into(), &[4.0, 5.0, 6.0]).into(),
        ])
        .unwrap();

        let file = NamedTempFile::new().unwrap();
        DataSaver::save_csv(&mut df, file.path()).unwrap();

        let loaded = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }

    #[test]
    fn test_to_csv_string() {
        let mut df = DataFrame::new(vec![
            Series::new("pred".into(), &[1i64, 0]).into(),
        ])
        .unwrap();
        let csv = DataSaver::to_csv_string(&mut df).unwrap();
        assert_eq!(csv, "pred\n1\n0\n");
    }
}
