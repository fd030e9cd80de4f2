//! Line-delimited JSON record files
//!
//! Both pipeline stages exchange records as one JSON object per line. The
//! writer flushes after every record so an interrupted run leaves a valid
//! prefix; the reader yields records with their 1-based line numbers.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::utils::error::StorageError;

/// Field map of one record, in file order
pub type RecordFields = Map<String, Value>;

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLine {
    /// 1-based line number in the input
    pub line: usize,
    pub fields: RecordFields,
}

/// Incremental line-delimited JSON writer
pub struct JsonLinesWriter<W: Write> {
    inner: BufWriter<W>,
    written: u64,
}

impl JsonLinesWriter<File> {
    /// Create (or truncate) an output file, creating parent directories
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            written: 0,
        }
    }

    /// Serialize one record as a single line and flush it
    pub fn write_record<T: Serialize + ?Sized>(&mut self, record: &T) -> Result<(), StorageError> {
        serde_json::to_writer(&mut self.inner, record).map_err(StorageError::Serialize)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, StorageError> {
        self.inner
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))
    }
}

/// Line-delimited JSON reader yielding JSON objects
///
/// Blank lines are skipped. A line that is not a JSON object, including one
/// with invalid UTF-8, yields `StorageError::MalformedLine`; iteration can
/// continue past it. Read failures of the underlying stream yield
/// `StorageError::Io`.
pub struct JsonLinesReader<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
}

impl JsonLinesReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<RecordLine, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(StorageError::Io(e))),
            }
            self.line += 1;

            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // from_slice rejects invalid UTF-8 as a JSON error
            let line = self.line;
            return Some(
                serde_json::from_slice::<RecordFields>(&self.buf)
                    .map(|fields| RecordLine { line, fields })
                    .map_err(|source| StorageError::MalformedLine { line, source }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoreRecord;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_writer_one_record_per_line() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer
            .write_record(&serde_json::json!({"address": "1 Main St"}))
            .unwrap();
        writer
            .write_record(&StoreRecord {
                subdivision: "Ohio".to_string(),
                subdivision_abbr: "OH".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(writer.written(), 2);

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"address":"1 Main St"}"#);
        assert!(lines[1].contains(r#""subdivision_abbr":"OH""#));
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn test_reader_skips_blank_lines_and_numbers_lines() {
        let input = "{\"a\":1}\n\n   \n{\"b\":2}\n";
        let records: Vec<RecordLine> = JsonLinesReader::new(Cursor::new(input))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[1].line, 4);
        assert_eq!(records[1].fields["b"], 2);
    }

    #[test]
    fn test_reader_reports_malformed_line_and_continues() {
        let input = "{\"a\":1}\nnot json\n[1,2]\n{\"c\":3}\n";
        let results: Vec<_> = JsonLinesReader::new(Cursor::new(input)).collect();

        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(StorageError::MalformedLine { line: 2, .. })
        ));
        assert!(matches!(
            results[2],
            Err(StorageError::MalformedLine { line: 3, .. })
        ));
        assert_eq!(results[3].as_ref().unwrap().fields["c"], 3);
    }

    #[test]
    fn test_reader_invalid_utf8_is_malformed_line() {
        let input: &[u8] = b"{\"address\":null}\n{\"address\":\"\xff\xfe\"}\n\n{\"address\":null}\r\n";
        let results: Vec<_> = JsonLinesReader::new(input).collect();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().line, 1);
        assert!(matches!(
            results[1],
            Err(StorageError::MalformedLine { line: 2, .. })
        ));
        assert_eq!(results[2].as_ref().unwrap().line, 4);
    }

    #[test]
    fn test_reader_preserves_field_order() {
        let input = r#"{"zeta":1,"alpha":2,"mid":3}"#;
        let record = JsonLinesReader::new(Cursor::new(input))
            .next()
            .unwrap()
            .unwrap();
        let keys: Vec<&String> = record.fields.keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out/stores.jsonl");

        let mut writer = JsonLinesWriter::create(&path).unwrap();
        writer.write_record(&serde_json::json!({"x": 1})).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"x\":1}\n");

        let reread: Vec<_> = JsonLinesReader::open(&path).unwrap().collect();
        assert_eq!(reread.len(), 1);
    }
}
