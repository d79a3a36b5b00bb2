// sheetsync/src/source/rows.rs
use std::io::Read;

use serde_json::{Map, Value};

use crate::errors::Result;

/// One decoded spreadsheet row: an ordered mapping from header name to the
/// raw cell value. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Row { cells }
    }

    /// Returns the value under `column`, if the header exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// The entire row as a JSON object, including the unique-key column.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.cells {
            map.insert(name.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

/// A blank cell means the row carries no usable key material.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// A finite, non-restartable sequence of rows decoded from the fetched
/// document. A malformed document surfaces as a fatal decoding error.
pub trait RowSource {
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Row source backed by a CSV document. The header row is captured up front;
/// every subsequent record is paired with those headers in order.
pub struct CsvRowSource<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
}

impl<R: Read> CsvRowSource<R> {
    pub fn new(input: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(input);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        Ok(CsvRowSource { reader, headers })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> RowSource for CsvRowSource<R> {
    fn next_row(&mut self) -> Result<Option<Row>> {
        let mut record = csv::StringRecord::new();
        if !self.reader.read_record(&mut record)? {
            return Ok(None);
        }
        let cells = self
            .headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        Ok(Some(Row::new(cells)))
    }
}
