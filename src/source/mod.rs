// sheetsync/src/source/mod.rs
pub(crate) mod fetch;
pub(crate) mod rows;

pub use fetch::{FileCache, SheetFetcher};
pub use rows::{CsvRowSource, Row, RowSource};
