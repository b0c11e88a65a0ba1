// src/table/mod.rs

pub mod extract;

pub use extract::extract_tables;

use tracing::debug;

use crate::error::PipelineError;

/// Columns the film table must carry to be picked.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Rank", "Peak", "Title", "Worldwide gross", "Year"];

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names, taken from the last header row.
    pub headers: Vec<String>,
    /// Body rows, each padded to `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.column_index(n).is_some())
    }

    /// Cell text at (`row`, `col`), or "" when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Picks the first table whose headers include every required column.
pub fn select_table(tables: Vec<RawTable>, required: &[&str]) -> Result<RawTable, PipelineError> {
    let seen = tables.len();
    let mut matching = tables.into_iter().filter(|t| t.has_columns(required));

    let table = matching.next().ok_or_else(|| PipelineError::NoMatchingTable {
        required: required.iter().map(|s| s.to_string()).collect(),
        seen,
    })?;

    let extra = matching.count();
    if extra > 0 {
        debug!(extra, "more than one table matched; using the first");
    }
    debug!(rows = table.rows.len(), columns = table.headers.len(), "selected table");
    Ok(table)
}
