//! Generic in-memory table: a header row plus rows of optional string cells.
//!
//! `None` is the missing-value marker. On CSV read an empty field becomes
//! `None`; on write `None` serializes back to an empty field. In memory the
//! two stay distinct, so a cleaned-but-empty cell is not confused with a
//! cell that was never present.

use std::cmp::Ordering;
use std::path::Path;

use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    /// Load a CSV file. Short records are padded with missing cells so every
    /// row has one cell per header.
    pub fn from_csv_path(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect();
            row.resize(headers.len(), None);
            rows.push(row);
        }

        Ok(Table { headers, rows })
    }

    pub fn to_csv_path(&self, path: &Path) -> Result<(), PipelineError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Column lookup that treats absence as a structural failure.
    pub fn require_column(&self, name: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Return the index of `name`, appending a missing-valued column if the
    /// table does not have it yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.headers.len() - 1
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows[row][col].as_deref()
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<String>) {
        self.rows[row][col] = value;
    }

    pub fn row(&self, i: usize) -> &[Option<String>] {
        &self.rows[i]
    }

    /// Append a row, padding or truncating to the current column count.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Remove rows whose cells are all missing. Returns how many were dropped.
    pub fn drop_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().any(|c| c.is_some()));
        before - self.rows.len()
    }

    /// Remove columns whose cells are all missing. Returns how many were dropped.
    pub fn drop_empty_columns(&mut self) -> usize {
        let keep: Vec<bool> = (0..self.headers.len())
            .map(|col| self.rows.is_empty() || self.rows.iter().any(|row| row[col].is_some()))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return 0;
        }

        let mut idx = 0;
        self.headers.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
        for row in &mut self.rows {
            let mut idx = 0;
            row.retain(|_| {
                let k = keep[idx];
                idx += 1;
                k
            });
        }
        dropped
    }

    /// Split one column's slash-separated cells into one row per value,
    /// copying every other cell. Parts are trimmed and empty parts dropped;
    /// a cell with no usable part keeps its row with the cell unset, and
    /// missing cells pass through unchanged.
    pub fn explode_column(&mut self, col: usize) {
        let rows = std::mem::take(&mut self.rows);
        for row in rows {
            let Some(cell) = row[col].as_deref() else {
                self.rows.push(row);
                continue;
            };
            let parts: Vec<String> = cell
                .split('/')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if parts.is_empty() {
                let mut r = row;
                r[col] = None;
                self.rows.push(r);
                continue;
            }
            for part in parts {
                let mut r = row.clone();
                r[col] = Some(part);
                self.rows.push(r);
            }
        }
    }

    /// Stable ascending sort on the given columns. Missing cells sort after
    /// present ones; present cells compare as strings.
    pub fn sort_by_columns(&mut self, cols: &[usize]) {
        self.rows.sort_by(|a, b| {
            for &col in cols {
                let ord = cmp_cells(a[col].as_deref(), b[col].as_deref());
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

fn cmp_cells(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
