//! In-memory tabular data.
//!
//! A [`Table`] is an ordered header row plus string rows, with just the
//! dataframe operations the loaders and updaters need. Cells holding a common
//! missing-value marker are normalized to the empty string on read, so "missing"
//! always means an empty cell.

use crate::error::{NbdtError, Result};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cell values treated as missing when reading CSV input
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Parse CSV (with a header row) from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let width = headers.len();
        let mut rows = Vec::new();

        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(normalize_cell).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        debug!(columns = width, rows = rows.len(), "Parsed CSV table");
        Ok(Self { headers, rows })
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        Self::from_reader(content.as_bytes())
    }

    pub fn read_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Write the table as CSV with a header row. Overwrites `path`.
    pub fn write_path(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of `name`, or a parse error naming the missing column
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| NbdtError::Parse(format!("missing column '{}'", name)))
    }

    /// Iterate over the values of one column
    pub fn column<'a>(&'a self, name: &str) -> Result<impl Iterator<Item = &'a str> + 'a> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| row[idx].as_str()))
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Keep only the listed columns, in order, renaming each `(from, to)`.
    pub fn select_rename(&self, columns: &[(&str, &str)]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|(from, _)| self.require_column(from))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            headers: columns.iter().map(|(_, to)| to.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Keep only the listed columns, in order
    pub fn select(&self, columns: &[&str]) -> Result<Self> {
        let pairs: Vec<(&str, &str)> = columns.iter().map(|c| (*c, *c)).collect();
        self.select_rename(&pairs)
    }

    /// Keep rows for which `keep` returns true
    pub fn filter_rows<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&[String]) -> bool,
    {
        Self {
            headers: self.headers,
            rows: self.rows.into_iter().filter(|row| keep(row)).collect(),
        }
    }

    /// Replace a column's values, appending the column if it does not exist.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(NbdtError::Parse(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Stack `other` below `self`. Columns are the union of both header rows
    /// (self's order first); cells absent on either side are left empty.
    pub fn concat(self, other: Table) -> Self {
        let mut headers = self.headers;
        for h in &other.headers {
            if !headers.contains(h) {
                headers.push(h.clone());
            }
        }

        let width = headers.len();
        let mut rows = self.rows;
        for row in &mut rows {
            row.resize(width, String::new());
        }

        let mapping: Vec<usize> = other
            .headers
            .iter()
            .filter_map(|h| headers.iter().position(|x| x == h))
            .collect();
        for row in other.rows {
            let mut aligned = vec![String::new(); width];
            for (value, &target) in row.into_iter().zip(&mapping) {
                aligned[target] = value;
            }
            rows.push(aligned);
        }

        Self { headers, rows }
    }

    /// Drop rows whose `column` value was already seen later in the table.
    ///
    /// The last occurrence of each value survives; survivors keep their
    /// relative order.
    pub fn drop_duplicates_keep_last(self, column: &str) -> Result<Self> {
        let idx = self.require_column(column)?;
        let mut keep = vec![false; self.rows.len()];
        {
            let mut seen: HashSet<&str> = HashSet::new();
            for (i, row) in self.rows.iter().enumerate().rev() {
                keep[i] = seen.insert(row[idx].as_str());
            }
        }

        let rows = self
            .rows
            .into_iter()
            .zip(keep)
            .filter(|(_, k)| *k)
            .map(|(row, _)| row)
            .collect();
        Ok(Self {
            headers: self.headers,
            rows,
        })
    }

    /// Drop every row with at least one missing cell
    pub fn drop_missing(self) -> Self {
        self.filter_rows(|row| row.iter().all(|cell| !cell.is_empty()))
    }
}

fn normalize_cell(cell: &str) -> String {
    if MISSING_MARKERS.contains(&cell) {
        String::new()
    } else {
        cell.to_string()
    }
}
