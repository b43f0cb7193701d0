//! Read process tables, where each row is a process and each column a component
//!
//! The first column holds process ids, the last column holds rate equations and the columns
//! in between hold the stoichiometric coefficient of each component:
//!
//! ```text
//! ,S_S,X_BH,rate_equation
//! growth,-1/Y_H,1,mu*X_BH
//! decay,,-1,b*X_BH
//! ```
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::configuration;
use crate::process::Coefficient;

/// A single cell of a process table
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Empty cell, or a coefficient of exactly 0
    Blank,
    Value(f64),
    Expression(String),
    /// The unknown placeholder
    Unknown,
}

impl Cell {
    /// Interpret the text of a cell
    pub fn parse(text: &str, placeholder: &str) -> Cell {
        let text = text.trim();
        if text.is_empty() {
            return Cell::Blank;
        }
        if text == placeholder {
            return Cell::Unknown;
        }
        match text.parse::<f64>() {
            Ok(value) if value == 0. => Cell::Blank,
            Ok(value) => Cell::Value(value),
            Err(_) => Cell::Expression(text.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Blank)
    }

    /// The coefficient held by the cell, `None` if blank
    pub fn coefficient(&self) -> Option<Coefficient> {
        match self {
            Cell::Blank => None,
            Cell::Value(v) => Some(Coefficient::Value(*v)),
            Cell::Expression(text) => Some(Coefficient::Expression(text.clone())),
            Cell::Unknown => Some(Coefficient::Unknown),
        }
    }
}

/// A row of a process table
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessRow {
    pub id: String,
    /// One cell per component column
    pub cells: Vec<Cell>,
    pub rate_equation: Option<String>,
}

/// A parsed process table
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessTable {
    components: Vec<String>,
    rows: Vec<ProcessRow>,
}

impl ProcessTable {
    /// Create an empty table with the given component columns
    pub fn new(components: Vec<String>) -> Self {
        ProcessTable {
            components,
            rows: Vec::new(),
        }
    }

    /// Add a row, its cells must line up with the component columns
    pub fn push_row(&mut self, row: ProcessRow) -> Result<(), TableError> {
        if row.cells.len() != self.components.len() {
            return Err(TableError::RowLength {
                row: row.id,
                expected: self.components.len(),
                found: row.cells.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Component ids of the coefficient columns
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn rows(&self) -> &[ProcessRow] {
        &self.rows
    }

    /// Parse a table from comma separated text
    ///
    /// # Parameters
    /// - text: CSV text, the first line is the header
    ///
    /// # Returns
    /// The table, or a [`TableError`] if the header has fewer than three columns or a row has
    /// more cells than the header
    ///
    /// # Examples
    /// ```rust
    /// use stoichrs_core::io::table::{Cell, ProcessTable};
    /// let table = ProcessTable::from_csv_str(",S,X,rate\ngrowth,-1,1,mu*X\n").unwrap();
    /// assert_eq!(table.components(), &["S", "X"]);
    /// assert_eq!(table.rows()[0].cells, vec![Cell::Value(-1.), Cell::Value(1.)]);
    /// ```
    pub fn from_csv_str(text: &str) -> Result<Self, TableError> {
        let placeholder = configuration::current().unknown_placeholder;
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());
        let header = match lines.next() {
            Some((_, line)) => split_record(line),
            None => return Err(TableError::MissingColumns(0)),
        };
        if header.len() < 3 {
            return Err(TableError::MissingColumns(header.len()));
        }
        let n_components = header.len() - 2;
        let mut table = ProcessTable::new(
            header[1..=n_components]
                .iter()
                .map(|c| c.trim().to_string())
                .collect(),
        );

        for (line_number, line) in lines {
            let mut fields = split_record(line);
            if fields.len() > header.len() {
                return Err(TableError::RowLength {
                    row: format!("line {}", line_number + 1),
                    expected: header.len(),
                    found: fields.len(),
                });
            }
            // Trailing empty cells may be left off
            fields.resize(header.len(), String::new());
            let id = fields[0].trim().to_string();
            if id.is_empty() {
                return Err(TableError::MissingId(line_number + 1));
            }
            let rate = fields[header.len() - 1].trim();
            table.push_row(ProcessRow {
                id,
                cells: fields[1..=n_components]
                    .iter()
                    .map(|f| Cell::parse(f, &placeholder))
                    .collect(),
                rate_equation: if rate.is_empty() {
                    None
                } else {
                    Some(rate.to_string())
                },
            })?;
        }
        Ok(table)
    }

    /// Read a table from a `.csv` file
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
            _ => return Err(TableError::UnsupportedFormat(path.display().to_string())),
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => return Err(TableError::UnableToRead(err.to_string())),
        };
        ProcessTable::from_csv_str(&text)
    }
}

/// Split a CSV record on commas, respecting double quoted fields
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }
    fields.push(field);
    fields
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TableError {
    #[error("Unable to read process table: {0}")]
    UnableToRead(String),
    #[error("Unsupported process table format {0}, only .csv files can be read")]
    UnsupportedFormat(String),
    #[error("Process table needs an id column, at least one component column and a rate column, found {0} column(s)")]
    MissingColumns(usize),
    #[error("Row {row} has {found} cell(s), expected {expected}")]
    RowLength {
        row: String,
        expected: usize,
        found: usize,
    },
    #[error("Row on line {0} has no process id")]
    MissingId(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_cells() {
        assert_eq!(Cell::parse("  ", "?"), Cell::Blank);
        assert_eq!(Cell::parse("0", "?"), Cell::Blank);
        assert_eq!(Cell::parse("?", "?"), Cell::Unknown);
        assert_eq!(Cell::parse("-1.5", "?"), Cell::Value(-1.5));
        assert_eq!(
            Cell::parse(" -1/Y_H ", "?"),
            Cell::Expression("-1/Y_H".to_string())
        );
        assert_eq!(Cell::Blank.coefficient(), None);
    }

    #[test]
    fn quoted_fields() {
        assert_eq!(
            split_record(r#"growth,1,"mu*S/(K + S)","say ""hi""""#),
            vec!["growth", "1", "mu*S/(K + S)", r#"say "hi""#]
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let table = ProcessTable::from_csv_str(",A,B,rate\nonly_a,1\n").unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.cells, vec![Cell::Value(1.), Cell::Blank]);
        assert_eq!(row.rate_equation, None);
    }

    #[test]
    fn malformed_tables() {
        assert_eq!(
            ProcessTable::from_csv_str(",rate\n"),
            Err(TableError::MissingColumns(2))
        );
        assert!(matches!(
            ProcessTable::from_csv_str(",A,rate\np,1,k,extra\n"),
            Err(TableError::RowLength { .. })
        ));
        assert_eq!(
            ProcessTable::from_csv_str(",A,rate\n,1,k\n"),
            Err(TableError::MissingId(2))
        );
        assert!(matches!(
            ProcessTable::read_csv("processes.tsv"),
            Err(TableError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn read_asm_table() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("growth_decay.csv");
        let table = ProcessTable::read_csv(path).unwrap();
        assert_eq!(table.components(), &["S", "X", "S_O"]);
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.rows()[0].id, "growth");
        assert_eq!(
            table.rows()[0].rate_equation.as_deref(),
            Some("mu*S/(K + S)*X")
        );
        assert_eq!(table.rows()[1].cells[0], Cell::Blank);
    }
}
