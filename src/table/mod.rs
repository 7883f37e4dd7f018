// src/table/mod.rs
pub mod header;

/// A single field value. `None` marks a missing cell: blank CSV fields and
/// empty spreadsheet cells land here, so downstream code has one notion of
/// "no value" regardless of the source format.
pub type Cell = Option<String>;

/// Column label as it comes off a parser, before header repair.
///
/// Spreadsheet and HTML sources can hand back positional numeric labels
/// instead of real names; repair (see `header`) detects the all-numeric case
/// and promotes a data row to be the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Name(String),
    Index(i64),
}

impl Label {
    pub fn is_index(&self) -> bool {
        matches!(self, Label::Index(_))
    }

    /// String form used once labels become column names.
    pub fn to_text(&self) -> String {
        match self {
            Label::Name(s) => s.clone(),
            Label::Index(i) => i.to_string(),
        }
    }
}

/// Raw parser output: labelled columns plus data rows, not yet normalized.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub labels: Vec<Label>,
    pub rows: Vec<Vec<Cell>>,
}

/// A normalized table: named columns and rows padded to the column count.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, resizing every row to the column count so the grid is
    /// rectangular from here on.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with this name. Duplicate names are legal;
    /// lookups always resolve to the first occurrence.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Set a column to a constant value in every row. An existing column of
    /// the same name is overwritten in place; otherwise the column is
    /// appended on the right (assignment semantics).
    pub fn set_column(&mut self, name: &str, value: &str) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = Some(value.to_string());
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(Some(value.to_string()));
                }
            }
        }
    }

    /// Copy of the first `n` rows, for previews.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Per-column numeric flag: true when the column has at least one value
    /// and every value parses as a finite number.
    pub fn numeric_columns(&self) -> Vec<bool> {
        (0..self.width())
            .map(|idx| {
                let mut any = false;
                for cell in self.column(idx) {
                    if let Some(value) = cell {
                        if parse_number(value).is_none() {
                            return false;
                        }
                        any = true;
                    }
                }
                any
            })
            .collect()
    }
}

/// Parse a cell as a finite number, tolerating surrounding whitespace.
/// `NaN`/`inf` spellings parse in Rust but are rejected here.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
