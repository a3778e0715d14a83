// 📋 Wide Tables - Aggregates as maps, not structs
// Columns are discovered from the data at run time, so a row is a map of
// column name → Value rather than a fixed struct.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single cell: null, a number, or text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

static NULL: Value = Value::Null;

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content, if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion
    ///
    /// - `Ok(None)` for null
    /// - `Ok(Some(n))` for numbers and text that parses as a number
    /// - `Err(text)` for text that does not (including empty text)
    pub fn coerce_f64(&self) -> std::result::Result<Option<f64>, &str> {
        match self {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(*n)),
            Value::Text(s) => s.trim().parse::<f64>().map(Some).map_err(|_| s.as_str()),
        }
    }

    /// Whether the cell marks something as present
    ///
    /// Null, zero and empty text are absent. Non-numeric text is present.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) if s.trim().is_empty() => false,
            Value::Text(_) => match self.coerce_f64() {
                Ok(Some(n)) => n != 0.0 && !n.is_nan(),
                _ => true,
            },
        }
    }

    /// True when the cell is numerically equal to `target`
    ///
    /// Null and non-numeric text never match.
    pub fn equals_number(&self, target: f64) -> bool {
        matches!(self.coerce_f64(), Ok(Some(n)) if n == target)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// WIDE ROW
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WideRow {
    cells: BTreeMap<String, Value>,
}

impl WideRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell for `column`; absent columns read as null
    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.cells.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for WideRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        WideRow {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// WIDE TABLE
// ============================================================================

/// A table with one row per entity and data-dependent columns
///
/// Every row holds an explicit cell (possibly null) for every declared
/// column, so "missing" is always represented as null and never as an
/// absent entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideTable {
    name: String,
    key_column: String,
    columns: Vec<String>,
    rows: Vec<WideRow>,
}

impl WideTable {
    /// Create an empty table. The key column is always the first column.
    pub fn new(name: impl Into<String>, key_column: impl Into<String>) -> Self {
        let key_column = key_column.into();
        WideTable {
            name: name.into(),
            columns: vec![key_column.clone()],
            key_column,
            rows: Vec::new(),
        }
    }

    /// Builder: declare additional columns (duplicates are ignored)
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self.declare_column(column);
        }
        self
    }

    fn declare_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        if !self.columns.contains(&column) {
            for row in &mut self.rows {
                if !row.contains(&column) {
                    row.set(column.clone(), Value::Null);
                }
            }
            self.columns.push(column);
        }
    }

    /// Append a row, null-filling any declared column the row lacks.
    /// Columns the row carries but the table does not declare are added.
    pub fn push_row(&mut self, mut row: WideRow) {
        let extra: Vec<String> = row
            .cells()
            .map(|(column, _)| column.clone())
            .filter(|column| !self.columns.contains(column))
            .collect();
        for column in extra {
            self.declare_column(column);
        }
        for column in &self.columns {
            if !row.contains(column) {
                row.set(column.clone(), Value::Null);
            }
        }
        self.rows.push(row);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Columns other than the key column
    pub fn value_columns(&self) -> impl Iterator<Item = &String> {
        self.columns.iter().filter(move |c| **c != self.key_column)
    }

    /// All cells of one column, in row order
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        if !self.has_column(column) {
            return None;
        }
        Some(self.rows.iter().map(|row| row.get(column)).collect())
    }

    /// The row whose key column equals `key`
    pub fn row_by_key(&self, key: &str) -> Option<&WideRow> {
        self.rows
            .iter()
            .find(|row| row.get(&self.key_column).as_text() == Some(key))
    }

    /// Index of key → row position. Fails if a key appears twice.
    /// Rows with a null key are not indexed.
    pub fn key_index(&self) -> Result<HashMap<&str, usize>> {
        let mut index = HashMap::with_capacity(self.rows.len());
        for (position, row) in self.rows.iter().enumerate() {
            if let Some(key) = row.get(&self.key_column).as_text() {
                if index.insert(key, position).is_some() {
                    return Err(Error::DuplicateKey {
                        table: self.name.clone(),
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(index)
    }

    /// Return a new table with `column` appended, one value per row
    pub fn with_derived_column(mut self, column: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        let column = column.into();
        if values.len() != self.rows.len() {
            return Err(Error::Config(format!(
                "derived column '{}' has {} values for {} rows in '{}'",
                column,
                values.len(),
                self.rows.len(),
                self.name
            )));
        }
        if self.has_column(&column) {
            return Err(Error::ColumnConflict {
                table: self.name.clone(),
                column,
            });
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.set(column.clone(), value);
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Write the table as CSV, columns in declared order, nulls as empty fields
    pub fn write_csv<W: io::Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(self.columns.iter().map(|c| row.get(c).to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
