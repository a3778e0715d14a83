// 🔄 Pivot Engine - long rows → one row per entity
// Each distinct label becomes a column; duplicate (entity, label) pairs
// collapse through the configured aggregation.

use crate::error::{Error, Result};
use crate::records::LongRecord;
use crate::table::{Value, WideRow, WideTable};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// AGGREGATION RULES
// ============================================================================

/// How duplicate (entity, label) pairs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Numeric sum of all non-null values (quantities)
    Sum,
    /// First value in input order (textual codes)
    First,
}

/// What `Sum` does with a value that is not a number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonNumericPolicy {
    /// Abort with a data format fault
    #[default]
    Error,
    /// Skip the value and log a warning
    Null,
}

// ============================================================================
// PIVOT
// ============================================================================

/// A configured pivot over one record set
#[derive(Debug, Clone)]
pub struct Pivot {
    /// Table name used in log lines and faults
    pub name: String,

    /// Name given to the entity id column of the output
    pub key_column: String,

    pub aggregation: Aggregation,

    pub non_numeric: NonNumericPolicy,
}

impl Pivot {
    pub fn new(name: impl Into<String>, key_column: impl Into<String>, aggregation: Aggregation) -> Self {
        Pivot {
            name: name.into(),
            key_column: key_column.into(),
            aggregation,
            non_numeric: NonNumericPolicy::default(),
        }
    }

    /// Builder: set the non-numeric policy for `Sum`
    pub fn with_non_numeric(mut self, policy: NonNumericPolicy) -> Self {
        self.non_numeric = policy;
        self
    }

    /// Pivot `records` into a wide table
    ///
    /// Rows are ordered by entity id and columns by label, so the output
    /// does not depend on input order except through `First`.
    pub fn run<'a, R, I>(&self, records: I) -> Result<WideTable>
    where
        R: LongRecord + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let mut labels: BTreeSet<String> = BTreeSet::new();
        let mut cells: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        let mut input_rows = 0usize;

        for record in records {
            input_rows += 1;
            let label = record.label();
            if !labels.contains(label) {
                labels.insert(label.to_string());
            }

            let entity_cells = cells.entry(record.entity().to_string()).or_default();
            let value = record.value();

            match self.aggregation {
                Aggregation::First => {
                    entity_cells.entry(label.to_string()).or_insert(value);
                }
                Aggregation::Sum => {
                    let cell = entity_cells.entry(label.to_string()).or_insert(Value::Null);
                    if let Some(n) = self.coerce_for_sum(record, &value)? {
                        *cell = match *cell {
                            Value::Number(total) => Value::Number(total + n),
                            _ => Value::Number(n),
                        };
                    }
                }
            }
        }

        if let Some(clash) = labels.get(&self.key_column) {
            return Err(Error::ColumnConflict {
                table: self.name.clone(),
                column: clash.clone(),
            });
        }

        let mut table = WideTable::new(&self.name, &self.key_column).with_columns(labels.iter().cloned());
        for (entity, entity_cells) in cells {
            let mut row = WideRow::new();
            row.set(self.key_column.clone(), Value::Text(entity));
            for (label, value) in entity_cells {
                row.set(label, value);
            }
            table.push_row(row);
        }

        debug!(
            "Pivoted {}: {} input rows → {} entities × {} columns",
            self.name,
            input_rows,
            table.len(),
            labels.len()
        );

        Ok(table)
    }

    fn coerce_for_sum<R: LongRecord>(&self, record: &R, value: &Value) -> Result<Option<f64>> {
        match value.coerce_f64() {
            Ok(n) => Ok(n),
            Err(raw) => match self.non_numeric {
                NonNumericPolicy::Error => Err(Error::DataFormat {
                    table: self.name.clone(),
                    entity: record.entity().to_string(),
                    column: record.label().to_string(),
                    value: raw.to_string(),
                }),
                NonNumericPolicy::Null => {
                    warn!(
                        "[{}] skipping non-numeric value {:?} in '{}' for '{}'",
                        self.name,
                        raw,
                        record.label(),
                        record.entity()
                    );
                    Ok(None)
                }
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
