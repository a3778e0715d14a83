// 🔗 Join Engine - left-outer merges onto the tenancy roster
// Every roster row survives exactly once; unmatched rows are null-filled.

use crate::error::{Error, Result};
use crate::records::TenancyRecord;
use crate::table::{Value, WideRow, WideTable};
use log::info;

pub const DWELLING_CODE: &str = "dwelling_code";
pub const BUILDING_ID: &str = "building_id";
pub const OCCUPANCY: &str = "dwelling_occupancy_classification";

/// Build the left-hand table of the join chain from roster rows
///
/// Fails if a dwelling code appears more than once, since every later
/// join relies on one row per dwelling.
pub fn roster_table<'a, I>(tenancies: I) -> Result<WideTable>
where
    I: IntoIterator<Item = &'a TenancyRecord>,
{
    let mut table = WideTable::new("tenancies", DWELLING_CODE).with_columns([BUILDING_ID, OCCUPANCY]);
    for t in tenancies {
        let mut row = WideRow::new();
        row.set(DWELLING_CODE, t.dwelling_code.as_str());
        row.set(BUILDING_ID, t.building_id.clone());
        row.set(OCCUPANCY, t.occupancy_classification.as_str());
        table.push_row(row);
    }
    table.key_index()?;
    Ok(table)
}

/// Left-outer join `right` onto `left`, matching `left[left_key]` with
/// the key column of `right`
///
/// - the result keeps every left row once, in left order
/// - right columns are appended; the right key column is not repeated
/// - a null left key never matches
pub fn left_join(left: &WideTable, right: &WideTable, left_key: &str) -> Result<WideTable> {
    if !left.has_column(left_key) {
        return Err(Error::MissingColumn {
            table: left.name().to_string(),
            column: left_key.to_string(),
        });
    }

    let index = right.key_index()?;
    let right_columns: Vec<&String> = right.value_columns().collect();

    if let Some(clash) = right_columns.iter().find(|c| left.has_column(c)) {
        return Err(Error::ColumnConflict {
            table: right.name().to_string(),
            column: clash.to_string(),
        });
    }

    let mut joined = WideTable::new(left.name(), left.key_column())
        .with_columns(left.columns().iter().cloned())
        .with_columns(right_columns.iter().map(|c| c.to_string()));

    let mut matched = 0usize;
    for left_row in left.rows() {
        let mut row = left_row.clone();
        let right_row = left_row
            .get(left_key)
            .as_text()
            .and_then(|key| index.get(key))
            .map(|&position| &right.rows()[position]);

        match right_row {
            Some(found) => {
                matched += 1;
                for column in &right_columns {
                    row.set(column.as_str(), found.get(column).clone());
                }
            }
            None => {
                for column in &right_columns {
                    row.set(column.as_str(), Value::Null);
                }
            }
        }
        joined.push_row(row);
    }

    info!(
        "Joined {} onto {} by {}: {}/{} rows matched, {} columns added",
        right.name(),
        left.name(),
        left_key,
        matched,
        left.len(),
        right_columns.len()
    );

    Ok(joined)
}

// ============================================================================
// TESTS
// ============================================================================
