// 🛁 Derived Indicators - Rules as Data
// An indicator combines a list of presence columns, then applies overrides.
// New indicators are new rules, not new code.

use crate::error::{Error, Result};
use crate::table::{Value, WideRow, WideTable};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Column holding the level-access bathing indicator
pub const LEVEL_ACCESS_BATHING: &str = "level_access_bath_or_shower";

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// How presence columns combine into the base value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// 1 if any presence column is set, else 0
    #[default]
    Presence,
    /// Sum of the presence columns' quantities
    Count,
}

/// Force the indicator to `value` when `column` equals `equals`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub column: String,
    pub equals: String,
    #[serde(default = "default_override_value")]
    pub value: f64,
}

fn default_override_value() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRule {
    /// Name of the derived column
    pub name: String,

    /// Columns whose presence sets the indicator; absent columns count as unset
    pub presence_columns: Vec<String>,

    #[serde(default)]
    pub combine: CombineMode,

    /// Applied in order after the base value; the last matching one wins
    #[serde(default)]
    pub overrides: Vec<Override>,

    #[serde(default)]
    pub description: Option<String>,
}

impl IndicatorRule {
    pub fn new<I, S>(name: impl Into<String>, presence_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndicatorRule {
            name: name.into(),
            presence_columns: presence_columns.into_iter().map(Into::into).collect(),
            combine: CombineMode::default(),
            overrides: Vec::new(),
            description: None,
        }
    }

    /// Builder: set combine mode
    pub fn with_combine(mut self, combine: CombineMode) -> Self {
        self.combine = combine;
        self
    }

    /// Builder: force the indicator to 1 when `column` equals `equals`
    pub fn with_override(mut self, column: impl Into<String>, equals: impl Into<String>) -> Self {
        self.overrides.push(Override {
            column: column.into(),
            equals: equals.into(),
            value: default_override_value(),
        });
        self
    }

    /// Builder: add description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Level-access bath or shower, overridden by the LEVELSHOWR adaptation code
    pub fn level_access_bathing() -> Self {
        IndicatorRule::new(
            LEVEL_ACCESS_BATHING,
            [
                "BATH,LEVEL ACCESS",
                "BATHROOM,BATH,LEVEL ACCESS",
                "BATHROOM,SHOWER,LEVEL ACCESS",
                "SECONDARY BATHROOM,BATH,LEVEL ACCESS",
                "SECONDARY BATHROOM,SHOWER,LEVEL ACCESS",
                "SHOWER,LEVEL ACCESS,YES",
            ],
        )
        .with_override("ADAPTATION", "LEVELSHOWR")
        .with_description("Dwelling has a level-access bath or shower")
    }

    /// Indicator value for one row
    pub fn evaluate(&self, table: &str, key_column: &str, row: &WideRow) -> Result<f64> {
        let mut value = match self.combine {
            CombineMode::Presence => {
                let any = self.presence_columns.iter().any(|c| row.get(c).is_present());
                if any { 1.0 } else { 0.0 }
            }
            CombineMode::Count => {
                let mut total = 0.0;
                for column in &self.presence_columns {
                    match row.get(column).coerce_f64() {
                        Ok(n) => total += n.unwrap_or(0.0),
                        Err(raw) => {
                            return Err(Error::DataFormat {
                                table: table.to_string(),
                                entity: row.get(key_column).to_string(),
                                column: column.clone(),
                                value: raw.to_string(),
                            })
                        }
                    }
                }
                total
            }
        };

        for o in &self.overrides {
            let cell = row.get(&o.column);
            if !cell.is_null() && cell.to_string() == o.equals {
                value = o.value;
            }
        }

        Ok(value)
    }
}

// ============================================================================
// FEATURE ENGINE
// ============================================================================

pub struct FeatureEngine {
    rules: Vec<IndicatorRule>,
}

impl FeatureEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        FeatureEngine { rules: Vec::new() }
    }

    pub fn from_rules(rules: Vec<IndicatorRule>) -> Self {
        FeatureEngine { rules }
    }

    pub fn add_rule(&mut self, rule: IndicatorRule) {
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Append one derived column per rule, in rule order
    pub fn apply(&self, table: WideTable) -> Result<WideTable> {
        let mut table = table;
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                return Err(Error::Config("indicator rule with empty name".to_string()));
            }

            let missing: Vec<&String> = rule
                .presence_columns
                .iter()
                .filter(|c| !table.has_column(c))
                .collect();
            if !missing.is_empty() {
                debug!("{}: columns not present in this batch: {:?}", rule.name, missing);
            }

            let values = table
                .rows()
                .iter()
                .map(|row| rule.evaluate(table.name(), table.key_column(), row).map(Value::Number))
                .collect::<Result<Vec<_>>>()?;
            let set = values.iter().filter(|v| v.is_present()).count();

            table = table.with_derived_column(rule.name.clone(), values)?;
            info!("Derived {}: set for {}/{} rows", rule.name, set, table.len());
        }
        Ok(table)
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::from_rules(vec![IndicatorRule::level_access_bathing()])
    }
}

// ============================================================================
// TESTS
// ============================================================================
