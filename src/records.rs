// 🏠 Source Records - asset attributes, property elements, tenancy roster
// Flat rows as supplied by the record source. Field names follow the
// column names of the housing asset exports.

use crate::table::Value;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder text the element survey writes for "no code"
pub const NULL_PLACEHOLDER: &str = "NUL";

// ============================================================================
// LONG-FORMAT RECORDS
// ============================================================================

/// A record in long format: one (entity, label, value) fact
///
/// The pivot engine turns a sequence of these into a wide table.
pub trait LongRecord {
    /// Entity the fact belongs to (dwelling or block id)
    fn entity(&self) -> &str;

    /// Column the fact becomes after pivoting
    fn label(&self) -> &str;

    /// Cell value before aggregation
    fn value(&self) -> Value;
}

// ============================================================================
// ATTRIBUTE RECORD (dwelling and block assets)
// ============================================================================

/// One attribute of one asset (a dwelling or a block)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    #[serde(rename = "assid", alias = "entity_id")]
    pub entity_id: String,

    #[serde(rename = "ataid", alias = "attribute_code")]
    pub attribute_code: String,

    /// Description from the attribute association table; may be missing
    #[serde(rename = "atadescription", alias = "attribute_description", default)]
    pub attribute_description: Option<String>,

    /// Quantity as exported; numeric coercion happens at aggregation time
    #[serde(rename = "asaquantity", alias = "value", default)]
    pub value: Option<String>,
}

impl AttributeRecord {
    pub fn new(
        entity_id: impl Into<String>,
        attribute_code: impl Into<String>,
        attribute_description: Option<&str>,
        value: Option<&str>,
    ) -> Self {
        AttributeRecord {
            entity_id: entity_id.into(),
            attribute_code: attribute_code.into(),
            attribute_description: attribute_description.map(str::to_string),
            value: value.map(str::to_string),
        }
    }
}

impl LongRecord for AttributeRecord {
    fn entity(&self) -> &str {
        &self.entity_id
    }

    /// Columns are named by description, falling back to the attribute code
    fn label(&self) -> &str {
        match &self.attribute_description {
            Some(desc) if !desc.trim().is_empty() => desc,
            _ => &self.attribute_code,
        }
    }

    fn value(&self) -> Value {
        self.value.clone().into()
    }
}

// ============================================================================
// ELEMENT RECORD (property element surveys)
// ============================================================================

/// A survey fact about a dwelling; rows with an end date are historical
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(rename = "pel_pro_refno", alias = "property_ref", default)]
    pub property_ref: Option<String>,

    pub dwelling_code: String,

    #[serde(rename = "pel_ele_code", alias = "element_code")]
    pub element_code: String,

    #[serde(rename = "pel_att_code", alias = "attribute_code", default)]
    pub attribute_code: Option<String>,

    #[serde(rename = "pel_numeric_value", alias = "numeric_value", default)]
    pub numeric_value: Option<f64>,

    #[serde(
        rename = "pel_end_date",
        alias = "end_date",
        default,
        deserialize_with = "deserialize_end_date"
    )]
    pub end_date: Option<NaiveDateTime>,
}

impl ElementRecord {
    pub fn new(
        dwelling_code: impl Into<String>,
        element_code: impl Into<String>,
        attribute_code: Option<&str>,
        numeric_value: Option<f64>,
    ) -> Self {
        ElementRecord {
            property_ref: None,
            dwelling_code: dwelling_code.into(),
            element_code: element_code.into(),
            attribute_code: attribute_code.map(str::to_string),
            numeric_value,
            end_date: None,
        }
    }

    /// Builder: mark the record as ended
    pub fn with_end_date(mut self, end_date: NaiveDateTime) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Only records without an end date are current
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }

    /// Attribute code followed by numeric value, with `NUL` placeholders removed
    ///
    /// Missing parts contribute nothing. The result is trimmed.
    pub fn composed_value(&self) -> String {
        let mut composed = String::new();
        if let Some(code) = &self.attribute_code {
            composed.push_str(code);
        }
        if let Some(number) = self.numeric_value {
            composed.push_str(&number.to_string());
        }
        composed.replace(NULL_PLACEHOLDER, "").trim().to_string()
    }
}

impl LongRecord for ElementRecord {
    fn entity(&self) -> &str {
        &self.dwelling_code
    }

    fn label(&self) -> &str {
        &self.element_code
    }

    fn value(&self) -> Value {
        Value::Text(self.composed_value())
    }
}

/// Accepts dates with or without a time part; empty fields are `None`
fn deserialize_end_date<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_end_date(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid end date: {}", s))),
    }
}

fn parse_end_date(s: &str) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ============================================================================
// TENANCY RECORD
// ============================================================================

/// A dwelling in the tenancy roster and the block it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenancyRecord {
    pub dwelling_code: String,

    #[serde(default)]
    pub building_id: Option<String>,

    #[serde(rename = "dwelling_occupancy_classification", alias = "occupancy_classification")]
    pub occupancy_classification: String,
}

impl TenancyRecord {
    pub fn new(dwelling_code: &str, building_id: Option<&str>, occupancy: &str) -> Self {
        TenancyRecord {
            dwelling_code: dwelling_code.to_string(),
            building_id: building_id.map(str::to_string),
            occupancy_classification: occupancy.to_string(),
        }
    }
}

// ============================================================================
// RECORD SET
// ============================================================================

/// The four materialized record sets a pipeline run reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub dwelling_attributes: Vec<AttributeRecord>,
    pub block_attributes: Vec<AttributeRecord>,
    pub elements: Vec<ElementRecord>,
    pub tenancies: Vec<TenancyRecord>,
}

impl RecordSet {
    /// Element records that are still current
    pub fn active_elements(&self) -> impl Iterator<Item = &ElementRecord> {
        self.elements.iter().filter(|e| e.is_active())
    }

    /// Roster rows whose occupancy is in `allowed`
    pub fn tenancies_in_scope<'a>(
        &'a self,
        allowed: &'a [String],
    ) -> impl Iterator<Item = &'a TenancyRecord> {
        self.tenancies
            .iter()
            .filter(move |t| allowed.iter().any(|a| *a == t.occupancy_classification))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composed_value_code_only() {
        let e = ElementRecord::new("D1", "FLOORLEVEL", Some("G"), None);
        assert_eq!(e.composed_value(), "G");
    }

    #[test]
    fn test_composed_value_numeric_only() {
        let e = ElementRecord::new("D1", "STEPSIN", None, Some(0.0));
        assert_eq!(e.composed_value(), "0");
        assert_eq!(e.value().coerce_f64(), Ok(Some(0.0)));
    }

    #[test]
    fn test_placeholder_is_stripped() {
        let e = ElementRecord::new("D1", "ADAPTATION", Some("NUL"), None);
        assert_eq!(e.composed_value(), "");

        let e = ElementRecord::new("D1", "STEPSOUT", Some("NUL "), Some(2.0));
        assert_eq!(e.composed_value(), "2");
    }

    #[test]
    fn test_attribute_label_falls_back_to_code() {
        let described = AttributeRecord::new("A1", "822", Some("LIFT,LIFT 1"), Some("1"));
        let bare = AttributeRecord::new("A1", "823", None, Some("1"));

        assert_eq!(described.label(), "LIFT,LIFT 1");
        assert_eq!(bare.label(), "823");
        assert_eq!(bare.value(), Value::text("1"));
    }

    #[test]
    fn test_active_elements_exclude_ended_rows() {
        let ended = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let records = RecordSet {
            elements: vec![
                ElementRecord::new("D1", "LIFT", Some("Y"), None),
                ElementRecord::new("D1", "LIFT", Some("N"), None).with_end_date(ended),
            ],
            ..Default::default()
        };

        let active: Vec<_> = records.active_elements().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].attribute_code.as_deref(), Some("Y"));
    }

    #[test]
    fn test_tenancies_in_scope() {
        let records = RecordSet {
            tenancies: vec![
                TenancyRecord::new("D1", Some("B1"), "Tenant"),
                TenancyRecord::new("D2", Some("B1"), "Leasehold"),
                TenancyRecord::new("D3", None, "Void"),
            ],
            ..Default::default()
        };
        let allowed = vec!["Tenant".to_string(), "Void".to_string()];

        let codes: Vec<_> = records
            .tenancies_in_scope(&allowed)
            .map(|t| t.dwelling_code.as_str())
            .collect();
        assert_eq!(codes, vec!["D1", "D3"]);
    }

    #[test]
    fn test_parse_end_date_formats() {
        assert!(parse_end_date("2021-03-04").is_some());
        assert!(parse_end_date("2021-03-04 10:11:12").is_some());
        assert!(parse_end_date("04/03/2021").is_some());
        assert!(parse_end_date("yesterday").is_none());
    }
}
