// 🚰 Pipeline - pivot → join → derive → report
// Each stage takes the previous stage's table and returns a new one.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::features::FeatureEngine;
use crate::join::{self, BUILDING_ID, DWELLING_CODE};
use crate::pivot::{Aggregation, Pivot};
use crate::records::RecordSet;
use crate::report::{AccessibilityReport, ReportEngine};
use crate::table::WideTable;
use log::{info, warn};
use serde::Serialize;

/// The three pivoted source tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotedSources {
    pub dwellings: WideTable,
    pub blocks: WideTable,
    pub elements: WideTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    /// One row per in-scope dwelling, including derived columns
    pub unified: WideTable,
    pub report: AccessibilityReport,
}

/// Pivot the dwelling attributes, block attributes and active elements
pub fn pivot_sources(records: &RecordSet, config: &PipelineConfig) -> Result<PivotedSources> {
    let dwellings = Pivot::new("dwelling_attributes", "assid", Aggregation::Sum)
        .with_non_numeric(config.non_numeric)
        .run(&records.dwelling_attributes)?;

    let blocks = Pivot::new("block_attributes", "assid", Aggregation::Sum)
        .with_non_numeric(config.non_numeric)
        .run(&records.block_attributes)?;

    let elements = Pivot::new("property_elements", DWELLING_CODE, Aggregation::First)
        .run(records.active_elements())?;

    info!(
        "Pivoted sources: {} dwellings, {} blocks, {} dwellings with elements",
        dwellings.len(),
        blocks.len(),
        elements.len()
    );

    Ok(PivotedSources {
        dwellings,
        blocks,
        elements,
    })
}

/// Left-join the in-scope roster with the pivoted sources
pub fn unify(records: &RecordSet, pivoted: &PivotedSources, config: &PipelineConfig) -> Result<WideTable> {
    let roster = join::roster_table(records.tenancies_in_scope(&config.occupancy_allow))?;

    let dropped = records.tenancies.len() - roster.len();
    if dropped > 0 {
        warn!(
            "Dropped {} roster rows outside occupancy classes {:?}",
            dropped, config.occupancy_allow
        );
    }

    let unified = join::left_join(&roster, &pivoted.dwellings, DWELLING_CODE)?;
    let unified = join::left_join(&unified, &pivoted.blocks, BUILDING_ID)?;
    let unified = join::left_join(&unified, &pivoted.elements, DWELLING_CODE)?;

    Ok(unified)
}

/// Run every stage over one snapshot of records
pub fn run(records: &RecordSet, config: &PipelineConfig) -> Result<PipelineOutput> {
    info!(
        "Pipeline input: {} dwelling attributes, {} block attributes, {} elements, {} roster rows",
        records.dwelling_attributes.len(),
        records.block_attributes.len(),
        records.elements.len(),
        records.tenancies.len()
    );

    let pivoted = pivot_sources(records, config)?;
    let unified = unify(records, &pivoted, config)?;
    let unified = FeatureEngine::from_rules(config.indicators.clone()).apply(unified)?;
    let report = ReportEngine::new(config.report.clone()).compute(&unified)?;

    Ok(PipelineOutput { unified, report })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::features::LEVEL_ACCESS_BATHING;
    use crate::records::{AttributeRecord, ElementRecord, TenancyRecord};
    use crate::table::Value;
    use chrono::NaiveDate;

    fn scenario() -> RecordSet {
        RecordSet {
            dwelling_attributes: vec![],
            block_attributes: vec![AttributeRecord::new("B1", "823", Some("LIFT,LIFT 2"), Some("1"))],
            elements: vec![
                ElementRecord::new("D1", "FLOORLEVEL", Some("G"), None),
                ElementRecord::new("D1", "STEPSIN", None, Some(0.0)),
                ElementRecord::new("D1", "STEPSOUT", None, Some(0.0)),
            ],
            tenancies: vec![TenancyRecord::new("D1", Some("B1"), "Tenant")],
        }
    }

    #[test]
    fn test_single_ground_floor_dwelling() {
        let output = run(&scenario(), &PipelineConfig::default()).unwrap();

        assert_eq!(output.unified.len(), 1);
        let d1 = output.unified.row_by_key("D1").unwrap();
        assert_eq!(d1.get(LEVEL_ACCESS_BATHING), &Value::Number(0.0));
        assert_eq!(d1.get("LIFT,LIFT 2"), &Value::Number(1.0));

        assert_eq!(output.report.surveyed_with_step_data, 1);
        assert_eq!(output.report.ground_floor_accessible, 1);
        assert_eq!(output.report.ground_floor_accessible_with_bathing, 0);
        assert_eq!(output.report.above_ground_accessible, 0);
        assert_eq!(output.report.high_rating_ratio, None);
    }

    #[test]
    fn test_every_roster_dwelling_appears_once() {
        let mut records = scenario();
        records.tenancies = vec![
            TenancyRecord::new("D1", Some("B1"), "Tenant"),
            TenancyRecord::new("D2", Some("B1"), "Void"),
            TenancyRecord::new("D3", Some("B7"), "Tenant"),
            TenancyRecord::new("D4", None, "Leasehold"),
        ];
        records.dwelling_attributes = vec![
            AttributeRecord::new("D2", "809", Some("BATH,LEVEL ACCESS"), Some("1")),
            AttributeRecord::new("D9", "809", Some("BATH,LEVEL ACCESS"), Some("1")),
        ];

        let output = run(&records, &PipelineConfig::default()).unwrap();

        let codes: Vec<_> = output
            .unified
            .column(DWELLING_CODE)
            .unwrap()
            .into_iter()
            .map(|v| v.as_text().unwrap().to_string())
            .collect();
        assert_eq!(codes, vec!["D1", "D2", "D3"]);
        assert_eq!(output.report.total_dwellings, 3);
    }

    #[test]
    fn test_dwellings_missing_from_a_source_are_null_filled() {
        let mut records = scenario();
        records.tenancies.push(TenancyRecord::new("D2", Some("B9"), "Tenant"));

        let output = run(&records, &PipelineConfig::default()).unwrap();
        let d2 = output.unified.row_by_key("D2").unwrap();

        for column in ["LIFT,LIFT 2", "FLOORLEVEL", "STEPSIN", "STEPSOUT"] {
            assert!(d2.contains(column));
            assert_eq!(d2.get(column), &Value::Null, "column {}", column);
        }
        assert_eq!(d2.get(LEVEL_ACCESS_BATHING), &Value::Number(0.0));
    }

    #[test]
    fn test_ended_elements_are_ignored() {
        let ended = NaiveDate::from_ymd_opt(2022, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut records = scenario();
        records.elements.insert(
            0,
            ElementRecord::new("D1", "FLOORLEVEL", Some("3"), None).with_end_date(ended),
        );

        let output = run(&records, &PipelineConfig::default()).unwrap();

        assert_eq!(
            output.unified.row_by_key("D1").unwrap().get("FLOORLEVEL"),
            &Value::text("G")
        );
        assert_eq!(output.report.ground_floor_accessible, 1);
    }

    #[test]
    fn test_adaptation_code_sets_bathing_indicator() {
        let mut records = scenario();
        records
            .elements
            .push(ElementRecord::new("D1", "ADAPTATION", Some("LEVELSHOWR"), None));

        let output = run(&records, &PipelineConfig::default()).unwrap();

        assert_eq!(
            output.unified.row_by_key("D1").unwrap().get(LEVEL_ACCESS_BATHING),
            &Value::Number(1.0)
        );
        assert_eq!(output.report.ground_floor_accessible_with_bathing, 1);
    }

    #[test]
    fn test_above_ground_with_lift_and_bathing() {
        let records = RecordSet {
            dwelling_attributes: vec![AttributeRecord::new(
                "D5",
                "1746",
                Some("BATHROOM,SHOWER,LEVEL ACCESS"),
                Some("1"),
            )],
            block_attributes: vec![AttributeRecord::new("B2", "823", Some("LIFT,LIFT 2"), Some("1"))],
            elements: vec![
                ElementRecord::new("D5", "FLOORLEVEL", Some("4"), None),
                ElementRecord::new("D5", "STEPSIN", None, Some(0.0)),
                ElementRecord::new("D5", "STEPSOUT", None, Some(12.0)),
                ElementRecord::new("D5", "LAHR_SCORE", Some("B"), None),
            ],
            tenancies: vec![TenancyRecord::new("D5", Some("B2"), "Tenant")],
        };

        let output = run(&records, &PipelineConfig::default()).unwrap();

        assert_eq!(output.report.above_ground_accessible, 1);
        assert_eq!(output.report.above_ground_accessible_with_bathing, 1);
        assert_eq!(output.report.survey_coverage, 1);
        assert_eq!(output.report.high_rating, 1);
        assert_eq!(output.report.high_rating_ratio, Some(1.0));
    }

    #[test]
    fn test_non_numeric_quantity_aborts_run() {
        let mut records = scenario();
        records
            .block_attributes
            .push(AttributeRecord::new("B1", "822", Some("LIFT,LIFT 1"), Some("two")));

        let err = run(&records, &PipelineConfig::default()).unwrap_err();

        assert!(matches!(err, Error::DataFormat { ref table, .. } if table == "block_attributes"));
    }

    #[test]
    fn test_duplicate_roster_rows_abort_run() {
        let mut records = scenario();
        records.tenancies.push(TenancyRecord::new("D1", Some("B1"), "Void"));

        let err = run(&records, &PipelineConfig::default()).unwrap_err();

        assert!(matches!(err, Error::DuplicateKey { ref key, .. } if key == "D1"));
    }

    #[test]
    fn test_pivoted_sources_are_reusable() {
        let records = scenario();
        let config = PipelineConfig::default();
        let pivoted = pivot_sources(&records, &config).unwrap();

        let first = unify(&records, &pivoted, &config).unwrap();
        let second = unify(&records, &pivoted, &config).unwrap();

        assert_eq!(first, second);
        assert_eq!(pivoted.elements.len(), 1);
        assert!(pivoted.dwellings.is_empty());
    }
}
