// 📊 Accessibility Report - filter-and-count statistics over the unified table
// Every count is retrievable on its own; sentences are rendered from them.

use crate::error::{Error, Result};
use crate::features::LEVEL_ACCESS_BATHING;
use crate::table::{Value, WideRow, WideTable};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Known gap in the above-ground statistic
pub const EXTERNAL_STEPS_LIMITATION: &str = "External steps cannot be assessed for dwellings above the ground floor: \
     the element survey counts steps to the communal entrance and stairwell steps \
     (negated by the presence of a lift) as one value.";

// ============================================================================
// REPORT CONFIG
// ============================================================================

/// Column names and codes the statistics are computed against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub floor_level_column: String,
    pub steps_in_column: String,
    pub steps_out_column: String,

    /// Floor level code for the ground floor; also the marker searched for
    /// when deciding a dwelling is above ground
    pub ground_floor_code: String,

    /// Block column that must equal 1 for above-ground access
    pub lift_column: String,

    pub bathing_column: String,

    pub rating_column: String,

    /// Rating meaning "surveyed but not graded"
    pub ungraded_rating: String,

    pub high_ratings: Vec<String>,

    /// Name used in rendered sentences
    pub organisation: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            floor_level_column: "FLOORLEVEL".to_string(),
            steps_in_column: "STEPSIN".to_string(),
            steps_out_column: "STEPSOUT".to_string(),
            ground_floor_code: "G".to_string(),
            lift_column: "LIFT,LIFT 2".to_string(),
            bathing_column: LEVEL_ACCESS_BATHING.to_string(),
            rating_column: "LAHR_SCORE".to_string(),
            ungraded_rating: "G".to_string(),
            high_ratings: vec!["A".to_string(), "B".to_string()],
            organisation: "Camden".to_string(),
        }
    }
}

// ============================================================================
// ACCESSIBILITY REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityReport {
    pub total_dwellings: usize,
    pub surveyed_with_step_data: usize,
    pub ground_floor_accessible: usize,
    pub ground_floor_accessible_with_bathing: usize,
    pub above_ground_accessible: usize,
    pub above_ground_accessible_with_bathing: usize,
    pub survey_coverage: usize,
    pub high_rating: usize,

    /// `None` when no dwelling has a graded survey
    pub high_rating_ratio: Option<f64>,

    pub limitations: Vec<String>,

    pub organisation: String,
    pub high_ratings: Vec<String>,
}

impl AccessibilityReport {
    /// Statistic name → value
    pub fn statistics(&self) -> BTreeMap<&'static str, f64> {
        let mut stats = BTreeMap::new();
        stats.insert("total_dwellings", self.total_dwellings as f64);
        stats.insert("surveyed_with_step_data", self.surveyed_with_step_data as f64);
        stats.insert("ground_floor_accessible", self.ground_floor_accessible as f64);
        stats.insert(
            "ground_floor_accessible_with_bathing",
            self.ground_floor_accessible_with_bathing as f64,
        );
        stats.insert("above_ground_accessible", self.above_ground_accessible as f64);
        stats.insert(
            "above_ground_accessible_with_bathing",
            self.above_ground_accessible_with_bathing as f64,
        );
        stats.insert("survey_coverage", self.survey_coverage as f64);
        stats.insert("high_rating", self.high_rating as f64);
        stats.insert("high_rating_ratio", self.high_rating_ratio.unwrap_or(f64::NAN));
        stats
    }

    /// Ratio as a percentage, or "n/a" when undefined
    pub fn ratio_display(&self) -> String {
        match self.high_rating_ratio {
            Some(ratio) => format!("{:.1}%", ratio * 100.0),
            None => "n/a".to_string(),
        }
    }

    pub fn sentences(&self) -> Vec<String> {
        let n = self.surveyed_with_step_data;
        vec![
            format!(
                "There are {} tenanted or void properties in {}'s housing stock which have element data on floor level, and number of steps inside and outside the property.",
                n, self.organisation
            ),
            format!(
                "Of the {} there are {} properties on the ground floor with no internal or external steps. Of those {} have a level-access shower or bath.",
                n, self.ground_floor_accessible, self.ground_floor_accessible_with_bathing
            ),
            format!(
                "Of the {} there are {} above the ground floor with at least 2 lifts in the block and no internal steps. Of those {} have a level-access shower or bath.",
                n, self.above_ground_accessible, self.above_ground_accessible_with_bathing
            ),
            format!(
                "A total of {} tenanted or void properties in {}'s housing stock have received accessibility surveys, of which {} or {} were rated {}.",
                self.survey_coverage,
                self.organisation,
                self.high_rating,
                self.ratio_display(),
                self.high_ratings.join(" or ")
            ),
        ]
    }

    pub fn summary(&self) -> String {
        format!(
            "{} dwellings | step data {} | GF accessible {} ({} bathing) | above GF {} ({} bathing) | surveyed {} | high rating {} ({})",
            self.total_dwellings,
            self.surveyed_with_step_data,
            self.ground_floor_accessible,
            self.ground_floor_accessible_with_bathing,
            self.above_ground_accessible,
            self.above_ground_accessible_with_bathing,
            self.survey_coverage,
            self.high_rating,
            self.ratio_display()
        )
    }
}

// ============================================================================
// REPORT ENGINE
// ============================================================================

pub struct ReportEngine {
    config: ReportConfig,
}

impl ReportEngine {
    pub fn new(config: ReportConfig) -> Self {
        ReportEngine { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Compute every statistic over `table`
    pub fn compute(&self, table: &WideTable) -> Result<AccessibilityReport> {
        let c = &self.config;
        let mut report = AccessibilityReport {
            total_dwellings: table.len(),
            surveyed_with_step_data: 0,
            ground_floor_accessible: 0,
            ground_floor_accessible_with_bathing: 0,
            above_ground_accessible: 0,
            above_ground_accessible_with_bathing: 0,
            survey_coverage: 0,
            high_rating: 0,
            high_rating_ratio: None,
            limitations: vec![EXTERNAL_STEPS_LIMITATION.to_string()],
            organisation: c.organisation.clone(),
            high_ratings: c.high_ratings.clone(),
        };

        for row in table.rows() {
            let floor = row.get(&c.floor_level_column);
            let steps_in_raw = row.get(&c.steps_in_column);
            let steps_out_raw = row.get(&c.steps_out_column);

            // Coerce before filtering so a bad value anywhere is reported
            let steps_in = self.numeric(table, row, &c.steps_in_column)?;
            let steps_out = self.numeric(table, row, &c.steps_out_column)?;
            let has_bathing = row.get(&c.bathing_column).equals_number(1.0);

            if !floor.is_null() && !steps_in_raw.is_null() && !steps_out_raw.is_null() {
                report.surveyed_with_step_data += 1;
            }

            if floor.as_text() == Some(c.ground_floor_code.as_str())
                && steps_in == Some(0.0)
                && steps_out == Some(0.0)
            {
                report.ground_floor_accessible += 1;
                if has_bathing {
                    report.ground_floor_accessible_with_bathing += 1;
                }
            }

            let above_ground = !floor.to_string().contains(c.ground_floor_code.as_str());
            if above_ground
                && steps_in == Some(0.0)
                && row.get(&c.lift_column).equals_number(1.0)
            {
                report.above_ground_accessible += 1;
                if has_bathing {
                    report.above_ground_accessible_with_bathing += 1;
                }
            }

            if let Some(rating) = self.graded_rating(row) {
                report.survey_coverage += 1;
                if c.high_ratings.iter().any(|h| h == rating) {
                    report.high_rating += 1;
                }
            }
        }

        report.high_rating_ratio = ratio(report.high_rating, report.survey_coverage);

        info!("Report: {}", report.summary());
        Ok(report)
    }

    fn numeric(&self, table: &WideTable, row: &WideRow, column: &str) -> Result<Option<f64>> {
        row.get(column).coerce_f64().map_err(|raw| Error::DataFormat {
            table: table.name().to_string(),
            entity: row.get(table.key_column()).to_string(),
            column: column.to_string(),
            value: raw.to_string(),
        })
    }

    /// Rating text when present, non-empty and not ungraded
    fn graded_rating<'a>(&self, row: &'a WideRow) -> Option<&'a str> {
        let rating = match row.get(&self.config.rating_column) {
            Value::Null => return None,
            Value::Text(s) => s.as_str(),
            // A numeric rating cannot be one of the letter grades
            Value::Number(_) => return None,
        };
        if rating.is_empty() || rating == self.config.ungraded_rating {
            None
        } else {
            Some(rating)
        }
    }
}

impl Default for ReportEngine {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

/// `part / whole`, or `None` when `whole` is zero
pub fn ratio(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dwelling(code: &str, cells: &[(&str, Value)]) -> WideRow {
        let mut row: WideRow = cells.iter().cloned().collect();
        row.set("dwelling_code", code);
        row
    }

    fn table(rows: Vec<WideRow>) -> WideTable {
        let mut t = WideTable::new("unified", "dwelling_code");
        for r in rows {
            t.push_row(r);
        }
        t
    }

    fn steps(floor: &str, steps_in: &str, steps_out: &str) -> Vec<(&'static str, Value)> {
        vec![
            ("FLOORLEVEL", Value::text(floor)),
            ("STEPSIN", Value::text(steps_in)),
            ("STEPSOUT", Value::text(steps_out)),
        ]
    }

    #[test]
    fn test_ground_floor_counts() {
        let mut with_bath = steps("G", "0", "0");
        with_bath.push((LEVEL_ACCESS_BATHING, Value::Number(1.0)));

        let t = table(vec![
            dwelling("D1", &with_bath),
            dwelling("D2", &steps("G", "0", "2")),
            dwelling("D3", &steps("G", "0.0", "0")),
            dwelling("D4", &[("FLOORLEVEL", Value::text("G"))]),
        ]);

        let report = ReportEngine::default().compute(&t).unwrap();

        assert_eq!(report.total_dwellings, 4);
        assert_eq!(report.surveyed_with_step_data, 3);
        assert_eq!(report.ground_floor_accessible, 2);
        assert_eq!(report.ground_floor_accessible_with_bathing, 1);
    }

    #[test]
    fn test_above_ground_requires_lift() {
        let mut lifted = steps("3", "0", "5");
        lifted.push(("LIFT,LIFT 2", Value::Number(1.0)));
        lifted.push((LEVEL_ACCESS_BATHING, Value::Number(1.0)));
        let mut no_lift = steps("2", "0", "0");
        no_lift.push(("LIFT,LIFT 2", Value::Null));
        let mut ground_marker = steps("UG", "0", "0");
        ground_marker.push(("LIFT,LIFT 2", Value::Number(1.0)));

        let t = table(vec![
            dwelling("D1", &lifted),
            dwelling("D2", &no_lift),
            dwelling("D3", &ground_marker),
        ]);

        let report = ReportEngine::default().compute(&t).unwrap();

        assert_eq!(report.above_ground_accessible, 1);
        assert_eq!(report.above_ground_accessible_with_bathing, 1);
        assert_eq!(report.ground_floor_accessible, 0);
    }

    #[test]
    fn test_non_numeric_steps_are_a_fault() {
        let t = table(vec![dwelling("D7", &steps("G", "none", "0"))]);

        match ReportEngine::default().compute(&t) {
            Err(Error::DataFormat { entity, column, value, .. }) => {
                assert_eq!(entity, "D7");
                assert_eq!(column, "STEPSIN");
                assert_eq!(value, "none");
            }
            other => panic!("expected data format fault, got {:?}", other),
        }
    }

    #[test]
    fn test_survey_coverage_and_ratio() {
        let t = table(vec![
            dwelling("D1", &[("LAHR_SCORE", Value::text("A"))]),
            dwelling("D2", &[("LAHR_SCORE", Value::text("B"))]),
            dwelling("D3", &[("LAHR_SCORE", Value::text("E"))]),
            dwelling("D4", &[("LAHR_SCORE", Value::text("G"))]),
            dwelling("D5", &[("LAHR_SCORE", Value::text(""))]),
            dwelling("D6", &[]),
        ]);

        let report = ReportEngine::default().compute(&t).unwrap();

        assert_eq!(report.survey_coverage, 3);
        assert_eq!(report.high_rating, 2);
        let ratio = report.high_rating_ratio.unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.ratio_display(), "66.7%");
    }

    #[test]
    fn test_ratio_without_surveys_is_undefined() {
        let t = table(vec![dwelling("D1", &[])]);

        let report = ReportEngine::default().compute(&t).unwrap();

        assert_eq!(report.survey_coverage, 0);
        assert_eq!(report.high_rating, 0);
        assert_eq!(report.high_rating_ratio, None);
        assert!(report.statistics()["high_rating_ratio"].is_nan());
        assert_eq!(report.ratio_display(), "n/a");
        assert!(report.sentences()[3].contains("n/a"));
    }

    #[test]
    fn test_ratio_helper() {
        assert_eq!(ratio(0, 0), None);
        assert_eq!(ratio(1, 4), Some(0.25));
    }

    #[test]
    fn test_statistics_and_sentences() {
        let t = table(vec![dwelling("D1", &steps("G", "0", "0"))]);

        let report = ReportEngine::default().compute(&t).unwrap();
        let stats = report.statistics();

        assert_eq!(stats["ground_floor_accessible"], 1.0);
        assert_eq!(stats.len(), 9);
        let sentences = report.sentences();
        assert_eq!(sentences.len(), 4);
        assert!(sentences[0].contains("Camden"));
        assert!(sentences[1].contains("there are 1 properties on the ground floor"));
        assert_eq!(report.limitations, vec![EXTERNAL_STEPS_LIMITATION.to_string()]);
    }

    #[test]
    fn test_config_overrides_codes() {
        let config = ReportConfig {
            ground_floor_code: "00".to_string(),
            organisation: "Islington".to_string(),
            ..Default::default()
        };
        let t = table(vec![dwelling("D1", &steps("00", "0", "0"))]);

        let report = ReportEngine::new(config).compute(&t).unwrap();

        assert_eq!(report.ground_floor_accessible, 1);
        assert!(report.sentences()[0].contains("Islington"));
    }
}
