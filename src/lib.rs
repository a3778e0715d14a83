// Housing Accessibility - Core Library
// Reshapes housing asset records into one row per dwelling and counts
// step-free access, lifts, level-access bathing and survey ratings.

pub mod error;
pub mod table;
pub mod records;
pub mod source;
pub mod pivot;
pub mod join;
pub mod features;
pub mod report;
pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use error::{Error, Result};
pub use table::{Value, WideRow, WideTable};
pub use records::{
    AttributeRecord, ElementRecord, TenancyRecord, RecordSet, LongRecord,
    NULL_PLACEHOLDER,
};
pub use source::{RecordSource, CsvSource, load_csv, read_csv};
pub use pivot::{Pivot, Aggregation, NonNumericPolicy};
pub use join::{left_join, roster_table};
pub use features::{
    FeatureEngine, IndicatorRule, CombineMode, Override, LEVEL_ACCESS_BATHING,
};
pub use report::{
    AccessibilityReport, ReportConfig, ReportEngine, EXTERNAL_STEPS_LIMITATION,
};
pub use config::PipelineConfig;
pub use pipeline::{run, pivot_sources, unify, PipelineOutput, PivotedSources};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
