// ⚠️ Pipeline Faults
// Pivot and join faults abort the run; each variant names the table involved

/// Faults raised while reshaping, joining and counting dwelling data
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value that must be numeric (summed quantity, step count) is not
    #[error("[{table}] non-numeric value {value:?} in column '{column}' for entity '{entity}'")]
    DataFormat {
        table: String,
        entity: String,
        column: String,
        value: String,
    },

    /// A required key or column is absent from a table
    #[error("[{table}] required column '{column}' is missing")]
    MissingColumn { table: String, column: String },

    /// A key that must be unique appears more than once
    #[error("[{table}] duplicate key '{key}'")]
    DuplicateKey { table: String, key: String },

    /// Joining would overwrite a column that already exists on the left side
    #[error("[{table}] column '{column}' already exists in the joined table")]
    ColumnConflict { table: String, column: String },

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Alias for Result with pipeline `Error`
pub type Result<T> = std::result::Result<T, Error>;
