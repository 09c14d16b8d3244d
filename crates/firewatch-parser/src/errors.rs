use std::fmt;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct SchemaAttempt {
    pub schema: &'static str,
    pub message: String,
}

impl SchemaAttempt {
    pub fn new(schema: &'static str, message: impl Into<String>) -> Self {
        Self {
            schema,
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.schema, self.message)
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("{schema} confidence schema mismatch: {reason}")]
    SchemaMismatch {
        schema: &'static str,
        reason: String,
    },

    #[error("missing required columns: {missing:?}")]
    MissingColumns { missing: Vec<String> },

    #[error("CSV error: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    #[error("data row {line_index} column '{column}' invalid: {message}")]
    DataRow {
        line_index: usize,
        column: String,
        message: String,
    },

    #[error("data row {line_index} has an unparseable acquisition datetime '{value}'")]
    Timestamp { line_index: usize, value: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl NormalizeError {
    /// True when the feed is structurally unusable (columns absent) rather than
    /// carrying a bad value in some row.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            NormalizeError::MissingColumns { .. } | NormalizeError::SchemaMismatch { .. }
        )
    }
}
