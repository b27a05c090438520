//! Error types for the plotwise chart pipeline.
//!
//! Every failure between resolving a chart request and rendering its document
//! is represented by [`ChartError`]. Nothing in the pipeline retries or
//! recovers locally; errors are handed back to the orchestration caller as a
//! single value.

use thiserror::Error;

/// The main error type for plotwise.
#[derive(Error, Debug)]
pub enum ChartError {
    /// The requested chart type tag is not registered.
    #[error("Unknown chart type: {0}")]
    UnknownChartType(String),

    /// The referenced dataset does not exist.
    #[error("Dataset {0} not found")]
    UnknownDataset(i64),

    /// The referenced source does not exist.
    #[error("Source {0} not found")]
    UnknownSource(i64),

    /// The referenced persisted chart does not exist.
    #[error("Chart {0} not found")]
    UnknownChart(i64),

    /// The connection could not run a compiled query.
    #[error("Query execution failed: {message}")]
    Execution {
        /// Human-readable error message
        message: String,
        /// Underlying driver error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A chart document could not be assembled.
    #[error("Render error: {0}")]
    Render(String),

    /// A request is outside the advertised capability schema of its chart type.
    #[error("Chart type '{chart_type}' rejects {field}: {message}")]
    CapabilityViolation {
        /// Chart type tag
        chart_type: String,
        /// Field rule that was violated ("dimensions", "metrics" or "filters")
        field: String,
        /// Detailed error message
        message: String,
    },

    /// Error from data source registration or discovery.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "PostgreSQL")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error when an operation is not supported by this build.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ChartError>`.
pub type Result<T> = std::result::Result<T, ChartError>;

impl ChartError {
    /// Creates a new execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new execution error that keeps the driver error as its source.
    pub fn execution_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Execution {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new capability violation error.
    pub fn capability_violation(
        chart_type: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CapabilityViolation {
            chart_type: chart_type.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ChartError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            ChartError::Internal(inner) => ChartError::Internal(format!("{msg}: {inner}")),
            other => ChartError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                ChartError::Internal(inner) => ChartError::Internal(format!("{msg}: {inner}")),
                other => ChartError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_unknown_chart_type_message() {
        let err = ChartError::UnknownChartType("radar".to_string());
        assert_eq!(err.to_string(), "Unknown chart type: radar");
    }

    #[test]
    fn test_execution_error_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ChartError::execution_with_source("failed to run chart query", Box::new(source));

        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "Query execution failed: failed to run chart query"
        );
    }

    #[test]
    fn test_data_source_error() {
        let err = ChartError::data_source("CSV", "missing header row");
        assert_eq!(err.to_string(), "Data source error: missing header row");
    }

    #[test]
    fn test_capability_violation_message() {
        let err = ChartError::capability_violation("pie", "dimensions", "expected at most 1, got 2");
        assert_eq!(
            err.to_string(),
            "Chart type 'pie' rejects dimensions: expected at most 1, got 2"
        );
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(ChartError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("While rendering chart")
            .unwrap_err();
        assert!(err.to_string().contains("While rendering chart"));
        assert!(err.to_string().contains("Something went wrong"));
    }
}
