//! Data sources feeding the chart pipeline.
//!
//! Two kinds of sources exist. Uploaded CSV files are imported into the
//! primary store once and queried there afterwards ([`CsvSource`],
//! [`import_csv_source`]). External databases stay where they are; each
//! chart evaluation opens a fresh [`Connection`] to them through a
//! [`Connector`] and releases it when the evaluation ends.

use crate::error::{ChartError, Result};
use crate::execute::Connection;
use crate::model::{DatasetConfig, Source};
use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::fmt::Debug;

mod csv;

#[cfg(feature = "postgres")]
mod database;

pub use csv::{detect_type, import_csv_source, CsvOptions, CsvSource};

#[cfg(feature = "postgres")]
pub use database::{PostgresConnection, PostgresConnector};

/// A data source that can be registered with a DataFusion context.
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Registers this data source with the given session context.
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()>;

    /// Returns the schema of this data source if known.
    fn schema(&self) -> Option<&SchemaRef>;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}

/// Opens connections to the external database behind a source.
///
/// The returned connection is owned by one chart evaluation and is released
/// when dropped, on success and failure alike.
#[async_trait]
pub trait Connector: Debug + Send + Sync {
    /// Connects to `source` so that `dataset`'s table can be queried.
    async fn connect(&self, source: &Source, dataset: &DatasetConfig) -> Result<Box<dyn Connection>>;
}

/// Connector used when this build has no database driver.
///
/// Every attempt fails with [`ChartError::NotSupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedConnector;

#[async_trait]
impl Connector for UnsupportedConnector {
    async fn connect(&self, source: &Source, _dataset: &DatasetConfig) -> Result<Box<dyn Connection>> {
        Err(ChartError::NotSupported(format!(
            "{} sources require the `postgres` feature (source {})",
            source.source_type, source.id
        )))
    }
}

/// The connector matching the enabled features.
pub fn default_connector() -> Box<dyn Connector> {
    #[cfg(feature = "postgres")]
    {
        Box::new(PostgresConnector::default())
    }

    #[cfg(not(feature = "postgres"))]
    {
        Box::new(UnsupportedConnector)
    }
}
