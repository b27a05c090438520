//! # plotwise - Declarative Charts over SQL
//!
//! plotwise turns a chart request (a chart type, dimensions, metrics and
//! filters over one dataset) into a single grouped SQL aggregation, runs it,
//! and shapes the result into a JSON document for an ECharts-style client.
//! Query execution is built on DataFusion; external PostgreSQL sources are
//! reached through `datafusion-table-providers` when the `postgres` feature is
//! enabled.
//!
//! ## Quick Start
//!
//! ```rust
//! use plotwise::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> plotwise::error::Result<()> {
//! // Primary store with one table
//! let ctx = ChartContext::new()?;
//! ctx.inner()
//!     .sql("CREATE TABLE covid (country VARCHAR, cases BIGINT) AS VALUES ('US', 10), ('CA', 3)")
//!     .await?;
//!
//! // Records describing where the table lives and what its columns are
//! let catalog = InMemoryCatalog::new();
//! catalog
//!     .insert_source(Source {
//!         id: 1,
//!         name: "uploads".to_string(),
//!         source_type: SourceType::Csv,
//!         config: SourceConfig::default(),
//!     })
//!     .await;
//! catalog
//!     .insert_dataset(Dataset {
//!         id: 1,
//!         source_id: 1,
//!         name: "covid".to_string(),
//!         config: DatasetConfig::new("public", "covid", ["country::text", "cases::integer"]),
//!     })
//!     .await;
//!
//! let service = ChartService::new(Arc::new(ctx), Arc::new(catalog));
//! let document = service
//!     .validate(&ValidateChartRequest {
//!         dataset_id: 1,
//!         name: "Cases by country".to_string(),
//!         chart_type: "bar".to_string(),
//!         dimensions: vec!["country".to_string()],
//!         metrics: vec!["SUM(cases)".to_string()],
//!         filters: vec![],
//!     })
//!     .await?;
//!
//! assert_eq!(document["xAxis"]["data"][0], "CA");
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`column`]: `name::type` column descriptors and the dimension and metric
//!    catalogs derived from them.
//! 2. [`query`]: compiles dimensions, metrics and `column/op/value` filters
//!    into SQL.
//! 3. [`execute`]: runs the SQL on a [`execute::Connection`] and reshapes the
//!    rows into groups and values.
//! 4. [`render`]: one renderer per chart type (bar, pie, line, scatter,
//!    heatmap, sankey) builds the document.
//! 5. [`service`]: resolves datasets and sources and ties the steps together.
//!
//! ## Data Sources
//!
//! Uploaded CSV files are imported into the primary store with
//! [`sources::import_csv_source`], which also discovers the column types.
//! Datasets of `postgres` sources are queried in place through a fresh
//! connection per evaluation.
//!
//! ## Logging
//!
//! plotwise emits `tracing` spans and events; install a subscriber with
//! [`logging::setup::init_logging`] or your own.

pub mod column;
pub mod context;
pub mod error;
pub mod execute;
pub mod logging;
pub mod model;
pub mod prelude;
pub mod query;
pub mod render;
pub mod repository;
pub mod security;
pub mod service;
pub mod sources;

#[cfg(test)]
pub(crate) mod test_helpers;
