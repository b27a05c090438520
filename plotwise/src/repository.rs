//! Catalog of sources, datasets and persisted charts.
//!
//! The chart service resolves every reference through a [`Catalog`]. Storage
//! of the records themselves belongs to the embedding application; this
//! module defines the lookup interface and an in-memory implementation used
//! for tests and small deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::error::{ChartError, Result};
use crate::model::{Chart, Dataset, Source};

/// Lookup interface for the records a chart evaluation depends on.
///
/// Missing records are reported as [`ChartError::UnknownSource`],
/// [`ChartError::UnknownDataset`] or [`ChartError::UnknownChart`].
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_source(&self, id: i64) -> Result<Source>;

    async fn get_dataset(&self, id: i64) -> Result<Dataset>;

    async fn get_chart(&self, id: i64) -> Result<Chart>;
}

/// In-memory [`Catalog`].
///
/// Clones share the same underlying maps.
///
/// # Example
///
/// ```rust
/// use plotwise::model::{Dataset, DatasetConfig};
/// use plotwise::repository::{Catalog, InMemoryCatalog};
///
/// # tokio_test_block(async {
/// let catalog = InMemoryCatalog::new();
/// catalog
///     .insert_dataset(Dataset {
///         id: 1,
///         source_id: 1,
///         name: "covid".to_string(),
///         config: DatasetConfig::new("public", "covid", ["country::text"]),
///     })
///     .await;
/// assert_eq!(catalog.get_dataset(1).await.unwrap().name, "covid");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    sources: Arc<RwLock<HashMap<i64, Source>>>,
    datasets: Arc<RwLock<HashMap<i64, Dataset>>>,
    charts: Arc<RwLock<HashMap<i64, Chart>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a source.
    pub async fn insert_source(&self, source: Source) {
        self.sources.write().await.insert(source.id, source);
    }

    /// Inserts or replaces a dataset.
    pub async fn insert_dataset(&self, dataset: Dataset) {
        self.datasets.write().await.insert(dataset.id, dataset);
    }

    /// Inserts or replaces a chart.
    pub async fn insert_chart(&self, chart: Chart) {
        self.charts.write().await.insert(chart.id, chart);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    #[instrument(skip(self), fields(catalog = "in_memory"))]
    async fn get_source(&self, id: i64) -> Result<Source> {
        self.sources
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ChartError::UnknownSource(id))
    }

    #[instrument(skip(self), fields(catalog = "in_memory"))]
    async fn get_dataset(&self, id: i64) -> Result<Dataset> {
        self.datasets
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ChartError::UnknownDataset(id))
    }

    #[instrument(skip(self), fields(catalog = "in_memory"))]
    async fn get_chart(&self, id: i64) -> Result<Chart> {
        self.charts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ChartError::UnknownChart(id))
    }
}
