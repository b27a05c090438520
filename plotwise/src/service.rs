//! Chart orchestration: validate ad-hoc requests and run persisted charts.
//!
//! A chart evaluation is one request-response unit. The renderer and dataset
//! are resolved first, then the query is compiled, executed on either the
//! primary store or a fresh connection to the source's external database,
//! and rendered. External connections are dropped before the call returns,
//! whether it succeeds or not.

use crate::error::Result;
use crate::execute::{execute, Connection};
use crate::logging::{truncate_field, LogConfig};
use crate::model::Chart;
use crate::query::compile;
use crate::render::{ChartRegistry, ChartSchema, ChartType};
use crate::repository::Catalog;
use crate::security::SqlSecurity;
use crate::sources::{default_connector, Connector};
use crate::{log_data_op, log_query};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Configuration for [`ChartService`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Reject requests outside the chart type's advertised field counts
    /// before compiling them. Off by default: out-of-range requests still
    /// compile and run.
    pub enforce_capabilities: bool,
    /// Query and data-operation logging for this service
    pub log: LogConfig,
}

impl ServiceConfig {
    /// Turns on capability enforcement.
    pub fn with_enforced_capabilities(mut self) -> Self {
        self.enforce_capabilities = true;
        self
    }

    /// Replaces the logging configuration.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// An ad-hoc chart request, also the stored form of a persisted chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateChartRequest {
    pub dataset_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

impl From<Chart> for ValidateChartRequest {
    fn from(chart: Chart) -> Self {
        Self {
            dataset_id: chart.dataset_id,
            name: chart.name,
            chart_type: chart.chart_type,
            dimensions: chart.config.dimensions,
            metrics: chart.config.metrics,
            filters: chart.config.filters,
        }
    }
}

/// Entry point for chart evaluation.
///
/// # Examples
///
/// ```rust,no_run
/// use plotwise::context::ChartContext;
/// use plotwise::repository::InMemoryCatalog;
/// use plotwise::service::{ChartService, ValidateChartRequest};
/// use std::sync::Arc;
///
/// # async fn example() -> plotwise::error::Result<()> {
/// let ctx = ChartContext::new()?;
/// let catalog = InMemoryCatalog::new();
/// let service = ChartService::new(Arc::new(ctx), Arc::new(catalog));
///
/// let document = service
///     .validate(&ValidateChartRequest {
///         dataset_id: 1,
///         name: "Cases by country".to_string(),
///         chart_type: "bar".to_string(),
///         dimensions: vec!["country".to_string()],
///         metrics: vec!["SUM(cases)".to_string()],
///         filters: vec![],
///     })
///     .await?;
/// println!("{document}");
/// # Ok(())
/// # }
/// ```
pub struct ChartService {
    primary: Arc<dyn Connection>,
    catalog: Arc<dyn Catalog>,
    registry: ChartRegistry,
    connector: Box<dyn Connector>,
    config: ServiceConfig,
}

impl std::fmt::Debug for ChartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartService")
            .field("primary", &self.primary.description())
            .field("registry", &self.registry)
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish()
    }
}

impl ChartService {
    /// Creates a service with the built-in renderers and default configuration.
    pub fn new(primary: Arc<dyn Connection>, catalog: Arc<dyn Catalog>) -> Self {
        Self::with_config(primary, catalog, ServiceConfig::default())
    }

    /// Creates a service with the built-in renderers and the given configuration.
    pub fn with_config(
        primary: Arc<dyn Connection>,
        catalog: Arc<dyn Catalog>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            primary,
            catalog,
            registry: ChartRegistry::new(),
            connector: default_connector(),
            config,
        }
    }

    /// Replaces the connector used for external sources.
    pub fn with_connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replaces the renderer registry.
    pub fn with_registry(mut self, registry: ChartRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Returns the configuration this service was created with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Chart types this service can render, in advertised order.
    pub fn all_types(&self) -> Vec<ChartType> {
        self.registry.types()
    }

    /// Capability descriptor and example document for a type tag.
    pub fn type_schema(&self, tag: &str) -> Result<ChartSchema> {
        self.registry.schema(tag)
    }

    /// Compiles, executes and renders an ad-hoc chart request.
    #[instrument(skip(self, request), fields(
        dataset.id = request.dataset_id,
        chart.type = %request.chart_type
    ))]
    pub async fn validate(&self, request: &ValidateChartRequest) -> Result<Value> {
        let renderer = self.registry.get(&request.chart_type)?;

        if self.config.enforce_capabilities {
            renderer
                .schema()
                .check(&request.dimensions, &request.metrics, &request.filters)?;
        }

        let dataset = self.catalog.get_dataset(request.dataset_id).await?;
        let source = self.catalog.get_source(dataset.source_id).await?;

        let external;
        let connection: &dyn Connection = if source.source_type.is_external() {
            external = self.connector.connect(&source, &dataset.config).await?;
            log_data_op!(
                self.config.log,
                source.id = source.id,
                connection = %external.description(),
                "Opened external connection for chart evaluation"
            );
            external.as_ref()
        } else {
            self.primary.as_ref()
        };

        let table = dataset.config.qualified_table();
        SqlSecurity::validate_identifier(&table)?;

        let sql = compile(
            &table,
            &request.dimensions,
            &request.metrics,
            &request.filters,
            &dataset.config.columns,
        );
        log_query!(
            self.config.log,
            sql = %truncate_field(&sql, self.config.log.max_field_length),
            "Compiled chart query"
        );

        let tabulation = execute(
            connection,
            &sql,
            request.dimensions.len(),
            request.metrics.len(),
        )
        .await?;

        let document = renderer.render(&request.name, &tabulation.groups, &tabulation.values)?;
        debug!(rows = tabulation.row_count(), "Rendered chart");
        Ok(document)
    }

    /// Evaluates a persisted chart.
    #[instrument(skip(self))]
    pub async fn run(&self, chart_id: i64) -> Result<Value> {
        let chart = self.catalog.get_chart(chart_id).await?;
        self.validate(&chart.into()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartError;
    use crate::model::{ChartConfig, Dataset, DatasetConfig, Source, SourceConfig, SourceType};
    use crate::repository::InMemoryCatalog;
    use crate::test_helpers::{covid_catalog, covid_context, COVID_DATASET};
    use serde_json::json;

    async fn service(config: ServiceConfig) -> (ChartService, InMemoryCatalog) {
        let catalog = covid_catalog().await;
        let ctx = covid_context().await;
        let service = ChartService::with_config(Arc::new(ctx), Arc::new(catalog.clone()), config);
        (service, catalog)
    }

    fn request(chart_type: &str, dimensions: &[&str], metrics: &[&str]) -> ValidateChartRequest {
        ValidateChartRequest {
            dataset_id: COVID_DATASET,
            name: "Cases".to_string(),
            chart_type: chart_type.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            filters: vec![],
        }
    }

    #[tokio::test]
    async fn test_validate_bar_chart() {
        let (service, _) = service(ServiceConfig::default()).await;
        let doc = service
            .validate(&request("bar", &["country"], &["SUM(cases)"]))
            .await
            .unwrap();

        assert_eq!(doc["title"]["text"], json!("Cases"));
        assert_eq!(doc["xAxis"]["data"], json!(["CA", "US"]));
        assert_eq!(doc["series"][0]["data"], json!([4.0, 35.0]));
    }

    #[tokio::test]
    async fn test_unknown_type_fails_before_lookup() {
        let (service, _) = service(ServiceConfig::default()).await;
        let mut req = request("donut", &["country"], &["SUM(cases)"]);
        req.dataset_id = 999;

        let err = service.validate(&req).await.unwrap_err();
        assert!(matches!(err, ChartError::UnknownChartType(t) if t == "donut"));
    }

    #[tokio::test]
    async fn test_unknown_dataset_and_source() {
        let (service, catalog) = service(ServiceConfig::default()).await;
        let mut req = request("pie", &["country"], &["COUNT(*)"]);
        req.dataset_id = 999;
        assert!(matches!(
            service.validate(&req).await,
            Err(ChartError::UnknownDataset(999))
        ));

        catalog
            .insert_dataset(Dataset {
                id: 50,
                source_id: 404,
                name: "orphan".to_string(),
                config: DatasetConfig::new("public", "covid", ["country::text"]),
            })
            .await;
        req.dataset_id = 50;
        assert!(matches!(
            service.validate(&req).await,
            Err(ChartError::UnknownSource(404))
        ));
    }

    #[tokio::test]
    async fn test_capabilities_permissive_by_default() {
        let (permissive, _) = service(ServiceConfig::default()).await;
        let req = request("pie", &["country", "date"], &["SUM(cases)"]);
        assert!(permissive.validate(&req).await.is_ok());

        let (strict, _) = service(ServiceConfig::default().with_enforced_capabilities()).await;
        let err = strict.validate(&req).await.unwrap_err();
        assert!(matches!(err, ChartError::CapabilityViolation { field, .. } if field == "dimensions"));
    }

    #[tokio::test]
    async fn test_external_source_without_driver() {
        let (service, catalog) = service(ServiceConfig::default()).await;
        catalog
            .insert_source(Source {
                id: 2,
                name: "warehouse".to_string(),
                source_type: SourceType::Postgres,
                config: SourceConfig::default(),
            })
            .await;
        catalog
            .insert_dataset(Dataset {
                id: 20,
                source_id: 2,
                name: "sales".to_string(),
                config: DatasetConfig::new("samples", "sales", ["region::text"]),
            })
            .await;

        let service = service.with_connector(Box::new(crate::sources::UnsupportedConnector));
        let mut req = request("bar", &["region"], &["COUNT(*)"]);
        req.dataset_id = 20;
        let err = service.validate(&req).await.unwrap_err();
        assert!(matches!(err, ChartError::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_run_persisted_chart() {
        let (service, catalog) = service(ServiceConfig::default()).await;
        catalog
            .insert_chart(Chart {
                id: 7,
                dataset_id: COVID_DATASET,
                name: "Share".to_string(),
                chart_type: "pie".to_string(),
                config: ChartConfig {
                    dimensions: vec!["country".to_string()],
                    metrics: vec!["SUM(cases)".to_string()],
                    filters: vec!["country/!=/CA".to_string()],
                },
            })
            .await;

        let doc = service.run(7).await.unwrap();
        assert_eq!(doc["title"]["text"], json!("Share"));
        assert_eq!(doc["series"][0]["data"], json!([{"name": "US", "value": 35.0}]));

        assert!(matches!(service.run(8).await, Err(ChartError::UnknownChart(8))));
    }

    #[tokio::test]
    async fn test_service_keeps_its_config() {
        let config = ServiceConfig::default()
            .with_enforced_capabilities()
            .with_log_config(LogConfig::production());
        let (service, _) = service(config).await;

        assert!(service.config().enforce_capabilities);
        assert!(!service.config().log.log_queries);
        assert_eq!(service.config().log.max_field_length, 128);
    }

    #[test]
    fn test_request_wire_form() {
        let req: ValidateChartRequest = serde_json::from_value(json!({
            "datasetId": 3,
            "name": "n",
            "type": "line",
            "dimensions": ["date::month"],
            "metrics": ["COUNT(*)"]
        }))
        .unwrap();
        assert_eq!(req.chart_type, "line");
        assert!(req.filters.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_of_types() {
        let (service, _) = service(ServiceConfig::default()).await;
        let types: Vec<&str> = service.all_types().iter().map(|t| t.as_str()).collect();
        assert_eq!(types, vec!["bar", "pie", "line", "scatter", "heatmap", "sankey"]);
        assert!(matches!(
            service.type_schema("radar"),
            Err(ChartError::UnknownChartType(_))
        ));
        assert_eq!(service.type_schema("sankey").unwrap().schema.dimensions.max, 2);
    }
}
