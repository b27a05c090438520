//! PostgreSQL connectivity for external sources.
//!
//! Each chart evaluation against a Postgres-backed dataset gets its own
//! connection pool and a private session with the dataset's table registered
//! under its `schema.table` name, so the compiled query runs unchanged. The
//! pool is released when the [`PostgresConnection`] is dropped.

use super::Connector;
use crate::context::{ensure_schema, run_query};
use crate::error::{ChartError, Result};
use crate::execute::Connection;
use crate::model::{DatasetConfig, Source};
use crate::security::{SecureString, SqlSecurity};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use datafusion_table_providers::{
    postgres::PostgresTableFactory, sql::db_connection_pool::postgrespool::PostgresConnectionPool,
    util::secrets::to_secret_map,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

const SOURCE_TYPE: &str = "PostgreSQL";
const DEFAULT_PORT: u16 = 5432;

/// Connection parameters extracted from a `postgres://` URI.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PostgresParams {
    host: String,
    port: u16,
    database: String,
    username: String,
    password: SecureString,
    sslmode: Option<String>,
}

impl PostgresParams {
    pub(crate) fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri).map_err(|e| {
            ChartError::data_source_with_source(SOURCE_TYPE, "invalid database URI", Box::new(e))
        })?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(ChartError::data_source(
                SOURCE_TYPE,
                format!("unsupported URI scheme '{}'", url.scheme()),
            ));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ChartError::data_source(SOURCE_TYPE, "database URI has no host"))?;

        let database = url.path().trim_start_matches('/');
        if database.is_empty() {
            return Err(ChartError::data_source(
                SOURCE_TYPE,
                "database URI has no database name",
            ));
        }

        let sslmode = url
            .query_pairs()
            .find(|(key, _)| key == "sslmode")
            .map(|(_, value)| value.into_owned());

        Ok(Self {
            host: host.to_string(),
            port: url.port().unwrap_or(DEFAULT_PORT),
            database: database.to_string(),
            username: url.username().to_string(),
            password: SecureString::new(url.password().unwrap_or_default()),
            sslmode,
        })
    }

    fn into_secret_map(self, default_sslmode: Option<&str>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("host".to_string(), self.host);
        params.insert("port".to_string(), self.port.to_string());
        params.insert("db".to_string(), self.database);
        params.insert("user".to_string(), self.username);
        params.insert("pass".to_string(), self.password.into_string());
        if let Some(ssl) = self.sslmode.or_else(|| default_sslmode.map(str::to_string)) {
            params.insert("sslmode".to_string(), ssl);
        }
        params
    }
}

/// [`Connector`] for sources of type `postgres`.
#[derive(Debug, Clone, Default)]
pub struct PostgresConnector {
    /// `sslmode` used when the source URI does not name one
    pub default_sslmode: Option<String>,
}

impl PostgresConnector {
    pub fn with_sslmode(sslmode: impl Into<String>) -> Self {
        Self {
            default_sslmode: Some(sslmode.into()),
        }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    #[instrument(skip(self, source, dataset), fields(
        source.id = source.id,
        table.name = %dataset.qualified_table()
    ))]
    async fn connect(&self, source: &Source, dataset: &DatasetConfig) -> Result<Box<dyn Connection>> {
        let uri = source.config.database_uri.as_ref().ok_or_else(|| {
            ChartError::Configuration(format!("source {} has no database URI", source.id))
        })?;
        SqlSecurity::validate_identifier(&dataset.qualified_table())?;

        let params = PostgresParams::parse(uri.expose())?;
        let host = params.host.clone();
        let pool = PostgresConnectionPool::new(to_secret_map(
            params.into_secret_map(self.default_sslmode.as_deref()),
        ))
        .await
        .map_err(|e| {
            ChartError::data_source_with_source(
                SOURCE_TYPE,
                format!("Failed to create PostgreSQL connection pool: {e}"),
                Box::new(e),
            )
        })?;

        let provider = PostgresTableFactory::new(Arc::new(pool))
            .table_provider(TableReference::partial(
                dataset.schema.as_str(),
                dataset.table.as_str(),
            ))
            .await
            .map_err(|e| {
                ChartError::data_source(
                    SOURCE_TYPE,
                    format!(
                        "Failed to create table provider for '{}': {e}",
                        dataset.qualified_table()
                    ),
                )
            })?;

        let ctx = SessionContext::new();
        ensure_schema(&ctx, &dataset.schema).await?;
        ctx.register_table(
            TableReference::partial(dataset.schema.as_str(), dataset.table.as_str()),
            provider,
        )?;

        info!(host = %host, "Opened PostgreSQL connection");
        Ok(Box::new(PostgresConnection {
            ctx,
            table: dataset.qualified_table(),
            host,
        }))
    }
}

/// A per-evaluation session over one PostgreSQL table.
pub struct PostgresConnection {
    ctx: SessionContext,
    table: String,
    host: String,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("table", &self.table)
            .field("host", &self.host)
            .finish()
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn query(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        run_query(&self.ctx, sql).await
    }

    fn description(&self) -> String {
        format!("PostgreSQL table {} on {}", self.table, self.host)
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        debug!(table = %self.table, host = %self.host, "Released PostgreSQL connection");
    }
}
