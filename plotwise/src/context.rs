//! Primary store connection backed by DataFusion.
//!
//! [`ChartContext`] owns the [`SessionContext`] that holds every table the
//! service queries by default: datasets imported from uploaded CSV files and
//! any table registered by the embedding application. It implements
//! [`Connection`], so compiled chart queries run against it directly.

use crate::error::{ChartError, Result};
use crate::execute::Connection;
use crate::sources::DataSource;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::execution::context::{SessionConfig, SessionContext};
use datafusion::execution::memory_pool::{FairSpillPool, MemoryPool};
use datafusion::execution::runtime_env::RuntimeEnvBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Schema that unqualified tables and imported CSV datasets live in.
pub const DEFAULT_SCHEMA: &str = "public";

/// Configuration for creating a [`ChartContext`].
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Target number of partitions for parallel execution
    pub target_partitions: usize,
    /// Maximum memory for query execution (in bytes)
    pub max_memory: usize,
    /// Memory fraction to use before spilling (0.0 to 1.0)
    pub memory_fraction: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            max_memory: 2 * 1024 * 1024 * 1024, // 2GB
            memory_fraction: 0.9,
        }
    }
}

impl ContextConfig {
    /// Bytes the memory pool may hold before operators spill.
    ///
    /// `memory_fraction` is clamped to `0.0..=1.0`.
    pub fn pool_size(&self) -> usize {
        let fraction = self.memory_fraction.clamp(0.0, 1.0);
        (self.max_memory as f64 * fraction) as usize
    }
}

/// A managed DataFusion context acting as the primary chart store.
///
/// Tables are addressed as `schema.table`, matching the way datasets name
/// them. The `public` schema always exists; others are created on demand by
/// the registration helpers.
///
/// # Examples
///
/// ```rust,no_run
/// use plotwise::context::ChartContext;
/// use plotwise::execute::Connection;
///
/// # async fn example() -> plotwise::error::Result<()> {
/// let ctx = ChartContext::new()?;
/// ctx.inner()
///     .sql("CREATE TABLE covid (country VARCHAR, cases INT) AS VALUES ('US', 10)")
///     .await?;
/// let batches = ctx.query("SELECT country, SUM(cases) FROM public.covid GROUP BY country").await?;
/// # Ok(())
/// # }
/// ```
pub struct ChartContext {
    inner: SessionContext,
    tables: HashMap<String, Arc<dyn TableProvider>>,
    config: ContextConfig,
}

impl std::fmt::Debug for ChartContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartContext")
            .field("tables", &self.registered_tables())
            .field("config", &self.config)
            .finish()
    }
}

impl ChartContext {
    /// Creates a new context with default configuration.
    #[instrument]
    pub fn new() -> Result<Self> {
        Self::with_config(ContextConfig::default())
    }

    /// Creates a new context with custom configuration.
    #[instrument(skip(config))]
    pub fn with_config(config: ContextConfig) -> Result<Self> {
        let session_config = SessionConfig::new()
            .with_batch_size(config.batch_size)
            .with_target_partitions(config.target_partitions)
            .with_information_schema(true);

        let memory_pool = Arc::new(FairSpillPool::new(config.pool_size())) as Arc<dyn MemoryPool>;

        let runtime_env = RuntimeEnvBuilder::new()
            .with_memory_pool(memory_pool)
            .with_temp_file_path(std::env::temp_dir())
            .build()
            .map(Arc::new)?;

        let inner = SessionContext::new_with_config_rt(session_config, runtime_env);

        Ok(Self {
            inner,
            tables: HashMap::new(),
            config,
        })
    }

    /// Returns the underlying DataFusion [`SessionContext`].
    pub fn inner(&self) -> &SessionContext {
        &self.inner
    }

    /// Returns the configuration used to create this context.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Names of the tables registered through this context.
    pub fn registered_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Checks if a table is registered.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Creates `schema` in the default catalog if it does not exist yet.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self, schema: &str) -> Result<()> {
        ensure_schema(&self.inner, schema).await
    }

    /// Registers any [`TableProvider`] under a possibly schema-qualified name.
    #[instrument(skip(self, provider))]
    pub async fn register_table_provider(
        &mut self,
        name: &str,
        provider: Arc<dyn TableProvider>,
    ) -> Result<()> {
        if let Some((schema, _)) = name.split_once('.') {
            self.ensure_schema(schema).await?;
        }

        self.inner.register_table(name, provider.clone())?;
        self.tables.insert(name.to_string(), provider);
        debug!(table = name, "Registered table with chart context");
        Ok(())
    }

    /// Registers a [`DataSource`] under a possibly schema-qualified name.
    #[instrument(skip(self, source), fields(source = %source.description()))]
    pub async fn register_source(&mut self, name: &str, source: &dyn DataSource) -> Result<()> {
        source.register(&self.inner, name).await?;
        let provider = self.inner.table_provider(name).await?;
        self.tables.insert(name.to_string(), provider);
        debug!(table = name, "Registered data source with chart context");
        Ok(())
    }

    /// Registers in-memory record batches as a table.
    pub async fn register_batches(
        &mut self,
        name: &str,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<()> {
        let table = MemTable::try_new(schema, vec![batches])?;
        self.register_table_provider(name, Arc::new(table)).await
    }

    /// Deregisters a table from the context.
    pub fn deregister_table(&mut self, name: &str) -> Result<()> {
        self.inner.deregister_table(name)?;
        self.tables.remove(name);
        Ok(())
    }

    /// Clears all tables registered through this context.
    pub fn clear_tables(&mut self) -> Result<()> {
        let table_names: Vec<_> = self.tables.keys().cloned().collect();
        for name in table_names {
            self.deregister_table(&name)?;
        }
        Ok(())
    }
}

impl Drop for ChartContext {
    fn drop(&mut self) {
        if let Err(e) = self.clear_tables() {
            tracing::warn!("Failed to clear tables during ChartContext drop: {}", e);
        }
    }
}

#[async_trait]
impl Connection for ChartContext {
    async fn query(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        run_query(&self.inner, sql).await
    }

    fn description(&self) -> String {
        format!("primary store ({} tables)", self.tables.len())
    }
}

/// Creates a schema in the default catalog of `ctx` if it is missing.
pub(crate) async fn ensure_schema(ctx: &SessionContext, schema: &str) -> Result<()> {
    let catalog = ctx
        .catalog(&ctx.state().config().options().catalog.default_catalog)
        .ok_or_else(|| ChartError::Internal("default catalog is not registered".to_string()))?;

    if catalog.schema(schema).is_some() {
        return Ok(());
    }

    ctx.sql(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
        .await?
        .collect()
        .await?;
    Ok(())
}

/// Runs `sql` on a session and collects every batch.
///
/// Planning and execution failures are reported as
/// [`ChartError::Execution`] with the DataFusion error kept as the source.
pub(crate) async fn run_query(ctx: &SessionContext, sql: &str) -> Result<Vec<RecordBatch>> {
    let frame = ctx
        .sql(sql)
        .await
        .map_err(|e| ChartError::execution_with_source("failed to plan chart query", Box::new(e)))?;

    frame
        .collect()
        .await
        .map_err(|e| ChartError::execution_with_source("failed to run chart query", Box::new(e)))
}
