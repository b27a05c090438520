//! Prelude for commonly used types and traits in plotwise.

pub use crate::context::{ChartContext, ContextConfig};
pub use crate::error::{ChartError, ErrorContext, Result};
pub use crate::execute::{Connection, Tabulation};
pub use crate::logging::LogConfig;
pub use crate::model::{Chart, ChartConfig, Dataset, DatasetConfig, Source, SourceConfig, SourceType};
pub use crate::render::{ChartRegistry, ChartRenderer, ChartSchema, ChartType};
pub use crate::repository::{Catalog, InMemoryCatalog};
pub use crate::service::{ChartService, ServiceConfig, ValidateChartRequest};
pub use crate::sources::{Connector, DataSource};
