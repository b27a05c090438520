//! Records the chart pipeline reads from its catalog.
//!
//! Sources own datasets, datasets own a table and its column descriptors,
//! and a persisted chart is a named, stored chart request against one
//! dataset. Source and dataset records keep the field names of their stored
//! JSON form (`ID`, `SourceID`, `Config`, ...); chart records use camelCase.

use crate::column::{datetime_columns, dimension_candidates, metric_candidates};
use crate::security::SecureString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backing store kind of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// External PostgreSQL database reached through the source's URI
    Postgres,
    /// Uploaded CSV files imported into the primary store
    Csv,
}

impl SourceType {
    /// Whether datasets of this source live outside the primary store.
    pub fn is_external(&self) -> bool {
        matches!(self, SourceType::Postgres)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Postgres => f.write_str("postgres"),
            SourceType::Csv => f.write_str("csv"),
        }
    }
}

/// Table location and column descriptors of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetConfig {
    pub schema: String,
    pub table: String,
    /// `name::type` descriptors
    pub columns: Vec<String>,
}

impl DatasetConfig {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Schema-qualified table name used in compiled queries.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Dimension strings a chart over this dataset may request.
    pub fn dimensions(&self) -> Vec<String> {
        dimension_candidates(&self.columns)
    }

    /// Metric strings a chart over this dataset may request.
    pub fn metrics(&self) -> Vec<String> {
        metric_candidates(&self.columns)
    }

    /// Columns that accept a precision suffix.
    pub fn precisions(&self) -> Vec<String> {
        datetime_columns(&self.columns)
    }
}

/// Connection details and discovered datasets of a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceConfig {
    #[serde(rename = "DatabaseURI", default, skip_serializing_if = "Option::is_none")]
    pub database_uri: Option<SecureString>,
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    #[serde(rename = "Type")]
    pub source_type: SourceType,
    pub config: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dataset {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "SourceID")]
    pub source_id: i64,
    pub name: String,
    pub config: DatasetConfig,
}

/// Stored request fields of a persisted chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// A persisted chart.
///
/// The type is kept as its raw tag so that a record naming a chart type this
/// build does not know still loads and fails only when it is run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: i64,
    pub dataset_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub config: ChartConfig,
}
