//! Chart renderers and their registry.
//!
//! A renderer turns a [`Tabulation`](crate::execute::Tabulation) into the
//! JSON document a chart client consumes. Each chart family shapes the same
//! `(groups, values)` input differently, so every [`ChartType`] has its own
//! [`ChartRenderer`]. Documents are built directly as [`serde_json::Value`]
//! trees; their key names and nesting are the compatibility contract with the
//! client and must not drift.
//!
//! The [`ChartRegistry`] is built once from the fixed list of renderers and is
//! read-only afterwards.

use crate::error::{ChartError, Result};
use crate::query::{Filter, SUPPORTED_FILTERS};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

mod cartesian;
mod heatmap;
mod pie;
mod sankey;

pub use cartesian::CartesianChart;
pub use heatmap::HeatmapChart;
pub use pie::PieChart;
pub use sankey::SankeyChart;

/// Title shown by every schema example before a chart is configured.
pub const DEMO_TITLE: &str = "DEMO DATA - CONFIGURE TO PREVIEW";

/// Supported chart type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    Scatter,
    Heatmap,
    Sankey,
}

impl ChartType {
    /// Every chart type, in the order advertised to clients.
    pub const ALL: [ChartType; 6] = [
        ChartType::Bar,
        ChartType::Pie,
        ChartType::Line,
        ChartType::Scatter,
        ChartType::Heatmap,
        ChartType::Sankey,
    ];

    /// Returns the wire tag of this chart type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Pie => "pie",
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Heatmap => "heatmap",
            ChartType::Sankey => "sankey",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        ChartType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ChartError::UnknownChartType(s.to_string()))
    }
}

/// Cardinality bounds and allowed values for one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub min: usize,
    pub max: usize,
    /// Allowed values; empty means unrestricted
    pub values: Vec<String>,
}

impl FieldRule {
    /// A rule with bounds and no value restriction.
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            min,
            max,
            values: Vec::new(),
        }
    }

    /// Restricts the rule to the given values.
    pub fn with_values(mut self, values: &[&str]) -> Self {
        self.values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    fn check_count(&self, chart_type: ChartType, field: &str, count: usize) -> Result<()> {
        if count < self.min {
            return Err(ChartError::capability_violation(
                chart_type.as_str(),
                field,
                format!("expected at least {}, got {count}", self.min),
            ));
        }
        if count > self.max {
            return Err(ChartError::capability_violation(
                chart_type.as_str(),
                field,
                format!("expected at most {}, got {count}", self.max),
            ));
        }
        Ok(())
    }
}

/// Capability rules for a chart type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRules {
    pub dimensions: FieldRule,
    pub metrics: FieldRule,
    pub filters: FieldRule,
}

impl SchemaRules {
    /// Rules shared by every chart type, with the given dimension ceiling.
    pub fn standard(max_dimensions: usize) -> Self {
        Self {
            dimensions: FieldRule::new(1, max_dimensions),
            metrics: FieldRule::new(1, 1),
            filters: FieldRule::new(0, 5).with_values(SUPPORTED_FILTERS),
        }
    }
}

/// Capability descriptor advertised for a chart type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSchema {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub schema: SchemaRules,
    /// Demo document shown before the chart is configured
    pub example: Value,
}

impl ChartSchema {
    /// Checks a request against the advertised rules.
    ///
    /// Reports the first violated rule, in the order dimensions, metrics,
    /// filters. Filter operators are checked only for filters that parse.
    pub fn check(&self, dimensions: &[String], metrics: &[String], filters: &[String]) -> Result<()> {
        let rules = &self.schema;
        rules
            .dimensions
            .check_count(self.chart_type, "dimensions", dimensions.len())?;
        rules
            .metrics
            .check_count(self.chart_type, "metrics", metrics.len())?;
        rules
            .filters
            .check_count(self.chart_type, "filters", filters.len())?;

        if rules.filters.values.is_empty() {
            return Ok(());
        }

        for filter in filters.iter().filter_map(|raw| Filter::parse(raw)) {
            if !rules.filters.values.iter().any(|v| v == filter.operator) {
                return Err(ChartError::capability_violation(
                    self.chart_type.as_str(),
                    "filters",
                    format!("unsupported operator '{}' in '{filter}'", filter.operator),
                ));
            }
        }

        Ok(())
    }
}

/// Renders tabulated query results into a chart document.
///
/// `groups` holds one sequence per requested dimension and `values` one
/// sequence per requested metric, all of equal length.
pub trait ChartRenderer: fmt::Debug + Send + Sync {
    /// The chart type this renderer produces.
    fn chart_type(&self) -> ChartType;

    /// Capability descriptor and demo payload.
    fn schema(&self) -> ChartSchema;

    /// Builds the chart document titled `name`.
    fn render(&self, name: &str, groups: &[Vec<String>], values: &[Vec<f64>]) -> Result<Value>;
}

/// Maps chart type tags to renderer instances.
#[derive(Debug)]
pub struct ChartRegistry {
    renderers: HashMap<ChartType, Box<dyn ChartRenderer>>,
}

impl Default for ChartRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRegistry {
    /// Creates a registry holding the six built-in renderers.
    pub fn new() -> Self {
        Self::with_renderers(vec![
            Box::new(CartesianChart::bar()),
            Box::new(PieChart),
            Box::new(CartesianChart::line()),
            Box::new(CartesianChart::scatter()),
            Box::new(HeatmapChart),
            Box::new(SankeyChart),
        ])
    }

    /// Creates a registry from an explicit renderer list.
    ///
    /// A later renderer for the same chart type replaces an earlier one.
    pub fn with_renderers(renderers: Vec<Box<dyn ChartRenderer>>) -> Self {
        let renderers = renderers
            .into_iter()
            .map(|renderer| (renderer.chart_type(), renderer))
            .collect();
        Self { renderers }
    }

    /// Looks up the renderer for a type tag.
    pub fn get(&self, tag: &str) -> Result<&dyn ChartRenderer> {
        let chart_type: ChartType = tag.parse()?;
        self.renderers
            .get(&chart_type)
            .map(|renderer| renderer.as_ref())
            .ok_or_else(|| ChartError::UnknownChartType(tag.to_string()))
    }

    /// Registered chart types in advertised order.
    pub fn types(&self) -> Vec<ChartType> {
        ChartType::ALL
            .iter()
            .copied()
            .filter(|t| self.renderers.contains_key(t))
            .collect()
    }

    /// Capability descriptor for a type tag.
    pub fn schema(&self, tag: &str) -> Result<ChartSchema> {
        self.get(tag).map(|renderer| renderer.schema())
    }

    /// Number of registered renderers.
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// Whether no renderer is registered.
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

/// Centered bold title block shared by every document.
pub(crate) fn title(text: &str) -> Value {
    json!({
        "text": text,
        "left": "center",
        "textStyle": {
            "fontSize": 24,
            "fontWeight": "bold"
        }
    })
}

/// De-duplicates while keeping the order of first appearance.
pub(crate) fn unique(items: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Returns the `index`-th group sequence or a render error.
pub(crate) fn group_at<'a>(chart_type: ChartType, groups: &'a [Vec<String>], index: usize) -> Result<&'a [String]> {
    groups.get(index).map(Vec::as_slice).ok_or_else(|| {
        ChartError::Render(format!(
            "{chart_type} chart needs at least {} dimension(s), got {}",
            index + 1,
            groups.len()
        ))
    })
}

/// Returns the first metric sequence, checked against the row count.
pub(crate) fn metric_values(chart_type: ChartType, values: &[Vec<f64>], rows: usize) -> Result<&[f64]> {
    let first = values.first().ok_or_else(|| {
        ChartError::Render(format!("{chart_type} chart needs at least 1 metric, got 0"))
    })?;

    if first.len() < rows {
        return Err(ChartError::Render(format!(
            "{chart_type} chart got {} metric value(s) for {rows} row(s)",
            first.len()
        )));
    }

    Ok(first)
}
