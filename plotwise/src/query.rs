//! Chart query compiler.
//!
//! [`compile`] turns a chart's dimensions, metrics and filters into a single
//! grouped aggregation over one table:
//!
//! ```text
//! SELECT <dimensions>,<metrics> FROM <table> WHERE 1=1 [AND <filter>]... GROUP BY <dimensions> ORDER BY <dimensions>
//! ```
//!
//! Dimensions and metrics are taken from the closed catalogs produced by
//! [`crate::column::dimension_candidates`] and
//! [`crate::column::metric_candidates`] and are emitted as-is. Filter values
//! are free-form and are quoted according to the declared type of the column
//! they target. They are interpolated, not bound; a value containing a single
//! quote ends up in the SQL text unescaped.

use crate::column::{is_numeric, parse_column};
use std::fmt;

/// Filter operators advertised to clients.
pub static SUPPORTED_FILTERS: &[&str] = &["=", "!=", ">", "<", "LIKE", "IN"];

/// A parsed `dimension/operator/value` filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter<'a> {
    /// Target column, optionally suffixed with `::precision`
    pub dimension: &'a str,
    /// Comparison operator, passed through verbatim
    pub operator: &'a str,
    /// Raw value text
    pub value: &'a str,
}

impl<'a> Filter<'a> {
    /// Parses a slash-delimited filter.
    ///
    /// Returns `None` unless the expression splits into exactly three parts;
    /// callers drop such filters silently.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.split('/');
        let dimension = parts.next()?;
        let operator = parts.next()?;
        let value = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            dimension,
            operator,
            value,
        })
    }

    /// Renders this filter as a WHERE predicate against the declared columns.
    pub fn to_sql(&self, columns: &[String]) -> String {
        let (column, precision) = parse_column(self.dimension);
        if !precision.is_empty() {
            return format!(
                "EXTRACT({precision} FROM {column})::text {} '{}'",
                self.operator, self.value
            );
        }

        let declared = columns
            .iter()
            .map(|c| parse_column(c))
            .find(|(name, _)| name.eq_ignore_ascii_case(self.dimension));

        let value = match declared {
            Some((_, tag)) if !is_numeric(tag) => quote_value(self.operator, self.value),
            _ => self.value.to_string(),
        };

        format!("{column} {} {value}", self.operator)
    }
}

impl fmt::Display for Filter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.dimension, self.operator, self.value)
    }
}

fn quote_value(operator: &str, value: &str) -> String {
    match operator {
        "LIKE" => format!("'%{value}%'"),
        "IN" => {
            let items: Vec<String> = value.split(',').map(|item| format!("'{item}'")).collect();
            format!("({})", items.join(","))
        }
        _ => format!("'{value}'"),
    }
}

/// Renders one dimension for SELECT / GROUP BY / ORDER BY.
pub fn dimension_sql(dimension: &str) -> String {
    let (column, precision) = parse_column(dimension);
    if precision.is_empty() {
        column.to_string()
    } else {
        format!("DATE_TRUNC('{precision}', {column})::date::text")
    }
}

fn dimensions_sql(dimensions: &[String]) -> String {
    dimensions
        .iter()
        .map(|d| dimension_sql(d))
        .collect::<Vec<_>>()
        .join(",")
}

fn select_sql(dimensions: &str, metrics: &str) -> String {
    match (dimensions.is_empty(), metrics.is_empty()) {
        (true, _) => metrics.to_string(),
        (_, true) => dimensions.to_string(),
        _ => format!("{dimensions},{metrics}"),
    }
}

/// Builds the WHERE clause body, always starting from `1=1`.
pub fn where_sql(filters: &[String], columns: &[String]) -> String {
    let mut clauses = vec!["1=1".to_string()];
    clauses.extend(
        filters
            .iter()
            .filter_map(|raw| Filter::parse(raw))
            .map(|filter| filter.to_sql(columns)),
    );
    clauses.join(" AND ")
}

/// Compiles a chart request into SQL.
///
/// Pure and deterministic: identical inputs in the same order produce
/// byte-identical output. Without dimensions the GROUP BY and ORDER BY
/// clauses are left out, yielding a single-row aggregate.
///
/// # Examples
///
/// ```rust
/// use plotwise::query::compile;
///
/// let sql = compile(
///     "public.covid",
///     &["country".to_string()],
///     &["SUM(cases)".to_string()],
///     &[],
///     &["country::text".to_string(), "cases::integer".to_string()],
/// );
/// assert_eq!(
///     sql,
///     "SELECT country,SUM(cases) FROM public.covid WHERE 1=1 GROUP BY country ORDER BY country"
/// );
/// ```
pub fn compile(
    table: &str,
    dimensions: &[String],
    metrics: &[String],
    filters: &[String],
    columns: &[String],
) -> String {
    let dimensions = dimensions_sql(dimensions);
    let select = select_sql(&dimensions, &metrics.join(","));
    let predicate = where_sql(filters, columns);

    if dimensions.is_empty() {
        format!("SELECT {select} FROM {table} WHERE {predicate}")
    } else {
        format!(
            "SELECT {select} FROM {table} WHERE {predicate} GROUP BY {dimensions} ORDER BY {dimensions}"
        )
    }
}
