//! Column type model.
//!
//! Columns travel as a single `name::type` string (see [`COLUMN_SEPARATOR`]).
//! The type half is the source database's type name (`integer`, `date`,
//! `timestamp with time zone`, ...) and is collapsed into a [`ColumnType`]
//! category by fixed lookup tables. The same separator also tags dimensions
//! with a temporal [`Precision`], e.g. `created_at::month`.
//!
//! From a dataset's column list this module derives the complete catalog of
//! dimension and metric strings a client may request.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between a column name and its type tag or precision.
pub const COLUMN_SEPARATOR: &str = "::";

/// Source type names treated as numeric.
pub static NUMERIC_TYPES: &[&str] = &["integer", "numeric", "decimal", "real", "double precision"];

/// Source type names treated as date/time.
pub static DATETIME_TYPES: &[&str] = &[
    "date",
    "timestamp without time zone",
    "timestamp with time zone",
];

/// Aggregation available for every dataset regardless of its columns.
pub static GLOBAL_AGGREGATIONS: &[&str] = &["COUNT(*)"];

/// Aggregation functions offered per numeric column, in catalog order.
pub static COLUMN_AGGREGATIONS: &[&str] = &["COUNT", "AVG", "SUM", "MIN", "MAX"];

/// Primitive category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Integer, numeric, decimal and floating point types
    Numeric,
    /// Dates and timestamps
    DateTime,
    /// Anything else; treated as categorical text
    Text,
}

impl ColumnType {
    /// Classifies a source type tag.
    pub fn classify(tag: &str) -> Self {
        if is_numeric(tag) {
            ColumnType::Numeric
        } else if is_date_time(tag) {
            ColumnType::DateTime
        } else {
            ColumnType::Text
        }
    }
}

/// Date truncation precision usable on datetime dimensions and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl Precision {
    /// All supported precisions, coarsest first.
    pub const ALL: [Precision; 5] = [
        Precision::Year,
        Precision::Quarter,
        Precision::Month,
        Precision::Week,
        Precision::Day,
    ];

    /// Returns the SQL keyword for this precision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Year => "year",
            Precision::Quarter => "quarter",
            Precision::Month => "month",
            Precision::Week => "week",
            Precision::Day => "day",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Precision::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unsupported precision: {s}"))
    }
}

/// Supported precisions as plain strings, for advertising to clients.
pub static SUPPORTED_PRECISIONS: Lazy<Vec<&'static str>> =
    Lazy::new(|| Precision::ALL.iter().map(Precision::as_str).collect());

/// Splits a column reference on the first separator.
///
/// Returns the name and the tag; the tag is empty when no separator is present.
///
/// ```rust
/// use plotwise::column::parse_column;
///
/// assert_eq!(parse_column("cases::integer"), ("cases", "integer"));
/// assert_eq!(parse_column("country"), ("country", ""));
/// ```
pub fn parse_column(raw: &str) -> (&str, &str) {
    match raw.split_once(COLUMN_SEPARATOR) {
        Some((name, tag)) => (name, tag),
        None => (raw, ""),
    }
}

/// Joins a column name and a type tag or precision.
pub fn format_column(name: &str, tag: &str) -> String {
    format!("{name}{COLUMN_SEPARATOR}{tag}")
}

/// Returns the bare names of a list of column descriptors.
pub fn column_names(columns: &[String]) -> Vec<&str> {
    columns.iter().map(|c| parse_column(c).0).collect()
}

/// Whether a type tag is one of the numeric source types.
pub fn is_numeric(tag: &str) -> bool {
    NUMERIC_TYPES.contains(&tag)
}

/// Whether a type tag is one of the date/time source types.
pub fn is_date_time(tag: &str) -> bool {
    DATETIME_TYPES.contains(&tag)
}

/// Every dimension string a client may request for the given columns.
///
/// Each column contributes its bare name; datetime columns additionally
/// contribute one `name::precision` entry per supported precision.
pub fn dimension_candidates(columns: &[String]) -> Vec<String> {
    let mut dimensions = Vec::with_capacity(columns.len());

    for column in columns {
        let (name, tag) = parse_column(column);
        dimensions.push(name.to_string());

        if is_date_time(tag) {
            for precision in Precision::ALL {
                dimensions.push(format_column(name, precision.as_str()));
            }
        }
    }

    dimensions
}

/// Every metric string a client may request for the given columns.
///
/// `COUNT(*)` always comes first, followed by `COUNT`, `AVG`, `SUM`, `MIN`
/// and `MAX` for each numeric column.
pub fn metric_candidates(columns: &[String]) -> Vec<String> {
    let mut metrics: Vec<String> = GLOBAL_AGGREGATIONS.iter().map(|m| m.to_string()).collect();

    for column in columns {
        let (name, tag) = parse_column(column);
        if !is_numeric(tag) {
            continue;
        }

        for function in COLUMN_AGGREGATIONS {
            metrics.push(format!("{function}({name})"));
        }
    }

    metrics
}

/// Names of the datetime columns, i.e. those that accept a precision suffix.
pub fn datetime_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| parse_column(c))
        .filter(|(_, tag)| is_date_time(tag))
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(parse_column("cases::integer"), ("cases", "integer"));
        assert_eq!(parse_column("country"), ("country", ""));
        assert_eq!(
            parse_column("created::timestamp with time zone"),
            ("created", "timestamp with time zone")
        );
        // only the first separator splits
        assert_eq!(parse_column("a::b::c"), ("a", "b::c"));
    }

    #[test]
    fn test_format_column_round_trip() {
        let raw = format_column("date", "month");
        assert_eq!(raw, "date::month");
        assert_eq!(parse_column(&raw), ("date", "month"));
    }

    #[test]
    fn test_classification() {
        assert!(is_numeric("integer"));
        assert!(is_numeric("double precision"));
        assert!(!is_numeric("bigint"));
        assert!(is_date_time("date"));
        assert!(is_date_time("timestamp with time zone"));
        assert!(!is_date_time("time"));

        assert_eq!(ColumnType::classify("numeric"), ColumnType::Numeric);
        assert_eq!(ColumnType::classify("timestamp without time zone"), ColumnType::DateTime);
        assert_eq!(ColumnType::classify("text"), ColumnType::Text);
        assert_eq!(ColumnType::classify(""), ColumnType::Text);
    }

    #[test]
    fn test_precision_parsing() {
        assert_eq!("quarter".parse::<Precision>(), Ok(Precision::Quarter));
        assert!("hour".parse::<Precision>().is_err());
        assert_eq!(
            *SUPPORTED_PRECISIONS,
            vec!["year", "quarter", "month", "week", "day"]
        );
    }

    #[test]
    fn test_dimension_candidates_datetime_and_text() {
        let cols = columns(&["date::date", "country::text"]);
        let dims = dimension_candidates(&cols);

        assert_eq!(
            dims,
            vec![
                "date",
                "date::year",
                "date::quarter",
                "date::month",
                "date::week",
                "date::day",
                "country",
            ]
        );
    }

    #[test]
    fn test_metric_candidates() {
        let cols = columns(&["country::text", "cases::integer", "deaths::numeric"]);
        let metrics = metric_candidates(&cols);

        assert_eq!(
            metrics,
            vec![
                "COUNT(*)",
                "COUNT(cases)",
                "AVG(cases)",
                "SUM(cases)",
                "MIN(cases)",
                "MAX(cases)",
                "COUNT(deaths)",
                "AVG(deaths)",
                "SUM(deaths)",
                "MIN(deaths)",
                "MAX(deaths)",
            ]
        );
    }

    #[test]
    fn test_metric_candidates_without_numeric_columns() {
        let cols = columns(&["country::text"]);
        assert_eq!(metric_candidates(&cols), vec!["COUNT(*)"]);
    }

    #[test]
    fn test_datetime_columns_and_names() {
        let cols = columns(&["day::date", "country::text", "ts::timestamp with time zone"]);
        assert_eq!(datetime_columns(&cols), vec!["day", "ts"]);
        assert_eq!(column_names(&cols), vec!["day", "country", "ts"]);
    }
}
