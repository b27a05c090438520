//! Query execution and tabulation.
//!
//! A compiled chart query returns rows of `dimension..., metric...` columns.
//! [`tabulate`] reshapes them column-major: one string sequence per dimension
//! ("groups") and one `f64` sequence per metric ("values"), preserving the
//! row order the query produced.

use crate::error::{ChartError, Result};
use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, instrument};

/// Placeholder emitted for null dimension values.
pub const NULL_GROUP: &str = "N/A";

/// A connection able to run a compiled chart query.
///
/// Implementations return the result as Arrow record batches in cursor order.
/// Dropping the returned future abandons the query; there is no other
/// cancellation or timeout handling at this layer.
#[async_trait]
pub trait Connection: Debug + Send + Sync {
    /// Runs `sql` and returns every result batch.
    async fn query(&self, sql: &str) -> Result<Vec<RecordBatch>>;

    /// Returns a human-readable description of this connection.
    fn description(&self) -> String;
}

/// Column-major query result.
///
/// Row `i` of every group sequence and every value sequence refers to the same
/// grouped result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tabulation {
    /// One sequence of formatted values per requested dimension
    pub groups: Vec<Vec<String>>,
    /// One sequence of numbers per requested metric
    pub values: Vec<Vec<f64>>,
}

impl Tabulation {
    /// Creates an empty tabulation with the given number of columns.
    pub fn with_shape(dimensions: usize, metrics: usize) -> Self {
        Self {
            groups: vec![Vec::new(); dimensions],
            values: vec![Vec::new(); metrics],
        }
    }

    /// Number of result rows.
    pub fn row_count(&self) -> usize {
        self.groups
            .first()
            .map(Vec::len)
            .or_else(|| self.values.first().map(Vec::len))
            .unwrap_or(0)
    }
}

/// Runs a compiled query and tabulates its rows.
///
/// Driver failures surface as [`crate::error::ChartError::Execution`];
/// nothing is retried.
#[instrument(skip(connection, sql), fields(connection = %connection.description()))]
pub async fn execute(
    connection: &dyn Connection,
    sql: &str,
    dimensions: usize,
    metrics: usize,
) -> Result<Tabulation> {
    let batches = connection.query(sql).await?;
    let tabulation = tabulate(&batches, dimensions, metrics)?;
    debug!(rows = tabulation.row_count(), "Tabulated chart query result");
    Ok(tabulation)
}

/// Reshapes record batches into groups and values.
///
/// The first `dimensions` columns become groups and the next `metrics`
/// columns become values; any further columns are ignored. A batch with fewer
/// columns than that is an [`ChartError::Execution`] error. Null groups become
/// [`NULL_GROUP`], and group values that read as numbers are normalized
/// through `f64`. Metric values that cannot be read as numbers become `0`.
pub fn tabulate(batches: &[RecordBatch], dimensions: usize, metrics: usize) -> Result<Tabulation> {
    let mut tabulation = Tabulation::with_shape(dimensions, metrics);
    let options = FormatOptions::default();

    let expected = dimensions + metrics;

    for batch in batches {
        if batch.num_columns() < expected {
            return Err(ChartError::execution(format!(
                "query returned {} columns, expected {expected} ({dimensions} dimensions, {metrics} metrics)",
                batch.num_columns()
            )));
        }

        for (idx, group) in tabulation.groups.iter_mut().enumerate() {
            append_groups(group, batch.column(idx), &options)?;
        }

        for (idx, values) in tabulation.values.iter_mut().enumerate() {
            append_values(values, batch.column(dimensions + idx));
        }
    }

    Ok(tabulation)
}

fn append_groups(target: &mut Vec<String>, array: &ArrayRef, options: &FormatOptions<'_>) -> Result<()> {
    let formatter = ArrayFormatter::try_new(array.as_ref(), options)?;

    for row in 0..array.len() {
        if array.is_null(row) {
            target.push(NULL_GROUP.to_string());
            continue;
        }

        let text = formatter.value(row).to_string();
        match text.parse::<f64>() {
            Ok(number) => target.push(format_number(number)),
            Err(_) => target.push(text),
        }
    }

    Ok(())
}

fn append_values(target: &mut Vec<f64>, array: &ArrayRef) {
    let numbers = cast(array, &DataType::Float64).ok();
    let numbers = numbers
        .as_ref()
        .and_then(|a| a.as_any().downcast_ref::<Float64Array>());

    match numbers {
        Some(numbers) => {
            target.extend((0..numbers.len()).map(|row| {
                if numbers.is_null(row) {
                    0.0
                } else {
                    numbers.value(row)
                }
            }));
        }
        None => target.extend(std::iter::repeat(0.0).take(array.len())),
    }
}

/// Formats a number the way group keys are presented to renderers.
///
/// Integral values print without a fractional part and very large or very
/// small magnitudes switch to exponent notation (`1e+21`, `1.5e-05`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e21).contains(&magnitude) {
        let scientific = format!("{value:e}");
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            if let Ok(exponent) = exponent.parse::<i32>() {
                let sign = if exponent < 0 { '-' } else { '+' };
                return format!("{mantissa}e{sign}{:02}", exponent.abs());
            }
        }
        return scientific;
    }

    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Decimal128Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn col<A: Array + 'static>(array: A) -> ArrayRef {
        Arc::new(array)
    }

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            columns.into_iter().map(|(_, array)| array).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_tabulate_two_dimensions_one_metric() {
        let batch = batch(vec![
            (
                "country",
                col(StringArray::from(vec!["CA", "CA", "US"])),
            ),
            (
                "month",
                col(StringArray::from(vec!["2021-01-01", "2021-02-01", "2021-01-01"])),
            ),
            ("sum", col(Int64Array::from(vec![1, 2, 3]))),
        ]);

        let result = tabulate(&[batch], 2, 1).unwrap();
        assert_eq!(result.groups[0], vec!["CA", "CA", "US"]);
        assert_eq!(result.groups[1], vec!["2021-01-01", "2021-02-01", "2021-01-01"]);
        assert_eq!(result.values[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(result.row_count(), 3);
    }

    #[test]
    fn test_tabulate_spans_batches_in_order() {
        let first = batch(vec![
            ("k", col(StringArray::from(vec!["a"]))),
            ("v", col(Int64Array::from(vec![1]))),
        ]);
        let second = batch(vec![
            ("k", col(StringArray::from(vec!["b", "c"]))),
            ("v", col(Int64Array::from(vec![2, 3]))),
        ]);

        let result = tabulate(&[first, second], 1, 1).unwrap();
        assert_eq!(result.groups[0], vec!["a", "b", "c"]);
        assert_eq!(result.values[0], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_null_groups_become_placeholder() {
        let batch = batch(vec![
            (
                "country",
                col(StringArray::from(vec![Some("US"), None])),
            ),
            ("v", col(Int64Array::from(vec![1, 2]))),
        ]);

        let result = tabulate(&[batch], 1, 1).unwrap();
        assert_eq!(result.groups[0], vec!["US", "N/A"]);
    }

    #[test]
    fn test_numeric_groups_are_normalized() {
        let decimals = Decimal128Array::from(vec![150, 200])
            .with_precision_and_scale(10, 2)
            .unwrap();
        let batch = batch(vec![
            ("price", col(decimals)),
            ("year", col(StringArray::from(vec!["2021", "2022.0"]))),
            ("v", col(Int64Array::from(vec![1, 2]))),
        ]);

        let result = tabulate(&[batch], 2, 1).unwrap();
        assert_eq!(result.groups[0], vec!["1.5", "2"]);
        assert_eq!(result.groups[1], vec!["2021", "2022"]);
    }

    #[test]
    fn test_padded_numeric_text_is_not_normalized() {
        let batch = batch(vec![
            ("code", col(StringArray::from(vec![" 5", "5.0", "7 "]))),
            ("v", col(Int64Array::from(vec![1, 2, 3]))),
        ]);

        let result = tabulate(&[batch], 1, 1).unwrap();
        assert_eq!(result.groups[0], vec![" 5", "5", "7 "]);
    }

    #[test]
    fn test_missing_columns_are_an_execution_error() {
        let batch = batch(vec![
            ("k", col(StringArray::from(vec!["a"]))),
            ("v", col(Int64Array::from(vec![1]))),
        ]);

        let err = tabulate(&[batch], 2, 1).unwrap_err();
        assert!(matches!(err, ChartError::Execution { .. }));
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn test_date_groups_keep_their_text() {
        let batch = batch(vec![
            ("day", col(Date32Array::from(vec![18628]))),
            ("v", col(Int64Array::from(vec![1]))),
        ]);

        let result = tabulate(&[batch], 1, 1).unwrap();
        assert_eq!(result.groups[0], vec!["2021-01-01"]);
    }

    #[test]
    fn test_unreadable_metrics_default_to_zero() {
        let batch = batch(vec![
            ("k", col(StringArray::from(vec!["a", "b", "c"]))),
            (
                "v",
                col(StringArray::from(vec![Some("1.5"), Some("oops"), None])),
            ),
        ]);

        let result = tabulate(&[batch], 1, 1).unwrap();
        assert_eq!(result.values[0], vec![1.5, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_result_keeps_shape() {
        let result = tabulate(&[], 2, 1).unwrap();
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.values.len(), 1);
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2021.0), "2021");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-3.25), "-3.25");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(0.000015), "1.5e-05");
        assert_eq!(format_number(f64::INFINITY), "+Inf");
    }
}
