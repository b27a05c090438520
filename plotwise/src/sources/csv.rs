//! CSV sources: column discovery and import into the primary store.

use super::DataSource;
use crate::column::format_column;
use crate::context::{ensure_schema, ChartContext, DEFAULT_SCHEMA};
use crate::error::{ChartError, Result};
use crate::model::DatasetConfig;
use crate::security::SqlSecurity;
use arrow::array::{Array, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use chrono::NaiveDate;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Type tag for columns whose samples all read as numbers.
pub const NUMERIC_TAG: &str = "numeric";
/// Type tag for columns whose samples all read as `YYYY-MM-DD` dates.
pub const DATE_TAG: &str = "date";
/// Type tag for everything else.
pub const TEXT_TAG: &str = "text";

/// Options for reading CSV uploads.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the file starts with a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Number of data rows sampled to detect column types
    pub sample_rows: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            sample_rows: 100,
        }
    }
}

/// Classifies a column from its sampled values.
///
/// Blank values are ignored. A column is `numeric` when every remaining value
/// parses as a float, otherwise `date` when every remaining value is a
/// `YYYY-MM-DD` date, otherwise `text`. A column with no remaining values is
/// `numeric`.
///
/// ```rust
/// use plotwise::sources::detect_type;
///
/// assert_eq!(detect_type(&["1", " 2.5 ", ""]), "numeric");
/// assert_eq!(detect_type(&["2021-01-01", "2021-02-01"]), "date");
/// assert_eq!(detect_type(&["US", "1"]), "text");
/// ```
pub fn detect_type(values: &[&str]) -> &'static str {
    let mut is_number = true;
    let mut is_date = true;

    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if value.parse::<f64>().is_err() {
            is_number = false;
        }
        if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
            is_date = false;
        }
    }

    if is_number {
        NUMERIC_TAG
    } else if is_date {
        DATE_TAG
    } else {
        TEXT_TAG
    }
}

fn arrow_type(tag: &str) -> DataType {
    match tag {
        NUMERIC_TAG => DataType::Float64,
        DATE_TAG => DataType::Date32,
        _ => DataType::Utf8,
    }
}

/// A single uploaded CSV file with discovered column types.
///
/// Column descriptors keep the header text as written. The registered table
/// uses lower-cased field names, matching how unquoted identifiers in the
/// compiled SQL are resolved.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
    columns: Vec<String>,
    schema: SchemaRef,
}

impl CsvSource {
    /// Discovers the columns of a CSV file with default options.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::discover(path, CsvOptions::default())
    }

    /// Reads the header and up to `options.sample_rows` rows and classifies
    /// each column.
    #[instrument(skip(path, options), fields(path = %path.as_ref().display()))]
    pub fn discover(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = Format::default()
            .with_header(options.has_header)
            .with_delimiter(options.delimiter)
            .with_quote(options.quote);

        let (header, _) = format
            .infer_schema(File::open(&path)?, Some(1))
            .map_err(|e| csv_error(&path, "failed to read CSV header", e))?;

        let names: Vec<String> = header.fields().iter().map(|f| f.name().clone()).collect();
        if names.is_empty() {
            return Err(ChartError::data_source(
                "CSV",
                format!("{} has no columns", path.display()),
            ));
        }

        let raw_schema = Arc::new(Schema::new(
            names
                .iter()
                .map(|name| Field::new(name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ));

        let mut reader = ReaderBuilder::new(raw_schema)
            .with_header(options.has_header)
            .with_delimiter(options.delimiter)
            .with_quote(options.quote)
            .with_batch_size(options.sample_rows.max(1))
            .build(File::open(&path)?)
            .map_err(|e| csv_error(&path, "failed to open CSV reader", e))?;

        let sample = match reader.next() {
            Some(batch) => Some(batch.map_err(|e| csv_error(&path, "failed to sample CSV rows", e))?),
            None => None,
        };

        let mut columns = Vec::with_capacity(names.len());
        let mut fields = Vec::with_capacity(names.len());

        for (idx, name) in names.iter().enumerate() {
            let values: Vec<&str> = sample
                .as_ref()
                .and_then(|batch| batch.column(idx).as_any().downcast_ref::<StringArray>())
                .map(|array| {
                    (0..array.len().min(options.sample_rows))
                        .filter(|&row| array.is_valid(row))
                        .map(|row| array.value(row))
                        .collect()
                })
                .unwrap_or_default();

            let tag = detect_type(&values);
            columns.push(format_column(name, tag));
            fields.push(Field::new(name.to_lowercase(), arrow_type(tag), true));
        }

        debug!(columns = ?columns, "Discovered CSV columns");

        Ok(Self {
            path,
            options,
            columns,
            schema: Arc::new(Schema::new(fields)),
        })
    }

    /// `name::type` descriptors in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Table-name fragment derived from the file name.
    pub fn table_name(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        SqlSecurity::sanitize_name(&file_name)
    }

    fn file_extension(&self) -> String {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }
}

fn csv_error(path: &Path, message: &str, err: arrow::error::ArrowError) -> ChartError {
    ChartError::data_source_with_source(
        "CSV",
        format!("{message}: {}", path.display()),
        Box::new(err),
    )
}

#[async_trait]
impl DataSource for CsvSource {
    #[instrument(skip(self, ctx), fields(
        table.name = %table_name,
        source.type = "csv",
        csv.delimiter = %(self.options.delimiter as char),
        csv.has_header = self.options.has_header
    ))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        let path = self.path.to_str().ok_or_else(|| {
            ChartError::Configuration(format!(
                "CSV path is not valid UTF-8: {}",
                self.path.display()
            ))
        })?;

        if let Some((schema, _)) = table_name.split_once('.') {
            ensure_schema(ctx, schema).await?;
        }

        let extension = self.file_extension();
        let read_options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .schema(self.schema.as_ref())
            .file_extension(&extension);

        ctx.register_csv(table_name, path, read_options).await?;

        debug!(
            table.name = %table_name,
            source.type = "csv",
            "CSV data source registered successfully"
        );
        Ok(())
    }

    fn schema(&self) -> Option<&SchemaRef> {
        Some(&self.schema)
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.path.display())
    }
}

/// Imports uploaded CSV files as datasets of source `source_id`.
///
/// Each file becomes table `public.sources_<id>_<name>` in the primary store,
/// where `<name>` is the sanitized file name. Returns one dataset
/// configuration per file, in input order. The first failing file aborts the
/// import; tables registered before it stay registered.
#[instrument(skip(ctx, files, options), fields(files = files.len()))]
pub async fn import_csv_source(
    ctx: &mut ChartContext,
    source_id: i64,
    files: &[PathBuf],
    options: &CsvOptions,
) -> Result<Vec<DatasetConfig>> {
    let mut datasets = Vec::with_capacity(files.len());

    for file in files {
        let source = CsvSource::discover(file, options.clone())?;
        let table = format!("sources_{source_id}_{}", source.table_name());
        let qualified = format!("{DEFAULT_SCHEMA}.{table}");
        SqlSecurity::validate_identifier(&qualified)?;

        ctx.register_source(&qualified, &source).await?;
        info!(
            table.name = %qualified,
            source.id = source_id,
            columns = source.columns().len(),
            "Imported CSV file"
        );

        datasets.push(DatasetConfig::new(
            DEFAULT_SCHEMA,
            table,
            source.columns().to_vec(),
        ));
    }

    Ok(datasets)
}
