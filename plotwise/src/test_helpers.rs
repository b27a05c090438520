//! Shared fixtures for unit tests.

use crate::context::ChartContext;
use crate::model::{Dataset, DatasetConfig, Source, SourceConfig, SourceType};
use crate::repository::InMemoryCatalog;
use arrow::array::{Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::sync::Arc;

pub const COVID_SOURCE: i64 = 1;
pub const COVID_DATASET: i64 = 1;

pub const COVID_COLUMNS: [&str; 3] = [
    "date::timestamp without time zone",
    "country::text",
    "cases::integer",
];

fn millis(year: i32, month: u32, day: u32) -> i64 {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap()
}

/// `public.covid`: US has 35 cases over three rows, CA 4 over two.
pub fn covid_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "date",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new("country", DataType::Utf8, true),
        Field::new("cases", DataType::Int64, true),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(TimestampMillisecondArray::from(vec![
                millis(2021, 1, 1),
                millis(2021, 1, 15),
                millis(2021, 2, 1),
                millis(2021, 1, 1),
                millis(2021, 2, 1),
            ])),
            Arc::new(StringArray::from(vec!["US", "US", "US", "CA", "CA"])),
            Arc::new(Int64Array::from(vec![10, 20, 5, 3, 1])),
        ],
    )
    .unwrap()
}

pub async fn covid_context() -> ChartContext {
    let mut ctx = ChartContext::new().unwrap();
    let batch = covid_batch();
    ctx.register_batches("public.covid", batch.schema(), vec![batch])
        .await
        .unwrap();
    ctx
}

pub async fn covid_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    catalog
        .insert_source(Source {
            id: COVID_SOURCE,
            name: "uploads".to_string(),
            source_type: SourceType::Csv,
            config: SourceConfig::default(),
        })
        .await;
    catalog
        .insert_dataset(Dataset {
            id: COVID_DATASET,
            source_id: COVID_SOURCE,
            name: "covid".to_string(),
            config: DatasetConfig::new("public", "covid", COVID_COLUMNS),
        })
        .await;
    catalog
}
