use super::{
    group_at, metric_values, title, ChartRenderer, ChartSchema, ChartType, SchemaRules, DEMO_TITLE,
};
use crate::error::Result;
use serde_json::{json, Value};

/// Ring-shaped pie chart with one slice per group.
#[derive(Debug, Clone, Copy, Default)]
pub struct PieChart;

fn pie_series(data: Value) -> Value {
    json!([{
        "type": "pie",
        "radius": ["40%", "70%"],
        "avoidLabelOverlap": false,
        "itemStyle": {
            "borderRadius": 10,
            "borderColor": "#fff",
            "borderWidth": 2
        },
        "data": data
    }])
}

impl ChartRenderer for PieChart {
    fn chart_type(&self) -> ChartType {
        ChartType::Pie
    }

    fn schema(&self) -> ChartSchema {
        let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        let counts = [150, 230, 224, 218, 135, 147, 260];
        let slices: Vec<Value> = days
            .iter()
            .zip(counts)
            .map(|(name, value)| json!({"value": value, "name": name}))
            .collect();

        ChartSchema {
            chart_type: ChartType::Pie,
            schema: SchemaRules::standard(1),
            example: json!({
                "title": title(DEMO_TITLE),
                "series": pie_series(Value::Array(slices))
            }),
        }
    }

    fn render(&self, name: &str, groups: &[Vec<String>], values: &[Vec<f64>]) -> Result<Value> {
        let names = group_at(ChartType::Pie, groups, 0)?;
        let amounts = metric_values(ChartType::Pie, values, names.len())?;

        let slices: Vec<Value> = names
            .iter()
            .zip(amounts)
            .map(|(name, value)| json!({"name": name, "value": value}))
            .collect();

        Ok(json!({
            "title": title(name),
            "series": pie_series(Value::Array(slices))
        }))
    }
}
