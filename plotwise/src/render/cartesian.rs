//! Bar, line and scatter charts.
//!
//! The three families share one document layout and differ only in the
//! series `type` tag and their demo payloads.

use super::{
    group_at, metric_values, title, unique, ChartRenderer, ChartSchema, ChartType, SchemaRules,
    DEMO_TITLE,
};
use crate::error::Result;
use serde_json::{json, Value};

/// Renderer for the axis-based chart families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartesianChart {
    chart_type: ChartType,
}

impl CartesianChart {
    pub fn bar() -> Self {
        Self {
            chart_type: ChartType::Bar,
        }
    }

    pub fn line() -> Self {
        Self {
            chart_type: ChartType::Line,
        }
    }

    pub fn scatter() -> Self {
        Self {
            chart_type: ChartType::Scatter,
        }
    }

    fn series(&self, name: &str, data: &[f64]) -> Value {
        json!({
            "type": self.chart_type.as_str(),
            "name": name,
            "data": data,
        })
    }

    fn example(&self) -> Value {
        let tag = self.chart_type.as_str();
        match self.chart_type {
            ChartType::Scatter => json!({
                "title": title(DEMO_TITLE),
                "xAxis": {"data": ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]},
                "yAxis": {},
                "series": [
                    {"type": tag, "data": [220, 182, 191, 234, 290, 330, 310]},
                    {"type": tag, "data": [22, 18, 19, 23, 29, 33, 31]}
                ]
            }),
            ChartType::Bar => json!({
                "title": title(DEMO_TITLE),
                "legend": {"bottom": 0},
                "xAxis": {"data": ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]},
                "yAxis": {},
                "series": [{"type": tag, "data": [150, 230, 224, 218, 135, 147, 260]}]
            }),
            _ => json!({
                "title": title(DEMO_TITLE),
                "xAxis": {"data": ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]},
                "yAxis": {},
                "series": [{"type": tag, "data": [150, 230, 224, 218, 135, 147, 260]}]
            }),
        }
    }
}

impl ChartRenderer for CartesianChart {
    fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    fn schema(&self) -> ChartSchema {
        ChartSchema {
            chart_type: self.chart_type,
            schema: SchemaRules::standard(2),
            example: self.example(),
        }
    }

    /// One dimension plots a single unnamed series along it. Two dimensions
    /// put the first on the x-axis and split the metric into one series per
    /// value of the second, in order of first appearance. Any other
    /// dimension count leaves axis, legend and series empty.
    fn render(&self, name: &str, groups: &[Vec<String>], values: &[Vec<f64>]) -> Result<Value> {
        let (legend, x_axis, series) = match groups.len() {
            1 => {
                let x_axis = group_at(self.chart_type, groups, 0)?;
                let data = metric_values(self.chart_type, values, x_axis.len())?;
                (Value::Null, json!(x_axis), json!([self.series("", data)]))
            }
            2 => {
                let x_axis = group_at(self.chart_type, groups, 0)?;
                let buckets = group_at(self.chart_type, groups, 1)?;
                let data = metric_values(self.chart_type, values, buckets.len())?;

                let legend = unique(buckets);
                let series: Vec<Value> = legend
                    .iter()
                    .map(|bucket| {
                        let points: Vec<f64> = buckets
                            .iter()
                            .zip(data)
                            .filter(|(b, _)| *b == bucket)
                            .map(|(_, v)| *v)
                            .collect();
                        self.series(bucket, &points)
                    })
                    .collect();

                (json!(legend), json!(unique(x_axis)), Value::Array(series))
            }
            _ => (Value::Null, Value::Null, Value::Null),
        };

        Ok(json!({
            "title": title(name),
            "legend": {
                "bottom": 0,
                "data": legend
            },
            "xAxis": {
                "data": x_axis
            },
            "yAxis": {},
            "series": series
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartError;

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_dimension_bar() {
        let doc = CartesianChart::bar()
            .render("Weekly", &[strings(&["Mon", "Tue"])], &[vec![1.0, 2.0]])
            .unwrap();

        assert_eq!(doc["title"]["text"], json!("Weekly"));
        assert_eq!(doc["xAxis"]["data"], json!(["Mon", "Tue"]));
        assert_eq!(doc["legend"], json!({"bottom": 0, "data": null}));
        assert_eq!(doc["yAxis"], json!({}));

        let series = doc["series"].as_array().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0]["type"], json!("bar"));
        assert_eq!(series[0]["name"], json!(""));
        assert_eq!(series[0]["data"], json!([1.0, 2.0]));
    }

    #[test]
    fn test_two_dimensions_split_into_series() {
        let groups = vec![
            strings(&["2021-01", "2021-01", "2021-02", "2021-02", "2021-03"]),
            strings(&["US", "CA", "US", "CA", "US"]),
        ];
        let values = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]];

        let doc = CartesianChart::line().render("Cases", &groups, &values).unwrap();

        assert_eq!(doc["xAxis"]["data"], json!(["2021-01", "2021-02", "2021-03"]));
        assert_eq!(doc["legend"]["data"], json!(["US", "CA"]));
        assert_eq!(
            doc["series"],
            json!([
                {"type": "line", "name": "US", "data": [1.0, 3.0, 5.0]},
                {"type": "line", "name": "CA", "data": [2.0, 4.0]}
            ])
        );
    }

    #[test]
    fn test_series_order_is_stable() {
        let groups = vec![strings(&["a", "a", "a"]), strings(&["z", "m", "b"])];
        let values = vec![vec![1.0, 2.0, 3.0]];
        let chart = CartesianChart::scatter();

        let first = chart.render("s", &groups, &values).unwrap();
        for _ in 0..10 {
            assert_eq!(chart.render("s", &groups, &values).unwrap(), first);
        }
        let names: Vec<&str> = first["series"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["z", "m", "b"]);
    }

    #[test]
    fn test_unsupported_dimension_count_renders_empty() {
        let doc = CartesianChart::bar().render("none", &[], &[vec![]]).unwrap();
        assert_eq!(doc["xAxis"]["data"], Value::Null);
        assert_eq!(doc["series"], Value::Null);
        assert_eq!(doc["legend"]["data"], Value::Null);
    }

    #[test]
    fn test_missing_metric_is_render_error() {
        let err = CartesianChart::bar()
            .render("x", &[strings(&["Mon"])], &[])
            .unwrap_err();
        assert!(matches!(err, ChartError::Render(_)));
    }

    #[test]
    fn test_title_is_escaped() {
        let doc = CartesianChart::bar()
            .render("say \"hi\"", &[strings(&["a"])], &[vec![1.0]])
            .unwrap();
        assert_eq!(doc["title"]["text"], json!("say \"hi\""));
    }

    #[test]
    fn test_examples_differ_per_family() {
        let bar = CartesianChart::bar().schema();
        let scatter = CartesianChart::scatter().schema();
        let line = CartesianChart::line().schema();

        assert_eq!(bar.example["legend"], json!({"bottom": 0}));
        assert_eq!(scatter.example["series"].as_array().unwrap().len(), 2);
        assert_eq!(line.example["series"][0]["type"], json!("line"));
        assert_eq!(line.schema.dimensions.max, 2);
    }
}
