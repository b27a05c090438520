use super::{
    group_at, metric_values, title, unique, ChartRenderer, ChartSchema, ChartType, SchemaRules,
    DEMO_TITLE,
};
use crate::error::Result;
use serde_json::{json, Value};

/// Grid heatmap addressed by category index.
///
/// The first dimension spans the x-axis and the second, or the first again
/// when only one was requested, spans the y-axis. Each row becomes a cell
/// `[x_index, y_index, value]` where the indices point into the
/// de-duplicated axis lists. Cells keep the row order of the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatmapChart;

fn heatmap_series(data: Value) -> Value {
    json!([{
        "type": "heatmap",
        "label": {"show": true},
        "itemStyle": {
            "shadowBlur": 2,
            "shadowColor": "rgba(0, 0, 0, 0.5)"
        },
        "data": data
    }])
}

fn visual_map(min: Value, max: Value) -> Value {
    json!({
        "min": min,
        "max": max,
        "calculable": true,
        "orient": "horizontal",
        "left": "center"
    })
}

fn index_of(axis: &[String], key: &str) -> f64 {
    axis.iter().position(|k| k == key).map_or(-1.0, |i| i as f64)
}

fn demo_cells() -> Vec<[u32; 3]> {
    let readings: [[u32; 7]; 3] = [
        [20, 22, 21, 23, 24, 20, 19],
        [30, 32, 33, 31, 34, 35, 29],
        [24, 26, 25, 22, 23, 27, 21],
    ];

    readings
        .iter()
        .enumerate()
        .flat_map(|(y, row)| row.iter().enumerate().map(move |(x, v)| [x as u32, y as u32, *v]))
        .collect()
}

impl ChartRenderer for HeatmapChart {
    fn chart_type(&self) -> ChartType {
        ChartType::Heatmap
    }

    fn schema(&self) -> ChartSchema {
        ChartSchema {
            chart_type: ChartType::Heatmap,
            schema: SchemaRules::standard(2),
            example: json!({
                "title": title(DEMO_TITLE),
                "grid": {"height": "70%"},
                "xAxis": {"data": ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]},
                "yAxis": {"data": ["Morning", "Afternoon", "Evening"]},
                "visualMap": visual_map(json!(20), json!(40)),
                "series": heatmap_series(json!(demo_cells()))
            }),
        }
    }

    fn render(&self, name: &str, groups: &[Vec<String>], values: &[Vec<f64>]) -> Result<Value> {
        let xs = group_at(ChartType::Heatmap, groups, 0)?;
        let ys = if groups.len() == 2 {
            group_at(ChartType::Heatmap, groups, 1)?
        } else {
            xs
        };
        let amounts = metric_values(ChartType::Heatmap, values, xs.len())?;

        let x_axis = unique(xs);
        let y_axis = unique(ys);
        let cells: Vec<[f64; 3]> = xs
            .iter()
            .zip(ys)
            .zip(amounts)
            .map(|((x, y), v)| [index_of(&x_axis, x), index_of(&y_axis, y), *v])
            .collect();

        let (min, max) = match amounts.get(..xs.len()) {
            Some(rows) if !rows.is_empty() => (
                rows.iter().copied().fold(f64::INFINITY, f64::min),
                rows.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ),
            _ => (0.0, 0.0),
        };

        Ok(json!({
            "title": title(name),
            "grid": {"height": "70%"},
            "xAxis": {"data": x_axis},
            "yAxis": {"data": y_axis},
            "visualMap": visual_map(json!(min), json!(max)),
            "series": heatmap_series(json!(cells))
        }))
    }
}
