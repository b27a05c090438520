use super::{
    group_at, metric_values, title, unique, ChartRenderer, ChartSchema, ChartType, SchemaRules,
    DEMO_TITLE,
};
use crate::error::Result;
use serde::Serialize;
use serde_json::{json, Value};

/// Name of the synthetic root node that collects every flow.
const ROOT: &str = "";

/// Two-level flow diagram.
///
/// With two differing dimensions each row links the second dimension's value
/// into the first, and every first-dimension value then drains into the
/// root node with the flow accumulated so far. When the dimensions are the
/// same sequence every row links straight into the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct SankeyChart;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Link {
    source: String,
    target: String,
    value: f64,
}

fn nodes(xs: &[String], ys: &[String]) -> Vec<Value> {
    let mut names: Vec<String> = xs.iter().chain(ys).cloned().collect();
    names = unique(&names);
    if !names.is_empty() {
        names.push(ROOT.to_string());
    }
    names.into_iter().map(|name| json!({"name": name})).collect()
}

fn links(xs: &[String], ys: &[String], amounts: &[f64]) -> Vec<Link> {
    let mut links = Vec::with_capacity(xs.len() * 2);

    if xs != ys {
        links.extend(xs.iter().zip(ys).zip(amounts).map(|((x, y), v)| Link {
            source: y.clone(),
            target: x.clone(),
            value: *v,
        }));

        // subtotals see every link pushed before them, including earlier subtotals
        for x in xs {
            let subtotal: f64 = links
                .iter()
                .filter(|link| &link.target == x)
                .map(|link| link.value)
                .sum();
            links.push(Link {
                source: x.clone(),
                target: ROOT.to_string(),
                value: subtotal,
            });
        }
    } else {
        links.extend(xs.iter().zip(amounts).map(|(x, v)| Link {
            source: x.clone(),
            target: ROOT.to_string(),
            value: *v,
        }));
    }

    links
}

fn demo() -> Value {
    let nodes = [
        "Online", "In-Store", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "",
    ];
    let flows = [
        ("", "Online", 18),
        ("", "In-Store", 13),
        ("Online", "Monday", 8),
        ("In-Store", "Monday", 2),
        ("Online", "Tuesday", 2),
        ("Online", "Wednesday", 3),
        ("Online", "Thursday", 5),
        ("In-Store", "Thursday", 10),
        ("In-Store", "Friday", 1),
    ];

    json!({
        "title": title(DEMO_TITLE),
        "series": [{
            "type": "sankey",
            "draggable": false,
            "left": "10%",
            "top": "10%",
            "right": "10%",
            "bottom": "10%",
            "data": nodes.iter().map(|name| json!({"name": name})).collect::<Vec<_>>(),
            "links": flows
                .iter()
                .map(|(source, target, value)| {
                    json!({"source": source, "target": target, "value": value})
                })
                .collect::<Vec<_>>()
        }]
    })
}

impl ChartRenderer for SankeyChart {
    fn chart_type(&self) -> ChartType {
        ChartType::Sankey
    }

    fn schema(&self) -> ChartSchema {
        ChartSchema {
            chart_type: ChartType::Sankey,
            schema: SchemaRules::standard(2),
            example: demo(),
        }
    }

    fn render(&self, name: &str, groups: &[Vec<String>], values: &[Vec<f64>]) -> Result<Value> {
        let xs = group_at(ChartType::Sankey, groups, 0)?;
        let ys = if groups.len() == 2 {
            group_at(ChartType::Sankey, groups, 1)?
        } else {
            xs
        };
        let amounts = metric_values(ChartType::Sankey, values, xs.len())?;

        Ok(json!({
            "title": title(name),
            "series": {
                "type": "sankey",
                "draggable": false,
                "left": "5%",
                "top": "5%",
                "right": "5%",
                "bottom": "5%",
                "data": nodes(xs, ys),
                "links": links(xs, ys, amounts)
            }
        }))
    }
}
