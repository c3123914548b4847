use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::core::ProjectionHistory;

pub const QUICKCHART_BASE_URL: &str = "https://quickchart.io/chart";
/// Chat clients cap image URLs, so charts carry only a handful of samples.
pub const DEFAULT_MAX_POINTS: usize = 10;

const CHART_WIDTH: &str = "600";
const CHART_HEIGHT: &str = "400";
const CHART_BACKGROUND: &str = "rgb(20,20,20)";

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to serialize chart config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("failed to encode chart query: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),
}

/// Picks at most `max_points` evenly strided indices out of `len`, always
/// keeping the first and the last sample.
pub fn downsample_indices(len: usize, max_points: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    if len <= max_points {
        return (0..len).collect();
    }
    if max_points < 2 {
        return vec![len - 1];
    }

    let last = len - 1;
    let step = last.div_ceil(max_points - 1);
    let mut indices = (0..len).step_by(step).collect::<Vec<_>>();
    if indices.last() != Some(&last) {
        indices.push(last);
    }
    indices
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub ages: Vec<u32>,
    pub funds: Vec<f64>,
    pub needs_with_fun: Vec<f64>,
    pub needs_basic: Vec<f64>,
}

impl ChartSeries {
    pub fn from_history(history: &ProjectionHistory, max_points: usize) -> Self {
        let indices = downsample_indices(history.len(), max_points);
        let pick = |values: &[f64]| indices.iter().map(|&i| values[i]).collect::<Vec<_>>();

        Self {
            ages: indices.iter().map(|&i| history.ages[i]).collect(),
            funds: pick(history.funds.as_slice()),
            needs_with_fun: pick(history.needs_with_fun.as_slice()),
            needs_basic: pick(history.needs_basic.as_slice()),
        }
    }
}

fn dataset(label: &str, data: &[f64], rgb: &str) -> serde_json::Value {
    json!({
        "label": label,
        "data": data,
        "borderColor": format!("rgb({rgb})"),
        "backgroundColor": format!("rgba({rgb}, 0.1)"),
        "borderWidth": 2,
        "fill": true,
        "pointRadius": 0,
    })
}

/// Chart.js line chart of savings against cumulative need.
pub fn chart_config(series: &ChartSeries) -> serde_json::Value {
    json!({
        "type": "line",
        "data": {
            "labels": series.ages,
            "datasets": [
                dataset("Projected savings", &series.funds, "0, 195, 0"),
                dataset("Need incl. discretionary", &series.needs_with_fun, "54, 162, 235"),
                dataset("Basic need", &series.needs_basic, "217, 119, 6"),
            ],
        },
        "options": {
            "title": {
                "display": true,
                "text": "Savings vs. retirement need by age",
                "fontColor": "#ffffff",
                "fontSize": 16,
            },
            "legend": { "labels": { "fontColor": "#ffffff" } },
            "scales": {
                "xAxes": [{
                    "gridLines": { "display": false },
                    "ticks": { "fontColor": "#cccccc", "maxTicksLimit": 10 },
                }],
                "yAxes": [{
                    "gridLines": { "color": "rgba(255, 255, 255, 0.2)" },
                    "ticks": { "fontColor": "#cccccc" },
                }],
            },
        },
    })
}

pub fn quickchart_url(history: &ProjectionHistory) -> Result<String, ChartError> {
    quickchart_url_with(history, DEFAULT_MAX_POINTS)
}

pub fn quickchart_url_with(
    history: &ProjectionHistory,
    max_points: usize,
) -> Result<String, ChartError> {
    let series = ChartSeries::from_history(history, max_points);
    let config = serde_json::to_string(&chart_config(&series))?;
    let query = serde_urlencoded::to_string([
        ("c", config.as_str()),
        ("w", CHART_WIDTH),
        ("h", CHART_HEIGHT),
        ("bkg", CHART_BACKGROUND),
        ("f", "png"),
    ])?;
    Ok(format!("{QUICKCHART_BASE_URL}?{query}"))
}
