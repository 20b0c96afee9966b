//! Structured chart configuration
//!
//! Chart regions carry a JSON document describing the charts to draw, not
//! executable code. The controller deserializes the region's text into
//! `ChartPayload` and hands each chart to a `ChartRenderer`; a malformed
//! payload is logged and skipped without failing the refresh.

use serde::{Deserialize, Serialize};

/// One dataset within a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    #[serde(default)]
    pub label: String,
    pub data: Vec<f64>,
    /// One color per slice/bar
    #[serde(default)]
    pub background_color: Vec<String>,
}

/// Configuration for a single chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Chart kind, e.g. "pie"
    #[serde(rename = "type")]
    pub chart_type: String,
    /// Selector of the canvas this chart draws on, e.g. "#expensesChart"
    pub target: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

/// The full payload of a chart region: one entry per canvas on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub charts: Vec<ChartSpec>,
}

/// Rendering seam; the core never draws anything itself
pub trait ChartRenderer: Send + Sync {
    /// Draw (or redraw) one chart on its target canvas
    fn render(&self, spec: &ChartSpec);
}

/// Default renderer: logs what would be drawn
#[derive(Debug, Default)]
pub struct LogChartRenderer;

impl ChartRenderer for LogChartRenderer {
    fn render(&self, spec: &ChartSpec) {
        log::info!(
            "chart: {} on {} ({} labels, {} datasets)",
            spec.chart_type,
            spec.target,
            spec.labels.len(),
            spec.datasets.len()
        );
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_deserializes_chartjs_shape() {
        let json = r##"{
            "charts": [
                {
                    "type": "pie",
                    "target": "#expensesChart",
                    "labels": ["Rent", "Food"],
                    "datasets": [
                        {
                            "label": "Expenses",
                            "data": [1200.0, 450.5],
                            "backgroundColor": ["#ff6384", "#36a2eb"]
                        }
                    ]
                },
                {
                    "type": "pie",
                    "target": "#incomeChart",
                    "labels": ["Salary"],
                    "datasets": [{ "data": [5000.0] }]
                }
            ]
        }"##;
        let payload: ChartPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.charts.len(), 2);
        assert_eq!(payload.charts[0].target, "#expensesChart");
        assert_eq!(payload.charts[0].datasets[0].background_color.len(), 2);
        assert_eq!(payload.charts[1].datasets[0].label, "");
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(serde_json::from_str::<ChartPayload>("initChart();").is_err());
    }
}
