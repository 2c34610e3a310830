use crate::models::run::PaceDataPoint;
use crate::pace::{ format_date_tick, format_pace_tick };
use serde::Serialize;

pub const BEST_PACE_TITLE: &str = "Best Pace Trend";
pub const BEST_PACE_COLOR: &str = "#1E90FF";
pub const BEST_PACE_Y_LABEL: &str = "Best Pace (MM:SS)";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: i64,
    pub best_pace_seconds: u32,
    pub date_label: String,
    pub pace_label: String,
}

impl From<&PaceDataPoint> for ChartPoint {
    fn from(point: &PaceDataPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            best_pace_seconds: point.best_pace_seconds,
            date_label: format_date_tick(point.timestamp),
            pace_label: format_pace_tick(point.best_pace_seconds),
        }
    }
}

/// Everything the dashboard needs to draw a line chart over time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChart {
    pub title: String,
    pub x_key: String,
    pub y_key: String,
    pub color: String,
    pub y_axis_label: String,
    /// Lower values plot higher.
    pub inverted: bool,
    pub points: Vec<ChartPoint>,
}

impl LineChart {
    pub fn best_pace(points: &[PaceDataPoint]) -> Self {
        Self {
            title: BEST_PACE_TITLE.to_string(),
            x_key: "timestamp".to_string(),
            y_key: "bestPaceSeconds".to_string(),
            color: BEST_PACE_COLOR.to_string(),
            y_axis_label: BEST_PACE_Y_LABEL.to_string(),
            inverted: true,
            points: points.iter().map(ChartPoint::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
