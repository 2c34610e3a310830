use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;

/// A row as returned by the run store. Shape is not guaranteed.
pub type RawRunRecord = JsonValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceDataPoint {
    pub timestamp: i64,
    pub best_pace_seconds: u32,
}
