use crate::models::run::{ PaceDataPoint, RawRunRecord };
use crate::pace::try_parse_pace;
use chrono::{ DateTime, NaiveDate, NaiveDateTime };
use log::warn;

pub const DEFAULT_DATE_COLUMN: &str = "Date";
pub const DEFAULT_PACE_COLUMN: &str = "Best Pace";

/// Column names read from each raw record. The backend names contain spaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunColumns {
    pub date: String,
    pub pace: String,
}

impl Default for RunColumns {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_COLUMN.to_string(),
            pace: DEFAULT_PACE_COLUMN.to_string(),
        }
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const NAIVE_DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];

/// Epoch milliseconds for a date string, or `None` if it is not a date.
///
/// Accepts RFC 3339, RFC 2822, naive date-times and the date-only forms
/// `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, `Jan 5, 2024` and `January 5, 2024`.
/// Values without an offset are taken as UTC. Other free-form text is rejected.
pub fn parse_instant(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }
    if let Some(date) = NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
    }
    NAIVE_DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(text, fmt)
            .ok()
            .map(|dt| dt.and_utc().timestamp_millis())
    })
}

fn to_point(record: &RawRunRecord, columns: &RunColumns) -> Option<PaceDataPoint> {
    let Some(fields) = record.as_object() else {
        warn!("Skipping run record that is not an object: {}", record);
        return None;
    };

    let date = fields.get(&columns.date).and_then(|v| v.as_str());
    let pace = fields.get(&columns.pace).and_then(|v| v.as_str());
    let (Some(date), Some(pace)) = (date, pace) else {
        warn!(
            "Skipping run record without string '{}' and '{}' fields: {}",
            columns.date,
            columns.pace,
            record
        );
        return None;
    };

    let Some(timestamp) = parse_instant(date) else {
        warn!("Skipping run record with unparseable date '{}'", date);
        return None;
    };

    // A pace of zero is not a real pace and is dropped like a parse failure.
    match try_parse_pace(Some(pace)) {
        Ok(0) => {
            warn!("Skipping run record with zero pace '{}'", pace);
            None
        }
        Ok(best_pace_seconds) => Some(PaceDataPoint { timestamp, best_pace_seconds }),
        Err(e) => {
            warn!("Skipping run record: {}", e);
            None
        }
    }
}

/// Turns raw store rows into chart points sorted by timestamp, dropping invalid rows.
pub fn normalize(records: Option<&[RawRunRecord]>, columns: &RunColumns) -> Vec<PaceDataPoint> {
    let Some(records) = records else {
        return Vec::new();
    };

    let mut points: Vec<PaceDataPoint> = records
        .iter()
        .filter_map(|record| to_point(record, columns))
        .collect();
    points.sort_unstable_by_key(|p| p.timestamp);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JAN_5_2024_MS: i64 = 1_704_412_800_000;

    fn run(records: serde_json::Value) -> Vec<PaceDataPoint> {
        let records = records.as_array().cloned().unwrap();
        normalize(Some(&records), &RunColumns::default())
    }

    #[test]
    fn none_and_empty_yield_nothing() {
        assert!(normalize(None, &RunColumns::default()).is_empty());
        assert!(normalize(Some(&[]), &RunColumns::default()).is_empty());
    }

    #[test]
    fn single_valid_record() {
        let points = run(json!([{ "Date": "2024-01-05", "Best Pace": "06:10" }]));
        assert_eq!(points, vec![PaceDataPoint { timestamp: JAN_5_2024_MS, best_pace_seconds: 370 }]);
    }

    #[test]
    fn drops_bad_dates_and_paces() {
        assert!(run(json!([{ "Date": "not-a-date", "Best Pace": "06:10" }])).is_empty());
        assert!(run(json!([{ "Date": "2024-01-05", "Best Pace": "0:00" }])).is_empty());
        assert!(run(json!([{ "Date": "2024-01-05", "Best Pace": "6:75" }])).is_empty());
    }

    #[test]
    fn drops_wrongly_typed_records() {
        let points = run(json!([
            null,
            42,
            "2024-01-05",
            { "Date": 20240105, "Best Pace": "06:10" },
            { "Date": "2024-01-05", "Best Pace": 370 },
            { "Date": "2024-01-05" },
            { "date": "2024-01-05", "best_pace": "06:10" }
        ]));
        assert!(points.is_empty());
    }

    #[test]
    fn sorts_by_timestamp() {
        let points = run(json!([
            { "Date": "2024-03-01", "Best Pace": "05:50" },
            { "Date": "bogus", "Best Pace": "05:00" },
            { "Date": "2024-01-05", "Best Pace": "06:10" },
            { "Date": "2024-02-01T07:30:00Z", "Best Pace": "06:00" }
        ]));
        let timestamps: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(points.len(), 3);
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(points[0].best_pace_seconds, 370);
        assert_eq!(points[2].best_pace_seconds, 350);
    }

    #[test]
    fn custom_columns() {
        let columns = RunColumns { date: "run_date".into(), pace: "pace".into() };
        let records = vec![json!({ "run_date": "2024-01-05", "pace": "7:5" })];
        let points = normalize(Some(&records), &columns);
        assert_eq!(points[0].best_pace_seconds, 425);
    }

    #[test]
    fn parses_backend_date_forms() {
        assert_eq!(parse_instant("2024-01-05"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("2024-01-05T00:00:00Z"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("2024-01-05T02:00:00+02:00"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("2024-01-05 00:00:00+00"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("2024-01-05 00:00:00"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("2024-01-05T00:00:00.000"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("Fri, 05 Jan 2024 00:00:00 +0000"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("2024/01/05"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("01/05/2024"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("Jan 5, 2024"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("January 5, 2024"), Some(JAN_5_2024_MS));
        assert_eq!(parse_instant("2024-13-40"), None);
        assert_eq!(parse_instant("next tuesday"), None);
        assert_eq!(parse_instant(""), None);
    }
}
