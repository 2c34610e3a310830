mod memory;
mod postgrest;

pub use memory::MemoryRunStore;
pub use postgrest::PostgrestRunStore;

use crate::cli::Args;
use crate::models::run::RawRunRecord;
use async_trait::async_trait;
use log::info;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store configuration error: {0}")]
    Config(String),
    #[error("request to store failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
    #[error("no run record with id {0}")]
    NotFound(i64),
    #[error("more than one run record with id {0}")]
    Ambiguous(i64),
    #[error("fixture error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scalar accepted as an equality filter value.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FilterValue {
    /// Whether a stored field equals this value. Text compares against the field's
    /// rendered form so that `"3"` matches a numeric `3`, as the backend coerces.
    pub fn matches(&self, field: Option<&JsonValue>) -> bool {
        match (self, field) {
            (FilterValue::Null, None) | (FilterValue::Null, Some(JsonValue::Null)) => true,
            (_, None) | (_, Some(JsonValue::Null)) => false,
            (FilterValue::Text(s), Some(JsonValue::String(v))) => s == v,
            (FilterValue::Text(s), Some(v)) => *s == v.to_string(),
            (FilterValue::Int(i), Some(v)) => {
                v.as_i64() == Some(*i) || v.as_f64() == Some(*i as f64)
            }
            (FilterValue::Float(f), Some(v)) => v.as_f64() == Some(*f),
            (FilterValue::Bool(b), Some(v)) => v.as_bool() == Some(*b),
            (FilterValue::Null, Some(_)) => false,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => f.write_str(s),
            FilterValue::Int(i) => write!(f, "{}", i),
            FilterValue::Float(x) => write!(f, "{}", x),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self { FilterValue::Text(value.to_string()) }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self { FilterValue::Text(value) }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self { FilterValue::Int(value) }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self { FilterValue::Float(value) }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self { FilterValue::Bool(value) }
}

/// Column name to value; every entry is an equality predicate and all are ANDed.
pub type Filters = BTreeMap<String, FilterValue>;

/// Query parameters the backend treats as operators rather than columns.
pub const RESERVED_PARAMS: [&str; 7] = ["select", "order", "limit", "offset", "and", "or", "on_conflict"];

pub fn is_reserved_param(name: &str) -> bool {
    RESERVED_PARAMS.contains(&name)
}

/// Read access to the run records table. One round trip per call, no retries.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<RawRunRecord>, StoreError>;

    async fn fetch_by_id(&self, id: i64) -> Result<RawRunRecord, StoreError>;

    async fn fetch_filtered(&self, filters: &Filters) -> Result<Vec<RawRunRecord>, StoreError>;
}

pub fn create_run_store(
    args: &Args
) -> Result<Arc<dyn RunStore>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "postgrest" | "supabase" => {
            let base_url = args.backend_url.as_deref()
                .ok_or_else(|| StoreError::Config("SUPABASE_URL is not set".to_string()))?;
            let key = args.backend_key.as_deref()
                .ok_or_else(|| StoreError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;
            let store = PostgrestRunStore::new(
                base_url,
                key,
                &args.runs_table,
                Duration::from_secs(args.backend_timeout_secs)
            )?;
            info!("Run records will be read from table '{}' at {}", args.runs_table, base_url);
            Ok(Arc::new(store))
        }
        "memory" => {
            let store = match &args.runs_fixture {
                Some(path) => {
                    info!("Run records will be read from fixture {}", path);
                    MemoryRunStore::from_file(path)?
                }
                None => MemoryRunStore::default(),
            };
            Ok(Arc::new(store))
        }
        _ => Err(Box::new(StoreError::Config(format!("Unsupported run store type: {}", args.store_type)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[test]
    fn filter_value_matching() {
        assert!(FilterValue::from("Morning").matches(Some(&json!("Morning"))));
        assert!(FilterValue::from("3").matches(Some(&json!(3))));
        assert!(FilterValue::from(3i64).matches(Some(&json!(3))));
        assert!(FilterValue::from(3i64).matches(Some(&json!(3.0))));
        assert!(FilterValue::from(true).matches(Some(&json!(true))));
        assert!(FilterValue::Null.matches(Some(&json!(null))));
        assert!(FilterValue::Null.matches(None));
        assert!(!FilterValue::from("x").matches(None));
        assert!(!FilterValue::from(false).matches(Some(&json!("false"))));
    }

    #[test]
    fn reserved_params() {
        assert!(is_reserved_param("select"));
        assert!(is_reserved_param("order"));
        assert!(!is_reserved_param("Best Pace"));
        assert!(!is_reserved_param("id"));
    }

    #[test]
    fn postgrest_store_requires_credentials() {
        let args = Args::try_parse_from(["pace-dashboard", "--store-type", "postgrest"]).unwrap();
        let args = Args { backend_url: None, backend_key: None, ..args };
        let err = create_run_store(&args).err().unwrap();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn rejects_unknown_store_type() {
        let args = Args::try_parse_from(["pace-dashboard", "--store-type", "mongo"]).unwrap();
        assert!(create_run_store(&args).is_err());
    }
}
