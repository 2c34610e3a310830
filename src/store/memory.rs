use super::{ Filters, RunStore, StoreError };
use crate::models::run::RawRunRecord;
use async_trait::async_trait;
use std::fs;

/// Run records held in process, optionally loaded from a JSON array file.
#[derive(Debug, Default, Clone)]
pub struct MemoryRunStore {
    records: Vec<RawRunRecord>,
}

impl MemoryRunStore {
    pub fn new(records: Vec<RawRunRecord>) -> Self {
        Self { records }
    }

    pub fn from_file(path: &str) -> Result<Self, StoreError> {
        let json_str = fs::read_to_string(path)?;
        let records: Vec<RawRunRecord> = serde_json::from_str(&json_str)
            .map_err(|e| StoreError::Decode(format!("fixture '{}' is not a JSON array: {}", path, e)))?;
        Ok(Self::new(records))
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn fetch_all(&self) -> Result<Vec<RawRunRecord>, StoreError> {
        Ok(self.records.clone())
    }

    async fn fetch_by_id(&self, id: i64) -> Result<RawRunRecord, StoreError> {
        let mut hits = self.records
            .iter()
            .filter(|r| r.get("id").and_then(|v| v.as_i64()) == Some(id));
        match (hits.next(), hits.next()) {
            (Some(record), None) => Ok(record.clone()),
            (None, _) => Err(StoreError::NotFound(id)),
            (Some(_), Some(_)) => Err(StoreError::Ambiguous(id)),
        }
    }

    async fn fetch_filtered(&self, filters: &Filters) -> Result<Vec<RawRunRecord>, StoreError> {
        Ok(
            self.records
                .iter()
                .filter(|r| filters.iter().all(|(column, value)| value.matches(r.get(column))))
                .cloned()
                .collect()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FilterValue;
    use serde_json::json;

    fn store() -> MemoryRunStore {
        MemoryRunStore::new(vec![
            json!({ "id": 1, "Date": "2024-01-05", "Best Pace": "06:10", "Type": "Easy" }),
            json!({ "id": 2, "Date": "2024-01-07", "Best Pace": "05:40", "Type": "Tempo" }),
            json!({ "id": 3, "Date": "2024-01-09", "Best Pace": "06:05", "Type": "Easy" }),
        ])
    }

    #[tokio::test]
    async fn fetches_by_id() {
        let store = store();
        assert_eq!(store.fetch_by_id(2).await.unwrap()["Best Pace"], "05:40");
        assert!(matches!(store.fetch_by_id(9).await, Err(StoreError::NotFound(9))));
    }

    #[tokio::test]
    async fn filters_are_anded() {
        let store = store();
        let mut filters = Filters::new();
        filters.insert("Type".into(), FilterValue::from("Easy"));
        assert_eq!(store.fetch_filtered(&filters).await.unwrap().len(), 2);

        filters.insert("id".into(), FilterValue::from("3"));
        let rows = store.fetch_filtered(&filters).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 3);

        assert_eq!(store.fetch_filtered(&Filters::new()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn duplicate_ids_are_ambiguous() {
        let store = MemoryRunStore::new(vec![json!({ "id": 1 }), json!({ "id": 1 })]);
        assert!(matches!(store.fetch_by_id(1).await, Err(StoreError::Ambiguous(1))));
    }

    #[tokio::test]
    async fn loads_sample_fixture() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/json/sample_runs.json");
        let store = MemoryRunStore::from_file(path).unwrap();
        assert_eq!(store.fetch_all().await.unwrap().len(), 5);
    }

    #[test]
    fn missing_fixture_is_an_error() {
        assert!(matches!(
            MemoryRunStore::from_file("/nonexistent/runs.json"),
            Err(StoreError::Io(_))
        ));
    }
}
