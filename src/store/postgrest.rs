use super::{ FilterValue, Filters, RunStore, StoreError };
use crate::models::run::RawRunRecord;
use async_trait::async_trait;
use log::error;
use reqwest::header::{ HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION };
use reqwest::Client as HttpClient;
use std::time::Duration;
use url::Url;

/// Reads the runs table through the backend's PostgREST endpoint (`/rest/v1/<table>`).
pub struct PostgrestRunStore {
    http: HttpClient,
    table_url: Url,
    table: String,
}

impl PostgrestRunStore {
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        timeout: Duration
    ) -> Result<Self, StoreError> {
        let mut table_url = Url::parse(base_url)
            .map_err(|e| StoreError::Config(format!("invalid backend URL '{}': {}", base_url, e)))?;
        table_url
            .path_segments_mut()
            .map_err(|_| StoreError::Config(format!("backend URL '{}' cannot be a base", base_url)))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);

        let key = HeaderValue::from_str(api_key)
            .map_err(|_| StoreError::Config("backend key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| StoreError::Config("backend key is not a valid header value".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, table_url, table: table.to_string() })
    }

    fn query_url(&self, filters: &Filters) -> Url {
        let mut url = self.table_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (column, value) in filters {
                let operand = match value {
                    FilterValue::Null => "is.null".to_string(),
                    other => format!("eq.{}", other),
                };
                pairs.append_pair(column, &operand);
            }
        }
        url
    }

    async fn select(&self, filters: &Filters) -> Result<Vec<RawRunRecord>, StoreError> {
        let resp = self.http.get(self.query_url(filters)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Query on '{}' failed with status {}: {}", self.table, status, body);
            return Err(StoreError::Status { status: status.as_u16(), body });
        }

        resp.json::<Vec<RawRunRecord>>().await
            .map_err(|e| StoreError::Decode(format!("expected a JSON array of rows: {}", e)))
    }
}

#[async_trait]
impl RunStore for PostgrestRunStore {
    async fn fetch_all(&self) -> Result<Vec<RawRunRecord>, StoreError> {
        self.select(&Filters::new()).await
    }

    async fn fetch_by_id(&self, id: i64) -> Result<RawRunRecord, StoreError> {
        let mut filters = Filters::new();
        filters.insert("id".to_string(), FilterValue::Int(id));
        let mut rows = self.select(&filters).await?;
        match rows.len() {
            0 => Err(StoreError::NotFound(id)),
            1 => Ok(rows.remove(0)),
            _ => Err(StoreError::Ambiguous(id)),
        }
    }

    async fn fetch_filtered(&self, filters: &Filters) -> Result<Vec<RawRunRecord>, StoreError> {
        self.select(filters).await
    }
}
