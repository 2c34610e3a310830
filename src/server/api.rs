use crate::chart::LineChart;
use crate::models::chat::ErrorBody;
use crate::relay::{ parse_chat_request, RelayError, WebhookClient };
use crate::runs::{ normalize, RunColumns };
use crate::server::dashboard;
use crate::store::{ is_reserved_param, FilterValue, Filters, RunStore, StoreError };
use std::collections::BTreeMap;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    body::Bytes,
    extract::{ Path, Query, State },
    response::{ Html, IntoResponse, Response },
    http::StatusCode,
};
use governor::DefaultKeyedRateLimiter;
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RunStore>,
    pub columns: Arc<RunColumns>,
    pub webhook: WebhookClient,
    /// Per-session chat quota, keyed by `sessionId`. Off unless configured.
    pub chat_limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(dashboard_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/runs", get(list_runs_handler))
        .route("/api/runs/{id}", get(get_run_handler))
        .route("/api/charts/best-pace", get(best_pace_chart_handler))
        .layer(cors)
        .with_state(state)
}

fn store_error_response(e: StoreError) -> Response {
    error!("Error fetching run data: {}", e);
    let code = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    let body = ErrorBody { error: format!("Failed to load run data: {}", e) };
    (code, Json(body)).into_response()
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(dashboard::PAGE)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

const LIMITER_RETAIN_THRESHOLD: usize = 10_000;

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_chat_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected chat request: {}", e);
            return e.into_response();
        }
    };

    if let Some(limiter) = &state.chat_limiter {
        if limiter.check_key(&request.session_id).is_err() {
            warn!("Chat rate limit exceeded for session {}. Rejecting request.", request.session_id);
            return RelayError::RateLimited.into_response();
        }
        if limiter.len() > LIMITER_RETAIN_THRESHOLD {
            limiter.retain_recent();
        }
    }

    info!("Received chat message (session: {})", request.session_id);
    match state.webhook.forward(&request).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => {
            warn!("Chat request failed: {}", e);
            e.into_response()
        }
    }
}

async fn list_runs_handler(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    if let Some(name) = params.keys().find(|k| is_reserved_param(k)) {
        warn!("Rejected reserved query parameter '{}' on /api/runs", name);
        let body = ErrorBody { error: format!("Unsupported filter column: {}", name) };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let result = if params.is_empty() {
        state.store.fetch_all().await
    } else {
        let filters: Filters = params
            .into_iter()
            .map(|(column, value)| (column, FilterValue::Text(value)))
            .collect();
        state.store.fetch_filtered(&filters).await
    };

    match result {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn get_run_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.fetch_by_id(id).await {
        Ok(row) => Json(row).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn best_pace_chart_handler(State(state): State<AppState>) -> Response {
    match state.store.fetch_all().await {
        Ok(rows) => {
            let points = normalize(Some(&rows), &state.columns);
            if points.is_empty() {
                info!("No valid best pace data in {} run records.", rows.len());
            }
            Json(LineChart::best_pace(&points)).into_response()
        }
        Err(e) => store_error_response(e),
    }
}
