#![deny(clippy::redundant_clone)]

use crate::{session, AppState};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use larder_api::{body, map_error_status, ApiError, DELETE_SUCCESS_MESSAGE};
use larder_model::Role;
use larder_store::StoreError;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{error, info};

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(raw) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return format!("trace-{trimmed}");
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

fn api_error_status(err: &ApiError) -> StatusCode {
    StatusCode::from_u16(map_error_status(err)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub(crate) fn api_error_response(err: &ApiError) -> Response {
    (api_error_status(err), Json(json!({"error": err.message}))).into_response()
}

/// Resolves the caller's role and enforces the tier the route demands.
/// Anonymous and under-privileged callers both read as 401; the API never
/// distinguishes the two.
fn authorize(state: &AppState, headers: &HeaderMap, admin_required: bool) -> Result<Role, ApiError> {
    let role = session::role_from_headers(
        headers,
        state.config.session_secret.as_bytes(),
        session::unix_now_secs(),
    )
    .ok_or_else(ApiError::unauthorized)?;
    if admin_required && !role.can_manage() {
        return Err(ApiError::unauthorized());
    }
    Ok(role)
}

fn store_error_to_api(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::not_found(),
        StoreError::InsufficientQuantity => ApiError::insufficient_quantity(),
        other => {
            error!("storage failure: {other}");
            ApiError::internal()
        }
    }
}

/// Runs a blocking store call off the async workers.
pub(crate) async fn run_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(larder_store::Store) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || op(store)).await {
        Ok(result) => result.map_err(store_error_to_api),
        Err(e) => {
            error!("store task failed: {e}");
            Err(ApiError::internal())
        }
    }
}

pub(crate) async fn finalize_response(
    state: &AppState,
    route: &str,
    started: Instant,
    request_id: &str,
    resp: Response,
) -> Response {
    state
        .metrics
        .observe_request(route, resp.status(), started.elapsed())
        .await;
    with_request_id(resp, request_id)
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    state
        .metrics
        .observe_request("/healthz", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let mut body = String::new();
    let counts = state.metrics.counts.lock().await.clone();
    let mut counts_sorted: Vec<((String, u16), u64)> = counts.into_iter().collect();
    counts_sorted.sort_by(|a, b| a.0.cmp(&b.0));
    for ((route, status), count) in counts_sorted {
        body.push_str(&format!(
            "larder_requests_total{{route=\"{route}\",status=\"{status}\"}} {count}\n"
        ));
    }
    let latency = state.metrics.latency_ns.lock().await.clone();
    let mut latency_sorted: Vec<(String, Vec<u64>)> = latency.into_iter().collect();
    latency_sorted.sort_by(|a, b| a.0.cmp(&b.0));
    for (route, vals) in latency_sorted {
        let sum_ms: f64 = vals.iter().map(|ns| *ns as f64 / 1_000_000.0).sum();
        body.push_str(&format!(
            "larder_request_latency_ms_sum{{route=\"{route}\"}} {sum_ms:.3}\n"
        ));
        body.push_str(&format!(
            "larder_request_latency_ms_count{{route=\"{route}\"}} {}\n",
            vals.len()
        ));
    }
    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn list_raw_materials_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/raw-materials";
    if let Err(err) = authorize(&state, &headers, false) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let resp = match run_store(&state, |store| store.list_raw_materials()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn create_raw_material_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/raw-materials";
    if let Err(err) = authorize(&state, &headers, true) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let parsed = body::parse_json_object(&payload).and_then(|v| body::parse_new_raw_material(&v));
    let new = match parsed {
        Ok(new) => new,
        Err(err) => {
            let resp = api_error_response(&err);
            return finalize_response(&state, route, started, &request_id, resp).await;
        }
    };
    let resp = match run_store(&state, move |store| store.create_raw_material(&new)).await {
        Ok(row) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = row.id,
                "raw material created"
            );
            (StatusCode::CREATED, Json(row)).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn adjust_raw_material_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    payload: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/raw-materials/:id/adjust";
    info!(request_id = %request_id, route = "/api/raw-materials/:id/adjust", "request start");
    if let Err(err) = authorize(&state, &headers, false) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let parsed = body::parse_json_object(&payload).and_then(|v| body::parse_raw_adjustment(&v));
    let delta = match parsed {
        Ok(delta) => delta,
        Err(err) => {
            let resp = api_error_response(&err);
            return finalize_response(&state, route, started, &request_id, resp).await;
        }
    };
    let resp = match run_store(&state, move |store| store.adjust_raw_material(id, delta)).await {
        Ok(row) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = id,
                delta = delta,
                "raw material adjusted"
            );
            Json(row).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn replace_raw_material_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    payload: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/raw-materials/:id";
    if let Err(err) = authorize(&state, &headers, false) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let parsed = body::parse_json_object(&payload).and_then(|v| body::parse_raw_replacement(&v));
    let quantity = match parsed {
        Ok(quantity) => quantity,
        Err(err) => {
            let resp = api_error_response(&err);
            return finalize_response(&state, route, started, &request_id, resp).await;
        }
    };
    let resp = match run_store(&state, move |store| {
        store.replace_raw_material_quantity(id, quantity)
    })
    .await
    {
        Ok(row) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = id,
                quantity = quantity.value(),
                "raw material quantity replaced"
            );
            Json(row).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn delete_raw_material_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/raw-materials/:id";
    if let Err(err) = authorize(&state, &headers, true) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let resp = match run_store(&state, move |store| store.delete_raw_material(id)).await {
        Ok(()) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = id,
                "raw material deleted"
            );
            Json(json!({"message": DELETE_SUCCESS_MESSAGE})).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn list_food_items_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/food-items";
    if let Err(err) = authorize(&state, &headers, false) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let resp = match run_store(&state, |store| store.list_food_items()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn create_food_item_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/food-items";
    if let Err(err) = authorize(&state, &headers, true) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let parsed = body::parse_json_object(&payload).and_then(|v| body::parse_new_food_item(&v));
    let new = match parsed {
        Ok(new) => new,
        Err(err) => {
            let resp = api_error_response(&err);
            return finalize_response(&state, route, started, &request_id, resp).await;
        }
    };
    let resp = match run_store(&state, move |store| store.create_food_item(&new)).await {
        Ok(row) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = row.id,
                "food item created"
            );
            (StatusCode::CREATED, Json(row)).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn adjust_food_item_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    payload: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/food-items/:id/adjust";
    info!(request_id = %request_id, route = "/api/food-items/:id/adjust", "request start");
    if let Err(err) = authorize(&state, &headers, false) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let parsed = body::parse_json_object(&payload).and_then(|v| body::parse_food_adjustment(&v));
    let delta = match parsed {
        Ok(delta) => delta,
        Err(err) => {
            let resp = api_error_response(&err);
            return finalize_response(&state, route, started, &request_id, resp).await;
        }
    };
    let resp = match run_store(&state, move |store| store.adjust_food_item(id, delta)).await {
        Ok(row) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = id,
                delta = delta,
                "food item adjusted"
            );
            Json(row).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn replace_food_item_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    payload: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/food-items/:id";
    if let Err(err) = authorize(&state, &headers, false) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let parsed = body::parse_json_object(&payload).and_then(|v| body::parse_food_replacement(&v));
    let quantity = match parsed {
        Ok(quantity) => quantity,
        Err(err) => {
            let resp = api_error_response(&err);
            return finalize_response(&state, route, started, &request_id, resp).await;
        }
    };
    let resp = match run_store(&state, move |store| {
        store.replace_food_item_quantity(id, quantity)
    })
    .await
    {
        Ok(row) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = id,
                quantity = quantity.value(),
                "food item quantity replaced"
            );
            Json(row).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}

pub(crate) async fn delete_food_item_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/food-items/:id";
    if let Err(err) = authorize(&state, &headers, true) {
        let resp = api_error_response(&err);
        return finalize_response(&state, route, started, &request_id, resp).await;
    }
    let resp = match run_store(&state, move |store| store.delete_food_item(id)).await {
        Ok(()) => {
            info!(
                target: "larder_audit",
                request_id = %request_id,
                id = id,
                "food item deleted"
            );
            Json(json!({"message": DELETE_SUCCESS_MESSAGE})).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    finalize_response(&state, route, started, &request_id, resp).await
}
