#![forbid(unsafe_code)]

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use larder_store::Store;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

mod config;
mod http;
mod session;

pub use config::{database_path_from_url, validate_startup_config_contract, ServerConfig};

pub const CRATE_NAME: &str = "larder-server";

#[derive(Default)]
struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(latency.as_nanos() as u64);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: ServerConfig,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store, config: ServerConfig) -> Self {
        Self {
            store,
            config,
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::pages::landing_handler))
        .route(
            "/login",
            get(http::pages::login_form_handler).post(http::pages::login_submit_handler),
        )
        .route("/logout", get(http::pages::logout_handler))
        .route("/dashboard", get(http::pages::dashboard_handler))
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route(
            "/api/raw-materials",
            get(http::handlers::list_raw_materials_handler)
                .post(http::handlers::create_raw_material_handler),
        )
        .route(
            "/api/raw-materials/:id",
            put(http::handlers::replace_raw_material_handler)
                .delete(http::handlers::delete_raw_material_handler),
        )
        .route(
            "/api/raw-materials/:id/adjust",
            post(http::handlers::adjust_raw_material_handler),
        )
        .route(
            "/api/food-items",
            get(http::handlers::list_food_items_handler)
                .post(http::handlers::create_food_item_handler),
        )
        .route(
            "/api/food-items/:id",
            put(http::handlers::replace_food_item_handler)
                .delete(http::handlers::delete_food_item_handler),
        )
        .route(
            "/api/food-items/:id/adjust",
            post(http::handlers::adjust_food_item_handler),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
