#![forbid(unsafe_code)]

use larder_server::{
    build_router, database_path_from_url, validate_startup_config_contract, AppState, ServerConfig,
};
use larder_store::Store;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => match raw.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => true,
            "0" | "false" | "FALSE" | "no" | "NO" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("register ctrl-c");
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing(env_bool("LARDER_LOG_JSON", false));

    let config = ServerConfig {
        bind_addr: env_string("LARDER_BIND", "127.0.0.1:8080"),
        database_url: env_string("LARDER_DATABASE_URL", "larder.db"),
        admin_password: env_string("LARDER_ADMIN_PASSWORD", "admin123"),
        user_password: env_string("LARDER_USER_PASSWORD", "user123"),
        session_secret: env_string("LARDER_SESSION_SECRET", "larder-dev-session-secret"),
        session_ttl: Duration::from_secs(env_u64("LARDER_SESSION_TTL_SECS", 30 * 24 * 60 * 60)),
        max_body_bytes: env_usize("LARDER_MAX_BODY_BYTES", 16 * 1024),
    };
    validate_startup_config_contract(&config)?;

    let db_path = database_path_from_url(&config.database_url)?;
    let store = Store::new(db_path);
    store
        .init_schema()
        .map_err(|e| format!("schema init failed: {e}"))?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(store, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("larder-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))
}
