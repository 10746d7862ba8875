use axum::http::{HeaderValue, Method};
use kindred::{AppState, Config, handlers, state, utils};
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let store = state::open_store().await?;
    let notifier = state::build_notifier(store.clone(), &config);

    let app_state = AppState::new(store, notifier);
    let app = handlers::create_router(app_state).layer(create_cors_layer());

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Server running on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_cors_layer() -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // ALLOWED_ORIGINS is a comma-separated list; permissive when unset or unparseable
    let origins: Vec<HeaderValue> = std::env::var("ALLOWED_ORIGINS")
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| origin.parse().ok())
                .collect()
        })
        .unwrap_or_default();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
