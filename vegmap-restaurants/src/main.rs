use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use vegmap_restaurants::config::AppConfig;
use vegmap_restaurants::AppState;
use vegmap_shared::clients::db::create_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vegmap_shared::middleware::init_tracing("vegmap-restaurants");

    let config = AppConfig::load()?;
    let port = config.port;

    // The shared auth extractor reads the secret from the environment.
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let metrics_handle = vegmap_shared::middleware::init_metrics()?;
    let allowed_origin = HeaderValue::from_str(&config.allowed_origin)?;

    let state = Arc::new(AppState {
        db,
        config,
        metrics_handle: Some(metrics_handle),
    });

    let app = vegmap_restaurants::router(state).layer(
        CorsLayer::new()
            .allow_origin(allowed_origin)
            .allow_methods(AllowMethods::list([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ]))
            .allow_headers(AllowHeaders::list([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
            ]))
            .allow_credentials(true),
    );

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "vegmap-restaurants starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
