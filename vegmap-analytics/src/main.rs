use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use vegmap_analytics::config::AppConfig;
use vegmap_analytics::store::PgActivityStore;
use vegmap_analytics::AppState;
use vegmap_shared::clients::db::create_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vegmap_shared::middleware::init_tracing("vegmap-analytics");

    let config = AppConfig::load()?;
    let port = config.port;

    // The shared auth extractor reads the secret from the environment.
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let pool = create_pool(&config.database_url, config.db_pool_size)?;
    let metrics_handle = vegmap_shared::middleware::init_metrics()?;
    vegmap_analytics::services::recorder::describe_metrics();

    let state = Arc::new(AppState {
        store: Arc::new(PgActivityStore::new(pool)),
        config,
        metrics_handle: Some(metrics_handle),
    });

    let app = vegmap_analytics::router(state).layer(
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ])
            .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
            .allow_headers(AllowHeaders::list([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
            ]))
            .allow_credentials(true),
    );

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "vegmap-analytics starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
