use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use eshop_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level);

    // Relational store
    let db = api::db::establish_connection_from_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        api::db::setup_schema(&db)
            .await
            .context("failed to set up the schema")?;
    }
    let db = Arc::new(db);

    // Cart store (construction only; connectivity surfaces per request)
    let redis_client =
        Arc::new(redis::Client::open(cfg.redis_url.clone()).context("invalid redis url")?);

    // Event channel + consumer
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    let services =
        api::services::AppServices::new(db.clone(), event_sender.clone(), redis_client.clone(), &cfg);

    let state = Arc::new(api::AppState {
        db,
        config: cfg.clone(),
        event_sender,
        services,
        redis: redis_client,
    });

    // CORS: configured origins, credentials allowed, any method/header
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let cors_layer = if origins.is_empty() && cfg.is_development() {
        CorsLayer::permissive()
    } else {
        // Wildcards cannot be combined with credentials, so methods and
        // headers mirror the preflight request instead.
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let app = api::app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer);

    let addr = SocketAddr::new(cfg.host.parse().context("invalid host")?, cfg.port);
    info!("eshop-api listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
