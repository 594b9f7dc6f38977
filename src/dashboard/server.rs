use axum::routing::{get, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dashboard::api;
use crate::AdminEngine;

pub fn router(engine: AdminEngine) -> Router {
    let api_routes: Vec<(&str, MethodRouter<AdminEngine>)> = vec![
        ("/api/streams", get(api::active_streams).post(api::active_streams)),
        ("/api/stream_info", get(api::stream_info).post(api::stream_info)),
        ("/api/consumers", get(api::active_consumers).post(api::active_consumers)),
        ("/api/delete_stream", get(api::delete_stream).post(api::delete_stream)),
        ("/api/delete_consumer", get(api::delete_consumer).post(api::delete_consumer)),
        ("/api/read", get(api::read_message).post(api::read_message)),
        ("/api/send", get(api::send_message).post(api::send_message)),
        ("/api/health", get(api::health)),
    ];

    // Paths answer with and without a trailing slash.
    let api = api_routes
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| {
            router
                .route(path, handler.clone())
                .route(&format!("{}/", path), handler)
        })
        .layer(CompressionLayer::new());

    Router::new()
        .route("/ws", get(api::push_channel))
        .route("/ws/", get(api::push_channel))
        .merge(api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

pub async fn start_dashboard_server(
    engine: AdminEngine,
    addr: &str,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🌐 Admin API available at http://{}", listener.local_addr()?);

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
