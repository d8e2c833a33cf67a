//! Router assembly and the server loop

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{self, SharedState};
use super::types::ErrorResponse;
use crate::config::{Endpoint, ServerSettings};

/// Build the router: health routes always, inference routes when enabled
pub fn router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::root))
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health));

    for endpoint in state.endpoints.iter() {
        tracing::debug!(endpoint = %endpoint, route = endpoint.route(), "Mounting endpoint");
        app = match endpoint {
            Endpoint::TextSummarization => app.route(endpoint.route(), post(handlers::summarize)),
            Endpoint::Inference => app.route(endpoint.route(), post(handlers::infer)),
        };
    }

    app.fallback(|| async {
        (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not Found"))).into_response()
    })
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM
pub async fn start_server(settings: &ServerSettings, state: SharedState) -> anyhow::Result<()> {
    let address = settings.bind_address();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", address, e);
            return Err(anyhow::anyhow!("Failed to bind to address {}: {}", address, e));
        }
    };
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    serve(listener, state, shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
