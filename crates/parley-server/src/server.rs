use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use parley_engine::ChatService;

use crate::{handlers, ui};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            body_limit_bytes: 64 * 1024,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::prompt))
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/sessions/{id}",
            get(handlers::session_history).delete(handlers::session_delete),
        )
        .route("/ui", get(ui::index))
        .route("/ui/app.js", get(ui::script))
        .route("/ui/style.css", get(ui::stylesheet))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Returns a handle to shut it down.
pub async fn start(config: ServerConfig, chat: Arc<ChatService>) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(AppState { chat }, config.body_limit_bytes);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(host = %config.host, port = local_addr.port(), "parley server started");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown_tx: Some(shutdown_tx),
        server,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.server).await {
            tracing::warn!(error = %e, "server task ended abnormally");
        }
        tracing::info!("parley server stopped");
    }
}

#[cfg(test)]
mod tests {
    use parley_engine::SessionRegistry;
    use parley_llm::MockGenerator;

    use super::*;

    fn chat_service() -> Arc<ChatService> {
        Arc::new(ChatService::new(
            Arc::new(MockGenerator::always("hi there")),
            Arc::new(SessionRegistry::new(12, 16).unwrap()),
        ))
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let handle = start(test_config(), chat_service()).await.unwrap();
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["window"], 12);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_releases_port() {
        let handle = start(test_config(), chat_service()).await.unwrap();
        let port = handle.port;
        handle.shutdown().await;

        let url = format!("http://127.0.0.1:{port}/");
        assert!(reqwest::get(&url).await.is_err());
    }

    #[test]
    fn build_router_creates_routes() {
        let _router = build_router(AppState { chat: chat_service() }, 1024);
    }
}
