//! Backend proxy server
//!
//! Holds the news and transcription provider keys so clients never see them.
//! Exposes `/news`, `/upload` and `/transcript` in the shape the news and
//! transcription clients expect.

mod auth;
mod error;
pub mod health;
pub mod news;
pub mod transcript;

pub use error::ProxyError;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::ServerConfig;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for proxy handlers
#[derive(Clone)]
pub struct ApiState {
    pub client: reqwest::Client,
    pub news_upstream: String,
    pub transcription_upstream: String,
    pub news_api_key: Option<SecretString>,
    pub transcription_api_key: Option<SecretString>,
    pub access_token: Option<SecretString>,
}

impl ApiState {
    /// Build handler state from server configuration
    ///
    /// # Errors
    ///
    /// Returns error if the upstream HTTP client cannot be built
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            news_upstream: config.news_upstream.clone(),
            transcription_upstream: config.transcription_upstream.trim_end_matches('/').to_string(),
            news_api_key: config.news_api_key.clone(),
            transcription_api_key: config.transcription_api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("news_upstream", &self.news_upstream)
            .field("transcription_upstream", &self.transcription_upstream)
            .field("news_api_key", &self.news_api_key.is_some())
            .field("transcription_api_key", &self.transcription_api_key.is_some())
            .field("access_token", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Backend proxy server
#[derive(Debug)]
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Create a server from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the upstream HTTP client cannot be built
    pub fn new(config: &ServerConfig) -> Result<Self> {
        Ok(Self::with_state(
            ApiState::from_config(config)?,
            config.host.clone(),
            config.port,
        ))
    }

    /// Create a server around prepared state
    #[must_use]
    pub fn with_state(state: ApiState, host: String, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            host,
            port,
        }
    }

    /// Build the router with all routes and layers
    #[must_use]
    pub fn router(&self) -> Router {
        let transcription = transcript::router(Arc::clone(&self.state)).layer(
            middleware::from_fn_with_state(Arc::clone(&self.state), auth::require_access_token),
        );

        let router = Router::new()
            .merge(health::router())
            .merge(news::router(Arc::clone(&self.state)))
            .merge(transcription);

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the server until it fails
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Server(format!("failed to bind {addr}: {e}")))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener
    ///
    /// # Errors
    ///
    /// Returns error if the server fails
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "proxy server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Server(format!("proxy server error: {e}")))
    }

    /// Run the server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
