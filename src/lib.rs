//! Caption AI: upload an image, get social-media captions and hashtags.
//!
//! Routes:
//! - `GET  /`         - UI shell
//! - `GET  /has-key`  - whether a provider API key is configured
//! - `POST /save-key` - validate and persist a provider API key
//! - `POST /generate` - multipart image upload, returns `{captions, hashtags}`

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;

pub mod api;
pub mod captions;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod provider;
pub mod telemetry;
pub mod validator;

pub use config::Config;

use captions::CaptionSettings;
use credentials::CredentialStore;
use provider::ProviderClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single active API key, scoped to the server's lifetime
    pub credentials: Arc<CredentialStore>,
    pub provider: ProviderClient,
    pub captions: Arc<CaptionSettings>,
}

impl AppState {
    pub fn new(config: &Config, credentials: CredentialStore) -> Self {
        Self {
            credentials: Arc::new(credentials),
            provider: ProviderClient::new(&config.provider_base_url, config.provider_timeout()),
            captions: Arc::new(CaptionSettings {
                model: config.model.clone(),
                verify_image_bytes: config.verify_image_bytes,
            }),
        }
    }
}

pub fn build_router(config: &Config, state: AppState) -> Router {
    api::build_router(state, config.max_upload_bytes)
}

pub struct Application {
    config: Config,
    router: Router,
}

impl Application {
    pub fn new(config: Config) -> Self {
        let credentials = CredentialStore::open(&config.key_file);
        let state = AppState::new(&config, credentials);
        let router = build_router(&config, state);
        Self { config, router }
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.listen_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;

        tracing::info!("Server running on http://{}", addr);
        tracing::info!("Model: {}", self.config.model);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("server error")?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
