//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::info;

use crate::auth::{Authenticator, SharedSecretAuthenticator};
use crate::config::Config;
use crate::file::{FileService, FileStorage, LocalFileStorage};

/// Template for the browser UI, embedded at build time.
const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Immutable configuration resolved at startup.
    config: Arc<Config>,

    /// Upload pipeline over the storage backend.
    files: FileService,

    /// Credential check for write endpoints.
    authenticator: Arc<dyn Authenticator>,

    /// Templates for server-rendered pages.
    templates: Tera,
}

impl AppState {
    /// Create application state backed by the local upload directory.
    ///
    /// Creates the upload directory if it does not exist yet.
    pub async fn new(config: &Config) -> Result<Self> {
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(&config.upload_dir));
        let authenticator: Arc<dyn Authenticator> = Arc::new(SharedSecretAuthenticator::new(
            config.upload_secret.clone(),
        ));

        Self::from_parts(config.clone(), storage, authenticator).await
    }

    /// Create application state from explicit components.
    pub async fn from_parts(
        config: Config,
        storage: Arc<dyn FileStorage>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let files = FileService::new(config.clone(), storage);
        files
            .prepare()
            .await
            .context("failed to prepare upload storage")?;
        info!(path = ?config.upload_dir, "Upload directory ready");

        let mut templates = Tera::default();
        templates
            .add_raw_template("index.html", INDEX_TEMPLATE)
            .context("failed to load index template")?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                files,
                authenticator,
                templates,
            }),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the file service.
    pub fn files(&self) -> &FileService {
        &self.inner.files
    }

    /// Get the authenticator guarding write endpoints.
    pub fn authenticator(&self) -> &dyn Authenticator {
        self.inner.authenticator.as_ref()
    }

    /// Get the template engine.
    pub fn templates(&self) -> &Tera {
        &self.inner.templates
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("upload_dir", &self.inner.config.upload_dir)
            .field("files", &self.inner.files)
            .finish()
    }
}
