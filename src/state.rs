use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::cache::ResponseCache;
use crate::core::generator::{GeminiGenerator, GenerationError, TextGenerator};
use crate::core::relay::RelayContext;
use crate::core::synthesis::{MurfBackend, SynthesisBackend, SynthesisError};
use crate::core::voice::{CatalogError, VoiceCatalog};

/// Failures while building the application state at startup.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to load voice catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Failed to create text generator: {0}")]
    Generator(#[from] GenerationError),

    #[error("Failed to create synthesis backend: {0}")]
    Synthesis(#[from] SynthesisError),
}

/// Shared state handed to every handler.
pub struct AppState {
    pub config: ServerConfig,
    relay: RelayContext,
}

impl AppState {
    /// Build the state from configuration: load the voice catalog once, open
    /// the response cache and create the Gemini and Murf clients.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, StateError> {
        let catalog = VoiceCatalog::load(
            config.voice_catalog_inline.as_deref(),
            &config.voice_catalog_path,
        )?;
        info!(voices = catalog.len(), "Voice catalog loaded");

        let generator = Arc::new(GeminiGenerator::new(config.gemini_config())?);
        let backend = Arc::new(MurfBackend::new(config.murf_config())?);

        Ok(Self::with_services(config, catalog, generator, backend))
    }

    /// Build the state around caller-supplied collaborators.
    pub fn with_services(
        config: ServerConfig,
        catalog: VoiceCatalog,
        generator: Arc<dyn TextGenerator>,
        backend: Arc<dyn SynthesisBackend>,
    ) -> Arc<Self> {
        let cache = ResponseCache::new(config.cache_config());
        let relay = RelayContext {
            catalog: Arc::new(catalog),
            cache,
            generator,
            backend,
            settings: config.relay_settings(),
        };
        Arc::new(Self { config, relay })
    }

    /// Collaborators for a new relay session.
    pub fn relay_context(&self) -> RelayContext {
        self.relay.clone()
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.relay.catalog
    }
}
