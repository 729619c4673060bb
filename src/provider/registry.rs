use std::sync::Arc;

use super::{
    BollyflixProvider, MoviesDriveProvider, MoviesModProvider, NetflixMirrorProvider, Provider,
    ProviderContext, VegaMoviesProvider,
};
use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::models::ProviderDescriptor;

/// Provider id → adapter, kept in registration order
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// The five built-in site adapters
    pub fn with_defaults(context: Arc<ProviderContext>, config: &ProvidersConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(
            BollyflixProvider::new(context.clone(), &config.bollyflix_url)
                .with_max_pages(config.bollyflix_max_pages),
        ));
        registry.register(Arc::new(NetflixMirrorProvider::new(
            context.clone(),
            &config.netflixmirror_url,
            &config.netflixmirror_image_url,
        )));
        registry.register(Arc::new(
            VegaMoviesProvider::new(context.clone(), &config.vegamovies_url)
                .with_max_pages(config.vegamovies_max_pages),
        ));
        registry.register(Arc::new(MoviesDriveProvider::new(
            context.clone(),
            &config.moviesdrive_url,
        )));
        registry.register(Arc::new(MoviesModProvider::new(context, &config.moviesmod_url)));
        registry
    }

    /// Register an adapter. A later adapter with an existing id replaces it in place.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        match self.providers.iter_mut().find(|p| p.id() == provider.id()) {
            Some(existing) => *existing = provider,
            None => self.providers.push(provider),
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound(id.to_string()))
    }

    pub fn all(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .iter()
            .map(|p| p.descriptor().clone())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
