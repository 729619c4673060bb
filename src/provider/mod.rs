//! Site adapters and the capability interface they share.

mod bollyflix;
mod moviesdrive;
mod moviesmod;
mod netflixmirror;
mod reference;
mod registry;
pub mod scrape;
mod vegamovies;

pub use bollyflix::BollyflixProvider;
pub use moviesdrive::MoviesDriveProvider;
pub use moviesmod::MoviesModProvider;
pub use netflixmirror::NetflixMirrorProvider;
pub use reference::{LinkReference, LinkTarget, SourceRef};
pub use registry::ProviderRegistry;
pub use vegamovies::VegaMoviesProvider;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::extractor::ExtractorRegistry;
use crate::http::HttpClient;
use crate::metadata::MetadataSource;
use crate::models::{
    CatalogItem, CatalogSection, ContentDetail, ContentType, Episode, LinkDescriptor,
    ProviderDescriptor,
};

/// Collaborators every adapter resolves through
pub struct ProviderContext {
    pub http: HttpClient,
    pub extractors: Arc<ExtractorRegistry>,
    pub metadata: Arc<dyn MetadataSource>,
}

/// A home-page section: path relative to the provider base URL and its label
#[derive(Debug, Clone, Copy)]
pub struct SiteSection {
    pub path: &'static str,
    pub title: &'static str,
}

impl SiteSection {
    /// Items listed under series/show paths are shows
    pub fn content_type(&self) -> ContentType {
        if self.path.contains("series") || self.path.contains("shows") {
            ContentType::TvShow
        } else {
            ContentType::Movie
        }
    }
}

/// Capability interface implemented by every content site adapter.
///
/// Every operation fails soft: upstream errors are logged and turned into an
/// empty or absent result so one broken site never aborts an aggregate call.
#[async_trait]
pub trait Provider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    fn context(&self) -> &ProviderContext;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    async fn search(&self, query: &str) -> Vec<CatalogItem>;

    /// Home-page sections in the site's own navigation order
    async fn list_catalog(&self) -> Vec<CatalogSection>;

    /// `None` means the title could not be resolved, not that it doesn't exist
    async fn load_detail(&self, url: &str) -> Option<ContentDetail>;

    /// Resolve every candidate URL of a `sources` reference through the
    /// extractor registry, concatenating the results in order.
    async fn resolve_links(&self, reference: &LinkReference) -> Vec<LinkDescriptor> {
        let LinkTarget::Sources { sources } = &reference.target else {
            debug!(provider = self.id(), "Playlist references need a provider override");
            return Vec::new();
        };
        resolve_sources(&self.context().extractors, sources).await
    }

    /// Mint the token `resolve_links` accepts for a whole title or one episode
    fn link_reference(&self, detail: &ContentDetail, episode: Option<&Episode>) -> LinkReference {
        let sources = match episode {
            Some(episode) => vec![SourceRef {
                url: episode.url.clone(),
                quality: episode.quality.clone(),
            }],
            None => detail
                .download_links()
                .iter()
                .map(|l| SourceRef {
                    url: l.url.clone(),
                    quality: l.quality.clone(),
                })
                .chain(detail.episodes().iter().map(|e| SourceRef {
                    url: e.url.clone(),
                    quality: e.quality.clone(),
                }))
                .collect(),
        };
        LinkReference::sources(self.id(), sources)
    }

    /// Single-hop de-shortening: fetch the URL and take the body as the target,
    /// whatever the status. Falls back to the input URL when the request fails.
    async fn bypass(&self, url: &str) -> String {
        fetch_bypass(&self.context().http, self.id(), url).await
    }
}

pub(crate) async fn resolve_sources(
    extractors: &ExtractorRegistry,
    sources: &[SourceRef],
) -> Vec<LinkDescriptor> {
    let mut links = Vec::new();
    for source in sources {
        links.extend(extractors.resolve(&source.url).await);
    }
    links
}

pub(crate) async fn fetch_bypass(http: &HttpClient, provider: &str, url: &str) -> String {
    match http.text_any_status(url).await {
        Ok(body) => body.trim().to_string(),
        Err(e) => {
            warn!(provider = %provider, url = %url, error = %e, "Bypass failed");
            url.to_string()
        }
    }
}

/// Absorb an adapter-internal failure at the trait boundary
pub(crate) fn recover<T: Default>(provider: &str, operation: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(provider = %provider, operation = %operation, error = %e, "Provider call failed");
            T::default()
        }
    }
}

pub(crate) fn descriptor(id: &str, name: &str, base_url: &str, language: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        base_url: base_url.trim_end_matches('/').to_string(),
        language: language.to_string(),
    }
}
