//! Single entry point over every registered provider.

use futures::future::join_all;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{
    ContentDetail, Episode, LinkDescriptor, ProviderCatalog, ProviderDescriptor, SearchResult,
};
use crate::provider::{LinkReference, ProviderRegistry};

pub struct Aggregator {
    registry: ProviderRegistry,
}

impl Aggregator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        self.registry.descriptors()
    }

    /// Search one provider, or all of them concurrently when `provider_id` is
    /// `None`. Results are grouped in registration order.
    pub async fn search(
        &self,
        query: &str,
        provider_id: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let providers = match provider_id {
            Some(id) => vec![self.registry.get(id)?],
            None => self.registry.all().to_vec(),
        };

        let searches = providers.iter().map(|provider| async move {
            provider
                .search(query)
                .await
                .into_iter()
                .map(|item| SearchResult {
                    provider: provider.id().to_string(),
                    item,
                })
                .collect::<Vec<_>>()
        });

        let results: Vec<SearchResult> = join_all(searches).await.into_iter().flatten().collect();
        info!(query = %query, count = results.len(), "Search finished");
        Ok(results)
    }

    pub async fn list_catalog(&self, provider_id: &str) -> Result<ProviderCatalog> {
        let provider = self.registry.get(provider_id)?;
        let descriptor = provider.descriptor();
        Ok(ProviderCatalog {
            provider_id: descriptor.id.clone(),
            provider_name: descriptor.name.clone(),
            sections: provider.list_catalog().await,
        })
    }

    /// Every provider's catalog, one bundle per provider in registration order
    pub async fn list_all_catalogs(&self) -> Vec<ProviderCatalog> {
        let catalogs = self.registry.all().iter().map(|provider| async move {
            ProviderCatalog {
                provider_id: provider.descriptor().id.clone(),
                provider_name: provider.descriptor().name.clone(),
                sections: provider.list_catalog().await,
            }
        });
        join_all(catalogs).await
    }

    pub async fn load_detail(&self, provider_id: &str, url: &str) -> Result<Option<ContentDetail>> {
        let provider = self.registry.get(provider_id)?;
        Ok(provider.load_detail(url).await)
    }

    pub fn link_reference(
        &self,
        provider_id: &str,
        detail: &ContentDetail,
        episode: Option<&Episode>,
    ) -> Result<LinkReference> {
        let provider = self.registry.get(provider_id)?;
        Ok(provider.link_reference(detail, episode))
    }

    /// Redeem a serialized link reference with the provider that minted it.
    /// Tokens that don't decode, or that name another provider, resolve to
    /// nothing.
    pub async fn resolve_links(
        &self,
        provider_id: &str,
        serialized: &str,
    ) -> Result<Vec<LinkDescriptor>> {
        let provider = self.registry.get(provider_id)?;

        let reference = match LinkReference::decode(serialized) {
            Ok(reference) => reference,
            Err(e) => {
                warn!(provider = %provider_id, error = %e, "Undecodable link reference");
                return Ok(Vec::new());
            }
        };
        if reference.provider != provider_id {
            warn!(
                provider = %provider_id,
                minted_by = %reference.provider,
                "Link reference belongs to another provider"
            );
            return Ok(Vec::new());
        }

        let links = provider.resolve_links(&reference).await;
        let subtitles = links.iter().filter(|l| l.is_subtitle()).count();
        info!(
            provider = %provider_id,
            sources = links.len() - subtitles,
            subtitles,
            "Resolved links"
        );
        Ok(links)
    }
}
