//! Resolution of intermediate hosting pages into playable sources.

mod gdrive;
mod vcloud;

pub use gdrive::GDriveExtractor;
pub use vcloud::VCloudExtractor;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

use crate::error::Result;
use crate::http::HttpClient;
use crate::models::LinkDescriptor;

#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Host substrings this extractor is responsible for
    fn host_patterns(&self) -> &'static [&'static str];

    async fn extract(&self, url: &str) -> Result<Vec<LinkDescriptor>>;

    fn can_handle(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return false;
        };
        self.host_patterns().iter().any(|p| host.contains(p))
    }
}

/// Flat, ordered host lookup. The first extractor whose pattern matches wins.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry with the built-in HTML-scan and drive handlers
    pub fn with_defaults(http: HttpClient) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(VCloudExtractor::new(http.clone())));
        registry.register(Box::new(GDriveExtractor::new(http)));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    pub fn find(&self, url: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(url))
            .map(AsRef::as_ref)
    }

    /// Resolve one hosting URL. Unknown hosts and extractor failures yield no links.
    pub async fn resolve(&self, url: &str) -> Vec<LinkDescriptor> {
        let Some(extractor) = self.find(url) else {
            debug!(url = %url, "No extractor for URL");
            return Vec::new();
        };

        match extractor.extract(url).await {
            Ok(links) => {
                debug!(extractor = extractor.name(), count = links.len(), "Extracted links");
                links
            }
            Err(e) => {
                warn!(extractor = extractor.name(), url = %url, error = %e, "Extraction failed");
                Vec::new()
            }
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
