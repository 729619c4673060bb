use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{ContentDetail, ContentType};

pub mod cinemeta;

pub use cinemeta::CinemetaClient;

/// Canonical metadata overlaid on scraped fields. Absent fields leave the
/// scraped value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub description: Option<String>,
    pub cast: Vec<String>,
    pub genre: Vec<String>,
    pub rating: Option<f32>,
    pub year: Option<u32>,
    pub poster_url: Option<String>,
    pub background_url: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        *self == Enrichment::default()
    }

    /// Override the matching fields of `detail`. Applying twice is the same as once.
    pub fn apply(&self, detail: &mut ContentDetail) {
        if let Some(description) = &self.description {
            detail.description = Some(description.clone());
        }
        if !self.cast.is_empty() {
            detail.cast = self.cast.clone();
        }
        if !self.genre.is_empty() {
            detail.genre = self.genre.clone();
        }
        if self.rating.is_some() {
            detail.rating = self.rating;
        }
        if self.year.is_some() {
            detail.year = self.year;
        }
        if let Some(poster) = &self.poster_url {
            detail.poster_url = Some(poster.clone());
        }
        if let Some(background) = &self.background_url {
            detail.background_url = Some(background.clone());
        }
    }
}

#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, content_type: ContentType, imdb_id: &str) -> Result<Enrichment>;
}

/// Look up enrichment for a title, treating any failure as "nothing to add"
pub async fn enrich(
    source: &dyn MetadataSource,
    content_type: ContentType,
    imdb_id: &str,
) -> Enrichment {
    match source.fetch(content_type, imdb_id).await {
        Ok(enrichment) => {
            debug!(imdb_id = %imdb_id, empty = enrichment.is_empty(), "Fetched enrichment");
            enrichment
        }
        Err(e) => {
            warn!(imdb_id = %imdb_id, error = %e, "Enrichment unavailable");
            Enrichment::default()
        }
    }
}

/// Enrich `detail` in place when the page carried an IMDb id
pub async fn enrich_detail(
    source: &dyn MetadataSource,
    imdb_id: Option<&str>,
    detail: &mut ContentDetail,
) {
    if let Some(imdb_id) = imdb_id {
        enrich(source, detail.content_type(), imdb_id)
            .await
            .apply(detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{ContentBody, LinkDescriptor};

    fn scraped() -> ContentDetail {
        let mut detail = ContentDetail::new(
            "Inception",
            ContentBody::Movie {
                download_links: vec![LinkDescriptor::new("https://drive.google.com/x")],
            },
        );
        detail.description = Some("Scraped plot".to_string());
        detail.poster_url = Some("https://site/poster.jpg".to_string());
        detail
    }

    fn payload() -> Enrichment {
        Enrichment {
            description: Some("A thief who steals corporate secrets".to_string()),
            cast: vec!["Leonardo DiCaprio".to_string()],
            genre: vec!["Action".to_string(), "Sci-Fi".to_string()],
            rating: Some(8.8),
            year: Some(2010),
            poster_url: None,
            background_url: Some("https://images.metahub.space/background/tt1375666".to_string()),
        }
    }

    #[test]
    fn test_apply_overrides_present_fields_only() {
        let mut detail = scraped();
        payload().apply(&mut detail);

        assert_eq!(
            detail.description.as_deref(),
            Some("A thief who steals corporate secrets")
        );
        assert_eq!(detail.year, Some(2010));
        assert_eq!(detail.poster_url.as_deref(), Some("https://site/poster.jpg"));
        assert!(detail.background_url.is_some());
        assert_eq!(detail.download_links().len(), 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut once = scraped();
        payload().apply(&mut once);

        let mut twice = scraped();
        payload().apply(&mut twice);
        payload().apply(&mut twice);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_enrichment_keeps_scraped_fields() {
        let mut detail = scraped();
        Enrichment::default().apply(&mut detail);
        assert_eq!(detail, scraped());
    }

    struct Failing;

    #[async_trait::async_trait]
    impl MetadataSource for Failing {
        async fn fetch(&self, _: ContentType, _: &str) -> Result<Enrichment> {
            Err(Error::Metadata("service down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_enrich_absorbs_failure() {
        let mut detail = scraped();
        enrich_detail(&Failing, Some("tt1375666"), &mut detail).await;
        assert_eq!(detail, scraped());
    }
}
