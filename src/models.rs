use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    TvShow,
}

impl ContentType {
    /// Path segment the Cinemeta catalog uses for this type
    pub fn cinemeta_kind(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::TvShow => "series",
        }
    }
}

/// Reference to a title that has not been loaded yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    /// Opaque, provider-specific locator passed back to `load_detail`
    pub url: String,
    pub poster_url: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub quality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSection {
    pub title: String,
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCatalog {
    pub provider_id: String,
    pub provider_name: String,
    pub sections: Vec<CatalogSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub provider: String,
    #[serde(flatten)]
    pub item: CatalogItem,
}

/// A final or near-final playable resource, or a subtitle track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub url: String,
    pub quality: Option<String>,
    #[serde(default)]
    pub is_stream: bool,
    pub label: Option<String>,
    pub language: Option<String>,
}

impl LinkDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn is_subtitle(&self) -> bool {
        self.quality.is_none() && (self.language.is_some() || self.label.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub season: u32,
    pub episode: u32,
    pub url: String,
    pub quality: Option<String>,
    pub title: Option<String>,
    /// Provider-private id for playlist-style providers
    pub id: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_minutes: Option<u32>,
}

/// The type-dependent half of a [`ContentDetail`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBody {
    Movie { download_links: Vec<LinkDescriptor> },
    TvShow { episodes: Vec<Episode> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDetail {
    pub title: String,
    pub poster_url: Option<String>,
    pub background_url: Option<String>,
    pub description: Option<String>,
    pub year: Option<u32>,
    pub rating: Option<f32>,
    pub genre: Vec<String>,
    pub cast: Vec<String>,
    /// Provider-private id used when links come from a playlist API
    pub stream_id: Option<String>,
    #[serde(flatten)]
    pub body: ContentBody,
}

impl ContentDetail {
    pub fn new(title: impl Into<String>, body: ContentBody) -> Self {
        Self {
            title: title.into(),
            poster_url: None,
            background_url: None,
            description: None,
            year: None,
            rating: None,
            genre: Vec::new(),
            cast: Vec::new(),
            stream_id: None,
            body,
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self.body {
            ContentBody::Movie { .. } => ContentType::Movie,
            ContentBody::TvShow { .. } => ContentType::TvShow,
        }
    }

    pub fn episodes(&self) -> &[Episode] {
        match &self.body {
            ContentBody::TvShow { episodes } => episodes,
            ContentBody::Movie { .. } => &[],
        }
    }

    pub fn download_links(&self) -> &[LinkDescriptor] {
        match &self.body {
            ContentBody::Movie { download_links } => download_links,
            ContentBody::TvShow { .. } => &[],
        }
    }

    pub fn find_episode(&self, season: u32, episode: u32) -> Option<&Episode> {
        self.episodes()
            .iter()
            .find(|e| e.season == season && e.episode == episode)
    }
}
