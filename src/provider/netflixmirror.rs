//! Mirror of a subscription streaming catalog, driven through its mobile JSON API.
//!
//! Every API call carries a session token obtained by de-shortening the base URL
//! once. Details resolve to `playlist` references rather than hosting URLs.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::COOKIE;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use super::scrape::text_of;
use super::{
    LinkReference, LinkTarget, Provider, ProviderContext, descriptor, recover, resolve_sources,
};
use crate::error::{Error, Result};
use crate::models::{
    CatalogItem, CatalogSection, ContentBody, ContentDetail, ContentType, Episode,
    LinkDescriptor, ProviderDescriptor,
};

const ID: &str = "netflixmirror";

static TRAY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tray-container, #top10").unwrap());
static TRAY_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, span").unwrap());
static TRAY_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, .top10-post").unwrap());
static POST_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[data-post]").unwrap());
static TRAY_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".card-img-container img, .top10-img img").unwrap());

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "searchResult", default)]
    search_result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    t: String,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    desc: Option<String>,
    year: Option<serde_json::Value>,
    episodes: Option<Vec<Option<PostEpisode>>>,
    cast: Option<String>,
    genre: Option<String>,
    ua: Option<String>,
    #[serde(rename = "match")]
    rating: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostEpisode {
    id: String,
    t: Option<String>,
    s: Option<String>,
    ep: Option<String>,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    sources: Vec<PlaylistSource>,
    #[serde(default)]
    tracks: Vec<PlaylistTrack>,
}

#[derive(Debug, Deserialize)]
struct PlaylistSource {
    file: String,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTrack {
    kind: Option<String>,
    file: String,
    label: Option<String>,
    language: Option<String>,
}

pub struct NetflixMirrorProvider {
    ctx: Arc<ProviderContext>,
    descriptor: ProviderDescriptor,
    image_base: String,
    token: OnceCell<String>,
}

impl NetflixMirrorProvider {
    pub fn new(ctx: Arc<ProviderContext>, base_url: &str, image_base: &str) -> Self {
        Self {
            ctx,
            descriptor: descriptor(ID, "Netflix Mirror", base_url, "en"),
            image_base: image_base.trim_end_matches('/').to_string(),
            token: OnceCell::new(),
        }
    }

    /// Session token, fetched on first use and kept for the adapter's lifetime
    async fn token(&self) -> &str {
        self.token
            .get_or_init(|| self.bypass(&self.descriptor.base_url))
            .await
    }

    async fn request(&self, path_and_query: &str) -> RequestBuilder {
        let token = self.token().await;
        self.ctx
            .http
            .get(&format!("{}{}", self.descriptor.base_url, path_and_query))
            .header(COOKIE, format!("t_hash_t={}; hd=on", token))
            .header("X-Requested-With", "XMLHttpRequest")
    }

    fn poster(&self, id: &str) -> String {
        format!("{}/poster/v/{}.jpg", self.image_base, id)
    }

    async fn try_search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        let request = self
            .request(&format!(
                "/mobile/search.php?s={}&t={}",
                urlencoding::encode(query),
                timestamp()
            ))
            .await;
        let response: SearchResponse = self.ctx.http.json(request).await?;

        Ok(response
            .search_result
            .into_iter()
            .map(|hit| CatalogItem {
                poster_url: Some(self.poster(&hit.id)),
                title: hit.t,
                url: hit.id,
                content_type: ContentType::Movie,
                quality: None,
            })
            .collect())
    }

    async fn try_catalog(&self) -> Result<Vec<CatalogSection>> {
        let request = self.request("/mobile/home").await;
        let html = self.ctx.http.text(request).await?;
        Ok(parse_home(&html))
    }

    async fn try_load(&self, url: &str) -> Result<ContentDetail> {
        let id = post_id(url)?;
        let request = self
            .request(&format!("/mobile/post.php?id={}&t={}", id, timestamp()))
            .await;
        let post: Post = self.ctx.http.json(request).await?;
        Ok(self.build_detail(&id, post))
    }

    fn build_detail(&self, id: &str, post: Post) -> ContentDetail {
        let entries = post.episodes.unwrap_or_default();
        let is_movie = entries.first().is_none_or(Option::is_none);

        let body = if is_movie {
            ContentBody::Movie {
                download_links: Vec::new(),
            }
        } else {
            ContentBody::TvShow {
                episodes: entries
                    .into_iter()
                    .flatten()
                    .map(|ep| Episode {
                        season: prefixed_number(ep.s.as_deref(), 'S').unwrap_or(1),
                        episode: prefixed_number(ep.ep.as_deref(), 'E').unwrap_or(1),
                        thumbnail: Some(format!("{}/epimg/150/{}.jpg", self.image_base, ep.id)),
                        duration_minutes: ep
                            .time
                            .as_deref()
                            .and_then(|t| t.trim().trim_end_matches('m').parse().ok()),
                        title: ep.t,
                        url: ep.id.clone(),
                        id: Some(ep.id),
                        quality: None,
                    })
                    .collect(),
            }
        };

        let mut detail = ContentDetail::new(post.title, body);
        detail.poster_url = Some(self.poster(id));
        detail.background_url = Some(format!("{}/poster/h/{}.jpg", self.image_base, id));
        detail.description = post.desc.filter(|d| !d.is_empty());
        detail.year = post.year.as_ref().and_then(json_number);
        detail.rating = post
            .rating
            .as_deref()
            .and_then(|m| m.trim_start_matches("IMDb").trim().parse().ok());
        detail.cast = split_list(post.cast.as_deref());
        detail.genre = post
            .ua
            .into_iter()
            .filter(|ua| !ua.is_empty())
            .chain(split_list(post.genre.as_deref()))
            .collect();
        detail.stream_id = Some(id.to_string());
        detail
    }

    async fn try_playlist(&self, id: &str, title: &str) -> Result<Vec<LinkDescriptor>> {
        let request = self
            .request(&format!(
                "/mobile/playlist.php?id={}&t={}&tm={}",
                id,
                urlencoding::encode(title),
                timestamp()
            ))
            .await;
        let playlist: Vec<PlaylistItem> = self.ctx.http.json(request).await?;
        Ok(playlist_links(playlist))
    }
}

fn timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Catalog urls are bare post ids; `{"id": ...}` payloads are accepted as well
fn post_id(url: &str) -> Result<String> {
    let url = url.trim();
    if !url.starts_with('{') {
        return Ok(url.to_string());
    }

    let value: serde_json::Value = serde_json::from_str(url)?;
    match value.get("id") {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
        _ => Err(Error::Upstream(format!("No post id in {}", url))),
    }
}

fn json_number(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// "S2" → 2, "E10" → 10
fn prefixed_number(raw: Option<&str>, prefix: char) -> Option<u32> {
    raw?.trim().trim_start_matches(prefix).parse().ok()
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn playlist_links(playlist: Vec<PlaylistItem>) -> Vec<LinkDescriptor> {
    let mut links = Vec::new();

    for item in playlist {
        links.extend(item.sources.into_iter().map(|source| LinkDescriptor {
            is_stream: source.file.contains(".m3u8"),
            url: source.file,
            quality: source.label,
            ..Default::default()
        }));
        links.extend(
            item.tracks
                .into_iter()
                .filter(|track| track.kind.as_deref() == Some("captions"))
                .map(|track| LinkDescriptor {
                    url: track.file,
                    label: track.label,
                    language: track.language,
                    ..Default::default()
                }),
        );
    }

    links
}

fn parse_home(html: &str) -> Vec<CatalogSection> {
    let document = Html::parse_document(html);

    document
        .select(&TRAY)
        .map(|tray| {
            let items = tray
                .select(&TRAY_ITEM)
                .filter_map(|item| {
                    let id = item
                        .select(&POST_LINK)
                        .next()
                        .and_then(|a| a.attr("data-post"))
                        .or_else(|| item.attr("data-post"))
                        .filter(|id| !id.is_empty())?;
                    let image = item.select(&TRAY_IMAGE).next();

                    Some(CatalogItem {
                        title: image
                            .and_then(|img| img.attr("alt"))
                            .filter(|alt| !alt.is_empty())
                            .unwrap_or(id)
                            .to_string(),
                        url: id.to_string(),
                        poster_url: image.and_then(|img| img.attr("data-src")).map(str::to_string),
                        content_type: ContentType::Movie,
                        quality: None,
                    })
                })
                .collect();

            CatalogSection {
                title: tray.select(&TRAY_TITLE).next().map(text_of).unwrap_or_default(),
                items,
            }
        })
        .collect()
}

#[async_trait]
impl Provider for NetflixMirrorProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    async fn search(&self, query: &str) -> Vec<CatalogItem> {
        recover(ID, "search", self.try_search(query).await)
    }

    async fn list_catalog(&self) -> Vec<CatalogSection> {
        recover(ID, "list_catalog", self.try_catalog().await)
    }

    async fn load_detail(&self, url: &str) -> Option<ContentDetail> {
        recover(ID, "load_detail", self.try_load(url).await.map(Some))
    }

    async fn resolve_links(&self, reference: &LinkReference) -> Vec<LinkDescriptor> {
        match &reference.target {
            LinkTarget::Playlist { id, title } => {
                debug!(provider = ID, id = %id, "Fetching playlist");
                recover(ID, "resolve_links", self.try_playlist(id, title).await)
            }
            LinkTarget::Sources { sources } => {
                resolve_sources(&self.ctx.extractors, sources).await
            }
        }
    }

    fn link_reference(&self, detail: &ContentDetail, episode: Option<&Episode>) -> LinkReference {
        let id = episode
            .and_then(|e| e.id.as_deref())
            .or(detail.stream_id.as_deref())
            .unwrap_or_default();
        LinkReference::playlist(ID, id, &detail.title)
    }
}
