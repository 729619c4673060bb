use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::scrape::{
    self, SeasonLink, classify_content_type, clean_title, image_url, parse_quality, text_of,
};
use super::{Provider, ProviderContext, SiteSection, descriptor, recover};
use crate::error::{Error, Result};
use crate::metadata::enrich_detail;
use crate::models::{
    CatalogItem, CatalogSection, ContentBody, ContentDetail, ContentType, Episode,
    LinkDescriptor, ProviderDescriptor,
};

const ID: &str = "vegamovies";

const SECTIONS: &[SiteSection] = &[
    SiteSection { path: "/page/1/", title: "Home" },
    SiteSection { path: "/web-series/netflix/page/1/", title: "Netflix" },
    SiteSection { path: "/web-series/disney-plus-hotstar/page/1/", title: "Disney Plus Hotstar" },
    SiteSection { path: "/web-series/amazon-prime-video/page/1/", title: "Amazon Prime" },
    SiteSection { path: "/web-series/mx-original/page/1/", title: "MX Original" },
    SiteSection { path: "/anime-series/page/1/", title: "Anime Series" },
    SiteSection { path: "/korean-series/page/1/", title: "Korean Series" },
];

static CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".post-inner").unwrap());
static CARD_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2 > a").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".entry-content, .entry-inner").unwrap());
static SYNOPSIS_HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3, h4").unwrap());
static FIRST_HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static BUTTON_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p > a").unwrap());
static BUTTON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("button").unwrap());

static SYNOPSIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)SYNOPSIS|PLOT").unwrap());
static RATING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Rating").unwrap());
static SERIES_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Series Name|SHOW Name").unwrap());
static QUALITY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)4K|[0-9]*0p").unwrap());
static HEADING_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:Season |S)(\d+)").unwrap());
static EPISODE_LINK_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)V-Cloud|Episode|Download|G-Direct").unwrap());
static VCLOUD_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https://vcloud\.lol/[^\s"'<>]+"#).unwrap());
static FASTDL_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://fastdl\.icu/embed\?download=[a-zA-Z0-9]+").unwrap());

pub struct VegaMoviesProvider {
    ctx: Arc<ProviderContext>,
    descriptor: ProviderDescriptor,
    max_pages: u32,
}

#[derive(Debug)]
struct DetailPage {
    title: String,
    poster_url: Option<String>,
    description: Option<String>,
    content_type: ContentType,
    imdb_id: Option<String>,
    /// Intermediate pages for a movie, with the quality their button names
    buttons: Vec<(String, Option<String>)>,
    season_links: Vec<SeasonLink>,
}

impl VegaMoviesProvider {
    pub fn new(ctx: Arc<ProviderContext>, base_url: &str) -> Self {
        Self {
            ctx,
            descriptor: descriptor(ID, "VegaMovies", base_url, "hi"),
            max_pages: 7,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// The site sits behind Cloudflare, which turns away non-browser agents
    async fn fetch(&self, url: &str) -> Result<String> {
        self.ctx.http.text(self.ctx.http.get_as_browser(url)).await
    }

    async fn try_search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        let encoded = urlencoding::encode(query);

        scrape::paginate(self.max_pages, |page| {
            let url = format!("{}/page/{}/?s={}", self.descriptor.base_url, page, encoded);
            async move {
                let html = self.fetch(&url).await?;
                Ok(parse_cards(&html, None))
            }
        })
        .await
    }

    async fn try_load(&self, url: &str) -> Result<ContentDetail> {
        let html = self.fetch(url).await?;
        let page = parse_detail(&html, url)?;

        let body = match page.content_type {
            ContentType::Movie => {
                let mut download_links = Vec::new();
                for (href, quality) in &page.buttons {
                    let Some(body) = self.fetch_intermediate(href).await else {
                        continue;
                    };
                    if let Some(found) = VCLOUD_URL.find(&body) {
                        let mut link = LinkDescriptor::new(found.as_str());
                        link.quality = quality.clone();
                        download_links.push(link);
                    }
                }
                ContentBody::Movie { download_links }
            }
            ContentType::TvShow => {
                let mut episodes = Vec::new();
                for link in &page.season_links {
                    let Some(body) = self.fetch_intermediate(&link.url).await else {
                        continue;
                    };
                    let quality = parse_quality(&link.heading);
                    episodes.extend(episode_urls(&body).into_iter().enumerate().map(
                        |(index, url)| Episode {
                            season: link.season,
                            episode: index as u32 + 1,
                            url,
                            quality: quality.clone(),
                            ..Default::default()
                        },
                    ));
                }
                ContentBody::TvShow { episodes }
            }
        };

        let mut detail = ContentDetail::new(page.title, body);
        detail.poster_url = page.poster_url;
        detail.description = page.description;

        enrich_detail(self.ctx.metadata.as_ref(), page.imdb_id.as_deref(), &mut detail).await;
        Ok(detail)
    }

    /// Link pages between the post and the file host; a dead one is skipped
    async fn fetch_intermediate(&self, url: &str) -> Option<String> {
        match self.fetch(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(provider = ID, url = %url, error = %e, "Intermediate page failed");
                None
            }
        }
    }
}

fn parse_cards(html: &str, section_type: Option<ContentType>) -> Vec<CatalogItem> {
    let document = Html::parse_document(html);

    document
        .select(&CARD)
        .filter_map(|card| {
            let title = clean_title(&text_of(card.select(&CARD_TITLE).next()?));
            let url = card.select(&ANCHOR).next()?.attr("href")?.to_string();

            Some(CatalogItem {
                content_type: section_type.unwrap_or_else(|| classify_content_type(&title, &url)),
                poster_url: card.select(&IMAGE).next().and_then(image_url),
                quality: parse_quality(&title),
                title,
                url,
            })
        })
        .collect()
}

/// Season of an episode-list heading such as "Season 2 {Hindi} 720p [350MB]".
/// Only quality headings list episodes; whole-season zip packs are skipped.
fn heading_season(text: &str) -> Option<u32> {
    if !QUALITY_HEADING.is_match(text) || text.contains("Zip") {
        return None;
    }
    Some(
        HEADING_SEASON
            .captures(text)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(1),
    )
}

/// The post body names a series in the line two elements after its first heading
fn has_series_marker(content: ElementRef) -> bool {
    content
        .select(&FIRST_HEADING)
        .next()
        .and_then(scrape::next_element)
        .and_then(scrape::next_element)
        .is_some_and(|e| SERIES_MARKER.is_match(&text_of(e)))
}

fn parse_detail(html: &str, url: &str) -> Result<DetailPage> {
    let document = Html::parse_document(html);

    let title = scrape::meta_property(&document, "og:title")
        .map(|t| clean_title(&t))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Upstream(format!("No og:title on {}", url)))?;
    let content = document.select(&CONTENT).next();

    let is_series = content.is_some_and(has_series_marker)
        || classify_content_type(&title, url) == ContentType::TvShow;
    let content_type = if is_series {
        ContentType::TvShow
    } else {
        ContentType::Movie
    };

    let description = content
        .and_then(|c| scrape::text_after_heading(c, &SYNOPSIS_HEADING, &SYNOPSIS));

    let imdb_id = content
        .and_then(|c| {
            c.select(&ANCHOR)
                .find(|a| RATING.is_match(&text_of(*a)))
                .and_then(|a| a.attr("href"))
        })
        .and_then(scrape::imdb_id);

    let buttons = match content_type {
        ContentType::Movie => document
            .select(&BUTTON_LINK)
            .filter(|a| a.select(&BUTTON).next().is_some())
            .filter_map(|a| Some((a.attr("href")?.to_string(), parse_quality(&text_of(a)))))
            .collect(),
        ContentType::TvShow => Vec::new(),
    };

    let season_links = match (content_type, content) {
        (ContentType::TvShow, Some(content)) => {
            scrape::walk_seasons(content, &ANCHOR, heading_season)
                .into_iter()
                .filter(|l| EPISODE_LINK_TEXT.is_match(&l.text))
                .collect()
        }
        _ => Vec::new(),
    };

    debug!(
        buttons = buttons.len(),
        season_links = season_links.len(),
        "Parsed vegamovies post"
    );

    Ok(DetailPage {
        title,
        poster_url: scrape::meta_property(&document, "og:image"),
        description,
        content_type,
        imdb_id,
        buttons,
        season_links,
    })
}

/// File-host URLs on an episode link page, in page order
fn episode_urls(body: &str) -> Vec<String> {
    let vcloud: Vec<String> = VCLOUD_URL
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect();
    if !vcloud.is_empty() {
        return vcloud;
    }
    FASTDL_URL
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[async_trait]
impl Provider for VegaMoviesProvider {
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
        let fetches = SECTIONS.iter().map(|section| async move {
            let url = format!("{}{}", self.descriptor.base_url, section.path);
            let items = match self.fetch(&url).await {
                Ok(html) => parse_cards(&html, Some(section.content_type())),
                Err(e) => {
                    warn!(provider = ID, section = section.title, error = %e, "Section fetch failed");
                    Vec::new()
                }
            };
            CatalogSection {
                title: section.title.to_string(),
                items,
            }
        });

        join_all(fetches).await
    }

    async fn load_detail(&self, url: &str) -> Option<ContentDetail> {
        recover(ID, "load_detail", self.try_load(url).await.map(Some))
    }
}
