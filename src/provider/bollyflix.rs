use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use futures::future::join_all;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::scrape::{
    self, SeasonLink, classify_content_type, clean_title, image_url, parse_quality, text_of,
};
use super::{Provider, ProviderContext, SiteSection, descriptor, fetch_bypass, recover};
use crate::error::{Error, Result};
use crate::metadata::enrich_detail;
use crate::models::{
    CatalogItem, CatalogSection, ContentBody, ContentDetail, ContentType, Episode,
    LinkDescriptor, ProviderDescriptor,
};

const ID: &str = "bollyflix";

const SECTIONS: &[SiteSection] = &[
    SiteSection { path: "/", title: "Home" },
    SiteSection { path: "/movies/bollywood/", title: "Bollywood Movies" },
    SiteSection { path: "/movies/hollywood/", title: "Hollywood Movies" },
    SiteSection { path: "/web-series/ongoing-series/", title: "Ongoing Series" },
    SiteSection { path: "/anime/", title: "Anime" },
];

static CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post-cards > article").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static PAGE_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static SUMMARY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span#summary").unwrap());
static DOWNLOAD_BUTTON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.dl").unwrap());
static IMDB_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.imdb_left > a").unwrap());
static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".entry-content, .thecontent").unwrap());

pub struct BollyflixProvider {
    ctx: Arc<ProviderContext>,
    descriptor: ProviderDescriptor,
    max_pages: u32,
}

/// Everything the detail page yields before any further network calls
#[derive(Debug)]
struct DetailPage {
    title: String,
    poster_url: Option<String>,
    description: Option<String>,
    content_type: ContentType,
    imdb_id: Option<String>,
    buttons: Vec<(String, Option<String>)>,
    season_links: Vec<SeasonLink>,
}

impl BollyflixProvider {
    pub fn new(ctx: Arc<ProviderContext>, base_url: &str) -> Self {
        Self {
            ctx,
            descriptor: descriptor(ID, "Bollyflix", base_url, "hi"),
            max_pages: 6,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    async fn try_search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        let http = &self.ctx.http;
        let base = &self.descriptor.base_url;
        let encoded = urlencoding::encode(query);

        scrape::paginate(self.max_pages, |page| {
            let url = format!("{}/search/{}/page/{}/", base, encoded, page);
            async move {
                let html = http.get_text(&url).await?;
                Ok(parse_cards(&html, None))
            }
        })
        .await
    }

    async fn try_load(&self, url: &str) -> Result<ContentDetail> {
        let html = self.ctx.http.get_text(url).await?;
        let page = parse_detail(&html, url)?;

        let body = match page.content_type {
            ContentType::Movie => {
                let mut download_links = Vec::new();
                for (href, quality) in &page.buttons {
                    let mut link = LinkDescriptor::new(self.bypass(href).await);
                    link.quality = quality.clone();
                    download_links.push(link);
                }
                ContentBody::Movie { download_links }
            }
            ContentType::TvShow => {
                let mut episodes = Vec::new();
                for link in &page.season_links {
                    episodes.push(Episode {
                        season: link.season,
                        episode: link.episode,
                        url: self.bypass(&link.url).await,
                        quality: parse_quality(&link.text).or_else(|| parse_quality(&link.heading)),
                        ..Default::default()
                    });
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
}

/// Result cards on search and listing pages
fn parse_cards(html: &str, section_type: Option<ContentType>) -> Vec<CatalogItem> {
    let document = Html::parse_document(html);

    document
        .select(&CARD)
        .filter_map(|card| {
            let anchor = card.select(&ANCHOR).next()?;
            let url = anchor.attr("href")?.to_string();
            let title = clean_title(anchor.attr("title").unwrap_or_default());

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

fn parse_detail(html: &str, url: &str) -> Result<DetailPage> {
    let document = Html::parse_document(html);

    let title = document
        .select(&PAGE_TITLE)
        .next()
        .map(|t| clean_title(&text_of(t)))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Upstream(format!("No title on {}", url)))?;

    let content_type = classify_content_type(&title, url);

    let buttons = document
        .select(&DOWNLOAD_BUTTON)
        .filter_map(|a| {
            let href = a.attr("href")?.to_string();
            Some((href, parse_quality(&text_of(a))))
        })
        .collect();

    let season_links = match (content_type, document.select(&CONTENT).next()) {
        (ContentType::TvShow, Some(content)) => {
            scrape::walk_seasons(content, &DOWNLOAD_BUTTON, scrape::season_number)
        }
        _ => Vec::new(),
    };

    Ok(DetailPage {
        title,
        poster_url: scrape::meta_property(&document, "og:image"),
        description: document
            .select(&SUMMARY)
            .next()
            .map(text_of)
            .filter(|s| !s.is_empty()),
        content_type,
        imdb_id: document
            .select(&IMDB_LINK)
            .next()
            .and_then(|a| a.attr("href"))
            .and_then(scrape::imdb_id),
        buttons,
        season_links,
    })
}

/// Download buttons carry the target as a base64 `id` query parameter
fn decode_link_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let id = parsed
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())?;

    let bytes = STANDARD
        .decode(&id)
        .or_else(|_| URL_SAFE_NO_PAD.decode(id.trim_end_matches('=')))
        .ok()?;
    let target = String::from_utf8(bytes).ok()?;
    target.starts_with("http").then_some(target)
}

#[async_trait]
impl Provider for BollyflixProvider {
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
            let items = match self.ctx.http.get_text(&url).await {
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

    async fn bypass(&self, url: &str) -> String {
        if let Some(target) = decode_link_id(url) {
            debug!(target = %target, "Decoded link id");
            return target;
        }
        fetch_bypass(&self.ctx.http, ID, url).await
    }
}
