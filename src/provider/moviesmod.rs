use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::scrape::{self, classify_content_type, image_url, quality_or_default, text_of};
use super::{Provider, ProviderContext, SiteSection, descriptor, recover};
use crate::error::{Error, Result};
use crate::metadata::enrich_detail;
use crate::models::{
    CatalogItem, CatalogSection, ContentBody, ContentDetail, ContentType, Episode,
    LinkDescriptor, ProviderDescriptor,
};

const ID: &str = "moviesmod";

const SECTIONS: &[SiteSection] = &[
    SiteSection { path: "/", title: "Latest Updates" },
    SiteSection { path: "/category/web-series/", title: "Web Series" },
    SiteSection { path: "/category/movies/", title: "Movies" },
    SiteSection { path: "/category/tv-shows/", title: "TV Shows" },
];

static CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article.post").unwrap());
static CARD_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".entry-title a").unwrap());
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static ENTRY_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".entry-title").unwrap());
static CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".entry-content").unwrap());
static CONTENT_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".entry-content img").unwrap());
static PLOT_HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4").unwrap());
static QUALITY_HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3, h4, h5").unwrap());
static IMDB_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="imdb.com"]"#).unwrap());
static FILE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="gdtot"], a[href*="filepress"], a[href*="drive.google"]"#).unwrap()
});

static PLOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)storyline|plot|synopsis").unwrap());

pub struct MoviesModProvider {
    ctx: Arc<ProviderContext>,
    descriptor: ProviderDescriptor,
}

impl MoviesModProvider {
    pub fn new(ctx: Arc<ProviderContext>, base_url: &str) -> Self {
        Self {
            ctx,
            descriptor: descriptor(ID, "Moviesmod", base_url, "hi"),
        }
    }

    async fn try_search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        let url = format!(
            "{}/?s={}",
            self.descriptor.base_url,
            urlencoding::encode(query)
        );
        let html = self.ctx.http.get_text(&url).await?;
        Ok(parse_cards(&html, None))
    }

    async fn try_load(&self, url: &str) -> Result<ContentDetail> {
        let html = self.ctx.http.get_text(url).await?;
        let (mut detail, imdb_id) = parse_detail(&html, url)?;

        enrich_detail(self.ctx.metadata.as_ref(), imdb_id.as_deref(), &mut detail).await;
        Ok(detail)
    }
}

fn parse_cards(html: &str, section_type: Option<ContentType>) -> Vec<CatalogItem> {
    let document = Html::parse_document(html);

    document
        .select(&CARD)
        .filter_map(|card| {
            let anchor = card.select(&CARD_LINK).next()?;
            let title = text_of(anchor);
            let url = anchor.attr("href")?.to_string();
            if title.is_empty() {
                return None;
            }

            Some(CatalogItem {
                content_type: section_type.unwrap_or_else(|| classify_content_type(&title, "")),
                poster_url: card.select(&IMAGE).next().and_then(image_url),
                quality: scrape::parse_quality(&title),
                title,
                url,
            })
        })
        .collect()
}

/// Links under each quality heading, up to the next heading
fn quality_links(content: ElementRef) -> Vec<LinkDescriptor> {
    let mut links = Vec::new();

    for heading in content.select(&QUALITY_HEADING) {
        let Some(quality) = scrape::parse_quality(&text_of(heading)) else {
            continue;
        };

        let mut sibling = scrape::next_element(heading);
        while let Some(node) = sibling {
            if QUALITY_HEADING.matches(&node) {
                break;
            }
            links.extend(
                node.select(&FILE_LINK)
                    .filter_map(|a| a.attr("href"))
                    .map(|href| LinkDescriptor::new(href).with_quality(quality.clone())),
            );
            sibling = scrape::next_element(node);
        }
    }

    links
}

fn parse_detail(html: &str, url: &str) -> Result<(ContentDetail, Option<String>)> {
    let document = Html::parse_document(html);

    let title = document
        .select(&ENTRY_TITLE)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Upstream(format!("No entry title on {}", url)))?;
    let content = document
        .select(&CONTENT)
        .next()
        .ok_or_else(|| Error::Upstream(format!("No entry content on {}", url)))?;

    let body = match classify_content_type(&title, "") {
        ContentType::Movie => ContentBody::Movie {
            download_links: quality_links(content),
        },
        ContentType::TvShow => ContentBody::TvShow {
            episodes: scrape::walk_seasons(content, &FILE_LINK, scrape::season_number)
                .into_iter()
                .map(|link| Episode {
                    season: link.season,
                    episode: link.episode,
                    quality: Some(quality_or_default(&format!("{} {}", link.text, link.heading))),
                    url: link.url,
                    ..Default::default()
                })
                .collect(),
        },
    };

    let mut detail = ContentDetail::new(title, body);
    detail.poster_url = document.select(&CONTENT_IMAGE).next().and_then(image_url);
    detail.description =
        scrape::text_after_heading(document.root_element(), &PLOT_HEADING, &PLOT);

    let imdb_id = document
        .select(&IMDB_LINK)
        .next()
        .and_then(|a| a.attr("href"))
        .and_then(scrape::imdb_id);

    Ok((detail, imdb_id))
}

#[async_trait]
impl Provider for MoviesModProvider {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_cards_skips_untitled() {
        let html = r#"
            <article class="post"><h2 class="entry-title"><a href="https://moviesmod.net/inception/">Inception (2010) 1080p</a></h2><img src="https://img/i.jpg"></article>
            <article class="post"><h2 class="entry-title"><a href="https://moviesmod.net/loki/">Loki Season 2 Web Series</a></h2></article>
            <article class="post"><h2 class="entry-title"><a href="https://moviesmod.net/blank/"></a></h2></article>
        "#;
        let items = parse_cards(html, None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content_type, ContentType::Movie);
        assert_eq!(items[1].content_type, ContentType::TvShow);
        assert_eq!(items[1].poster_url, None);
    }

    #[test]
    fn test_movie_links_grouped_by_quality_heading() {
        let html = r#"<html><body>
            <h1 class="entry-title">Inception (2010)</h1>
            <div class="entry-content">
              <img src="https://img/inception.jpg">
              <h3>Storyline:</h3>
              <p>Dom Cobb is a skilled thief.</p>
              <p><a href="https://www.imdb.com/title/tt1375666/">IMDb</a></p>
              <h4>720p [1.1GB]</h4>
              <p><a href="https://new.gdtot.dad/file/1">GDToT</a></p>
              <p><a href="https://new.filepress.store/file/2">FilePress</a></p>
              <h4>1080p [2.4GB]</h4>
              <p><a href="https://drive.google.com/file/d/3">Drive</a> <a href="https://t.me/channel">Telegram</a></p>
            </div>
          </body></html>"#;

        let (detail, imdb_id) = parse_detail(html, "https://moviesmod.net/inception/").unwrap();
        assert_eq!(imdb_id.as_deref(), Some("tt1375666"));
        assert_eq!(detail.description.as_deref(), Some("Dom Cobb is a skilled thief."));
        assert_eq!(detail.poster_url.as_deref(), Some("https://img/inception.jpg"));

        let links = detail.download_links();
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].quality.as_deref(), Some("720p"));
        assert_eq!(links[1].quality.as_deref(), Some("720p"));
        assert_eq!(links[2].quality.as_deref(), Some("1080p"));
        assert_eq!(links[2].url, "https://drive.google.com/file/d/3");
    }

    #[test]
    fn test_series_episodes_from_season_walk() {
        let html = r#"<html><body>
            <h1 class="entry-title">Loki (Season 1-2) Web Series</h1>
            <div class="entry-content">
              <h3>Season 1</h3>
              <p>Episode 1: <a href="https://new.gdtot.dad/s1e1">720p</a></p>
              <p>Episode 2: <a href="https://new.gdtot.dad/s1e2">720p</a></p>
              <p>Episode 3: <a href="https://new.gdtot.dad/s1e3">1080p</a></p>
              <h3>Season 2</h3>
              <p>Episode 1: <a href="https://new.gdtot.dad/s2e1">720p</a></p>
              <p>Episode 2: <a href="https://new.gdtot.dad/s2e2">720p</a></p>
            </div>
          </body></html>"#;

        let (detail, _) = parse_detail(html, "https://moviesmod.net/loki/").unwrap();
        assert_eq!(detail.content_type(), ContentType::TvShow);

        let tags: Vec<(u32, u32)> = detail
            .episodes()
            .iter()
            .map(|e| (e.season, e.episode))
            .collect();
        assert_eq!(tags, vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2)]);
        assert_eq!(detail.episodes()[2].quality.as_deref(), Some("1080p"));
    }

    #[tokio::test]
    async fn test_search_single_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("s", "Inception"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<article class="post"><h2 class="entry-title"><a href="/inception/">Inception</a></h2></article>"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider =
            MoviesModProvider::new(test_support::context(&mock_server.uri()), &mock_server.uri());
        let results = provider.search("Inception").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Inception");
    }

    #[tokio::test]
    async fn test_search_failure_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let provider =
            MoviesModProvider::new(test_support::context(&mock_server.uri()), &mock_server.uri());
        assert!(provider.search("Inception").await.is_empty());
        assert!(provider.load_detail(&format!("{}/inception/", mock_server.uri())).await.is_none());
    }
}
