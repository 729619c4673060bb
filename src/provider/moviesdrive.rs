use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::scrape::{self, classify_content_type, image_url, quality_or_default, text_of};
use super::{Provider, ProviderContext, descriptor, recover};
use crate::error::{Error, Result};
use crate::metadata::enrich_detail;
use crate::models::{
    CatalogItem, CatalogSection, ContentBody, ContentDetail, ContentType, Episode,
    LinkDescriptor, ProviderDescriptor,
};

const ID: &str = "moviesdrive";

static CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article.post").unwrap());
static ENTRY_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".entry-title").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".entry-content").unwrap());
static CONTENT_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".entry-content img").unwrap());
static CONTENT_PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".entry-content p").unwrap());
static LINK_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".entry-content p, .entry-content div").unwrap());
static IMDB_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="imdb.com"]"#).unwrap());
static FILE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="drive.google.com"], a[href*="gdtot"], a[href*="filepress"]"#)
        .unwrap()
});

pub struct MoviesDriveProvider {
    ctx: Arc<ProviderContext>,
    descriptor: ProviderDescriptor,
}

impl MoviesDriveProvider {
    pub fn new(ctx: Arc<ProviderContext>, base_url: &str) -> Self {
        Self {
            ctx,
            descriptor: descriptor(ID, "MoviesDrive", base_url, "hi"),
        }
    }

    async fn try_search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        let url = format!(
            "{}/?s={}",
            self.descriptor.base_url,
            urlencoding::encode(query)
        );
        let html = self.ctx.http.get_text(&url).await?;
        Ok(parse_cards(&html))
    }

    async fn try_catalog(&self) -> Result<Vec<CatalogSection>> {
        let html = self.ctx.http.get_text(&self.descriptor.base_url).await?;
        let (series, movies): (Vec<_>, Vec<_>) = parse_cards(&html)
            .into_iter()
            .partition(|item| item.content_type == ContentType::TvShow);

        Ok(vec![
            CatalogSection {
                title: "Latest Movies".to_string(),
                items: movies,
            },
            CatalogSection {
                title: "Latest Series".to_string(),
                items: series,
            },
        ])
    }

    async fn try_load(&self, url: &str) -> Result<ContentDetail> {
        let html = self.ctx.http.get_text(url).await?;
        let (mut detail, imdb_id) = parse_detail(&html, url)?;

        enrich_detail(self.ctx.metadata.as_ref(), imdb_id.as_deref(), &mut detail).await;
        Ok(detail)
    }
}

fn parse_cards(html: &str) -> Vec<CatalogItem> {
    let document = Html::parse_document(html);

    document
        .select(&CARD)
        .filter_map(|card| {
            let title = card.select(&ENTRY_TITLE).next().map(text_of)?;
            let url = card.select(&ANCHOR).next()?.attr("href")?.to_string();
            if title.is_empty() || url.is_empty() {
                return None;
            }

            Some(CatalogItem {
                content_type: classify_content_type(&title, ""),
                poster_url: card.select(&IMAGE).next().and_then(image_url),
                quality: scrape::parse_quality(&title),
                title,
                url,
            })
        })
        .collect()
}

/// File-host links anywhere in the post body, first occurrence of each URL
fn movie_links(document: &Html) -> Vec<LinkDescriptor> {
    let mut links: Vec<LinkDescriptor> = Vec::new();

    for container in document.select(&LINK_CONTAINER) {
        for anchor in container.select(&FILE_LINK) {
            let Some(href) = anchor.attr("href").filter(|h| !h.is_empty()) else {
                continue;
            };
            if links.iter().any(|l| l.url == href) {
                continue;
            }
            links.push(LinkDescriptor::new(href).with_quality(quality_or_default(&text_of(anchor))));
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

    let body = match classify_content_type(&title, "") {
        ContentType::Movie => ContentBody::Movie {
            download_links: movie_links(&document),
        },
        ContentType::TvShow => {
            let episodes = document
                .select(&CONTENT)
                .next()
                .map(|content| scrape::walk_seasons(content, &FILE_LINK, scrape::season_number))
                .unwrap_or_default()
                .into_iter()
                .map(|link| Episode {
                    season: link.season,
                    episode: link.episode,
                    quality: Some(quality_or_default(&link.text)),
                    url: link.url,
                    ..Default::default()
                })
                .collect();
            ContentBody::TvShow { episodes }
        }
    };

    let mut detail = ContentDetail::new(title, body);
    detail.poster_url = document.select(&CONTENT_IMAGE).next().and_then(image_url);
    detail.description = document
        .select(&CONTENT_PARAGRAPH)
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty());

    let imdb_id = document
        .select(&IMDB_LINK)
        .next()
        .and_then(|a| a.attr("href"))
        .and_then(scrape::imdb_id);

    Ok((detail, imdb_id))
}

#[async_trait]
impl Provider for MoviesDriveProvider {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOME: &str = r#"<html><body>
        <article class="post"><a href="https://moviesdrive.xyz/oppenheimer/"><img src="https://img/o.jpg"></a><h2 class="entry-title">Oppenheimer (2023) 1080p</h2></article>
        <article class="post"><a href="https://moviesdrive.xyz/panchayat/"></a><h2 class="entry-title">Panchayat Season 3 Web Series</h2></article>
        <article class="post"><a href="https://moviesdrive.xyz/dune/"></a><h2 class="entry-title">Dune Part Two</h2></article>
        <article class="post"><h2 class="entry-title"></h2></article>
      </body></html>"#;

    #[tokio::test]
    async fn test_catalog_splits_home_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HOME))
            .mount(&mock_server)
            .await;

        let provider =
            MoviesDriveProvider::new(test_support::context(&mock_server.uri()), &mock_server.uri());
        let sections = provider.list_catalog().await;

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Latest Movies");
        assert_eq!(sections[0].items.len(), 2);
        assert_eq!(sections[0].items[0].poster_url.as_deref(), Some("https://img/o.jpg"));
        assert_eq!(sections[1].title, "Latest Series");
        assert_eq!(sections[1].items.len(), 1);
        assert_eq!(sections[1].items[0].content_type, ContentType::TvShow);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let provider =
            MoviesDriveProvider::new(test_support::context(&mock_server.uri()), &mock_server.uri());
        assert!(provider.list_catalog().await.is_empty());
        assert!(provider.search("dune").await.is_empty());
    }

    #[test]
    fn test_movie_links_deduplicated() {
        let html = r#"<html><body>
            <h1 class="entry-title">Dune Part Two (2024)</h1>
            <div class="entry-content">
              <p>Paul Atreides unites with the Fremen.</p>
              <div><p><a href="https://new.gdtot.dad/file/9">Download 1080p</a></p></div>
              <p><a href="https://drive.google.com/file/d/2">G-Drive</a></p>
            </div>
          </body></html>"#;

        let (detail, imdb_id) = parse_detail(html, "https://moviesdrive.xyz/dune/").unwrap();
        assert_eq!(imdb_id, None);
        assert_eq!(detail.description.as_deref(), Some("Paul Atreides unites with the Fremen."));

        let links = detail.download_links();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].quality.as_deref(), Some("1080p"));
        assert_eq!(links[1].quality.as_deref(), Some("HD"));
    }

    #[test]
    fn test_series_episodes() {
        let html = r#"<html><body>
            <h1 class="entry-title">Panchayat Season 3 Web Series</h1>
            <div class="entry-content">
              <p>Life in Phulera continues.</p>
              <h4>Season 3 720p</h4>
              <p><a href="https://new.filepress.store/e1">Episode 1 720p</a></p>
              <p><a href="https://new.filepress.store/e2">Episode 2 720p</a></p>
              <h4>Screenshots</h4>
              <p><a href="https://new.filepress.store/sample">Sample</a></p>
            </div>
          </body></html>"#;

        let (detail, _) = parse_detail(html, "https://moviesdrive.xyz/panchayat/").unwrap();
        let episodes = detail.episodes();
        assert_eq!(episodes.len(), 2);
        assert_eq!((episodes[1].season, episodes[1].episode), (3, 2));
        assert_eq!(episodes[0].quality.as_deref(), Some("720p"));
    }
}
