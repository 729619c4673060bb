//! Markup helpers shared by the HTML-scraping adapters.

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::debug;

use crate::error::Result;
use crate::models::{CatalogItem, ContentType};

static QUALITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d{3,4}p|4K|FHD|HD").unwrap());

static IMDB_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"title/(tt\d+)").unwrap());

static SEASON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Season\s*(\d+)").unwrap());

const DEFAULT_QUALITY: &str = "HD";

/// Best-effort movie/series classification from a title and URL.
///
/// Anything whose title or URL mentions "series" (which covers "web-series")
/// is a show, everything else a movie. Titles like "Series of Unfortunate
/// Events: The Movie" are misclassified; that is accepted behavior.
pub fn classify_content_type(title: &str, url: &str) -> ContentType {
    let title = title.to_lowercase();
    let url = url.to_lowercase();
    if title.contains("series") || url.contains("series") {
        ContentType::TvShow
    } else {
        ContentType::Movie
    }
}

/// Collapsed, trimmed text content of an element
pub fn text_of(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sites prefix most post titles with "Download "
pub fn clean_title(title: &str) -> String {
    title.trim().replacen("Download ", "", 1).trim().to_string()
}

pub fn parse_quality(text: &str) -> Option<String> {
    QUALITY_PATTERN.find(text).map(|m| m.as_str().to_string())
}

pub fn quality_or_default(text: &str) -> String {
    parse_quality(text).unwrap_or_else(|| DEFAULT_QUALITY.to_string())
}

/// Extract an IMDb id (`tt1234567`) from an outbound link
pub fn imdb_id(href: &str) -> Option<String> {
    IMDB_ID_PATTERN
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn season_number(text: &str) -> Option<u32> {
    SEASON_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn next_element(element: ElementRef) -> Option<ElementRef> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Lazy-loaded images keep the real URL in `data-src`
pub fn image_url(img: ElementRef) -> Option<String> {
    img.attr("data-src")
        .or_else(|| img.attr("src"))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `<meta property="...">` content
pub fn meta_property(document: &scraper::Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{}"]"#, property)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|m| m.attr("content"))
        .map(str::to_string)
}

/// Text of the element after the first heading whose text matches `pattern`
pub fn text_after_heading(
    root: ElementRef,
    headings: &Selector,
    pattern: &Regex,
) -> Option<String> {
    root.select(headings)
        .find(|h| pattern.is_match(&text_of(*h)))
        .and_then(next_element)
        .map(text_of)
        .filter(|s| !s.is_empty())
}

fn is_heading(element: ElementRef) -> bool {
    matches!(
        element.value().name(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

/// One link found under a season heading
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonLink {
    pub season: u32,
    pub episode: u32,
    pub url: String,
    pub text: String,
    pub heading: String,
}

/// Group episode links by the season headings that precede them.
///
/// Walks the direct children of `container` in document order. A heading for
/// which `season_of` returns a number opens that season; each following
/// sibling that holds at least one `links` match becomes the next episode
/// (numbered from 1) until another heading appears. Headings without a season
/// close the current group. Several links inside one sibling share its
/// episode number.
pub fn walk_seasons(
    container: ElementRef,
    links: &Selector,
    season_of: fn(&str) -> Option<u32>,
) -> Vec<SeasonLink> {
    let mut found = Vec::new();
    let mut current: Option<(u32, String)> = None;
    let mut episode = 0;

    for node in container.children().filter_map(ElementRef::wrap) {
        if is_heading(node) {
            let heading = text_of(node);
            current = season_of(&heading).map(|season| (season, heading));
            episode = 0;
            continue;
        }

        let Some((season, heading)) = &current else {
            continue;
        };

        let anchors: Vec<ElementRef> = if links.matches(&node) {
            vec![node]
        } else {
            node.select(links).collect()
        };

        let mut counted = false;
        for anchor in anchors {
            let Some(href) = anchor.attr("href").filter(|h| !h.is_empty()) else {
                continue;
            };
            if !counted {
                episode += 1;
                counted = true;
            }
            found.push(SeasonLink {
                season: *season,
                episode,
                url: href.to_string(),
                text: text_of(anchor),
                heading: heading.clone(),
            });
        }
    }

    debug!(count = found.len(), "Walked season headings");
    found
}

/// Fetch result pages `1..=max_pages` in order, stopping at the first empty one.
///
/// A failure on the first page is the caller's failure. A failure on a later
/// page is treated like running off the end of the results, since these sites
/// answer out-of-range pages with error pages.
pub async fn paginate<F, Fut>(max_pages: u32, mut fetch_page: F) -> Result<Vec<CatalogItem>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<CatalogItem>>>,
{
    let mut results = Vec::new();

    for page in 1..=max_pages {
        let items = match fetch_page(page).await {
            Ok(items) => items,
            Err(e) if page > 1 => {
                debug!(page, error = %e, "Page fetch failed, treating as last page");
                break;
            }
            Err(e) => return Err(e),
        };

        if items.is_empty() {
            debug!(page, "Empty result page, stopping");
            break;
        }
        results.extend(items);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use scraper::Html;
    use std::cell::Cell;

    fn item(title: &str) -> CatalogItem {
        CatalogItem {
            title: title.to_string(),
            url: format!("https://x/{}", title),
            poster_url: None,
            content_type: ContentType::Movie,
            quality: None,
        }
    }

    #[test]
    fn test_classify_content_type() {
        assert_eq!(
            classify_content_type("Dark Season 1 Web Series", "https://x/dark"),
            ContentType::TvShow
        );
        assert_eq!(
            classify_content_type("Mirzapur", "https://x/web-series/mirzapur/"),
            ContentType::TvShow
        );
        assert_eq!(
            classify_content_type("Inception (2010)", "https://x/inception/"),
            ContentType::Movie
        );
        // documented misclassification
        assert_eq!(
            classify_content_type("A Series of Unfortunate Events (2004)", "https://x/a"),
            ContentType::TvShow
        );
    }

    #[test]
    fn test_quality_and_titles() {
        assert_eq!(parse_quality("Download 1080p x264"), Some("1080p".to_string()));
        assert_eq!(parse_quality("4K HDR"), Some("4K".to_string()));
        assert_eq!(quality_or_default("G-Drive link"), "HD");
        assert_eq!(clean_title("Download Inception (2010) 1080p"), "Inception (2010) 1080p");
    }

    #[test]
    fn test_imdb_id() {
        assert_eq!(
            imdb_id("https://www.imdb.com/title/tt1375666/?ref_=x"),
            Some("tt1375666".to_string())
        );
        assert_eq!(imdb_id("https://www.imdb.com/name/nm0634240/"), None);
    }

    #[test]
    fn test_walk_seasons_groups_by_heading() {
        let html = Html::parse_fragment(
            r#"<div class="entry-content">
                <p>Intro <a href="https://ignored">x</a></p>
                <h3>Season 1</h3>
                <p><a href="https://drive.google.com/s1e1">Episode 1</a></p>
                <p><a href="https://drive.google.com/s1e2">Episode 2</a></p>
                <p><a href="https://drive.google.com/s1e3">Episode 3</a></p>
                <h3>Season 2</h3>
                <p><a href="https://drive.google.com/s2e1">Episode 1</a></p>
                <p><a href="https://drive.google.com/s2e2">Episode 2</a></p>
                <h4>Screenshots</h4>
                <p><a href="https://drive.google.com/shot">shot</a></p>
            </div>"#,
        );
        let container = html
            .select(&Selector::parse("div.entry-content").unwrap())
            .next()
            .unwrap();
        let links = Selector::parse("a").unwrap();

        let found = walk_seasons(container, &links, season_number);
        let tags: Vec<(u32, u32)> = found.iter().map(|l| (l.season, l.episode)).collect();
        assert_eq!(tags, vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2)]);
        assert_eq!(found[4].url, "https://drive.google.com/s2e2");
        assert_eq!(found[0].heading, "Season 1");
    }

    #[test]
    fn test_walk_seasons_shares_episode_within_node() {
        let html = Html::parse_fragment(
            r#"<div id="c">
                <h4>Season 3 720p</h4>
                <p><a href="https://a/1">720p</a> <a href="https://b/1">1080p</a></p>
                <p>no links here</p>
                <p><a href="https://a/2">720p</a></p>
            </div>"#,
        );
        let container = html.select(&Selector::parse("#c").unwrap()).next().unwrap();
        let found = walk_seasons(container, &Selector::parse("a").unwrap(), season_number);

        let tags: Vec<(u32, u32)> = found.iter().map(|l| (l.season, l.episode)).collect();
        assert_eq!(tags, vec![(3, 1), (3, 1), (3, 2)]);
    }

    #[tokio::test]
    async fn test_paginate_stops_on_empty_page() {
        let calls = Cell::new(0);
        let results = paginate(5, |page| {
            calls.set(calls.get() + 1);
            async move {
                Ok(if page <= 2 {
                    vec![item(&format!("p{}", page))]
                } else {
                    vec![]
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_paginate_first_page_error_propagates() {
        let result = paginate(3, |_| async { Err(Error::Upstream("boom".to_string())) }).await;
        assert!(result.is_err());

        let results = paginate(3, |page| async move {
            if page == 1 {
                Ok(vec![item("a")])
            } else {
                Err(Error::Upstream("404".to_string()))
            }
        })
        .await
        .unwrap();
        assert_eq!(results.len(), 1);
    }
}
