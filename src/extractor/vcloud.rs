use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::Extractor;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::LinkDescriptor;
use crate::provider::scrape::parse_quality;

// Player configs (`file: "..."`, `src="..."`) and bare media URLs
static MEDIA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?:\\?/\\?/[^\s"'<>?]+\.(?:m3u8|mp4|mkv)(?:\?[^\s"'<>]*)?"#).unwrap()
});

/// HTML hosting page with media sources embedded in its markup or scripts
pub struct VCloudExtractor {
    http: HttpClient,
}

impl VCloudExtractor {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

/// Collect media source URLs from a hosting page, in document order
pub fn scan_media_sources(body: &str) -> Vec<LinkDescriptor> {
    let mut seen = HashSet::new();

    MEDIA_URL
        .find_iter(body)
        .map(|m| m.as_str().replace("\\/", "/"))
        .filter(|url| seen.insert(url.clone()))
        .map(|url| LinkDescriptor {
            quality: parse_quality(&url),
            is_stream: url.contains(".m3u8"),
            url,
            ..Default::default()
        })
        .collect()
}

#[async_trait]
impl Extractor for VCloudExtractor {
    fn name(&self) -> &'static str {
        "vcloud"
    }

    fn host_patterns(&self) -> &'static [&'static str] {
        &["vcloud.lol", "fastdl.icu"]
    }

    async fn extract(&self, url: &str) -> Result<Vec<LinkDescriptor>> {
        let body = self.http.get_text(url).await?;
        Ok(scan_media_sources(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_player_and_bare_sources() {
        let body = r#"
            <script>
              var player = jwplayer("v").setup({ file: "https://cdn1.example/hls/720p/index.m3u8?token=abc" });
            </script>
            <a href="https://dl.example/Movie.1080p.mkv">Download</a>
            <video><source src="https://dl.example/Movie.1080p.mkv"></video>
            <img src="https://img.example/poster.jpg">
            <video><source src="https://cdn.mp4upload.com/files/abc/video.m3u8"></video>
        "#;

        let links = scan_media_sources(body);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].url, "https://cdn1.example/hls/720p/index.m3u8?token=abc");
        assert!(links[0].is_stream);
        assert_eq!(links[0].quality.as_deref(), Some("720p"));
        assert_eq!(links[1].url, "https://dl.example/Movie.1080p.mkv");
        assert!(!links[1].is_stream);
        assert_eq!(links[2].url, "https://cdn.mp4upload.com/files/abc/video.m3u8");
        assert!(links[2].is_stream);
    }

    #[test]
    fn test_scan_unescapes_json_slashes() {
        let body = r#"{"sources":[{"file":"https:\/\/cdn.example\/a.mp4"}]}"#;
        let links = scan_media_sources(body);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://cdn.example/a.mp4");
    }

    #[test]
    fn test_scan_empty_page() {
        assert!(scan_media_sources("<html><body>Not found</body></html>").is_empty());
    }
}
