use serde::Deserialize;

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::metadata::{Enrichment, MetadataSource};
use crate::models::ContentType;

/// Client for the Cinemeta catalog (`/meta/{type}/{imdbId}.json`)
pub struct CinemetaClient {
    http: HttpClient,
    base_url: String,
}

impl CinemetaClient {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct MetaResponse {
    meta: Option<Meta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    description: Option<String>,
    #[serde(default)]
    cast: Vec<String>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    genres: Vec<String>,
    imdb_rating: Option<String>,
    year: Option<String>,
    release_info: Option<String>,
    poster: Option<String>,
    background: Option<String>,
}

/// Leading four-digit year of strings like "2010" or "2017–2020"
fn parse_year(raw: &str) -> Option<u32> {
    let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    (digits.len() == 4).then(|| digits.parse().ok()).flatten()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<Meta> for Enrichment {
    fn from(meta: Meta) -> Self {
        Enrichment {
            description: non_empty(meta.description),
            cast: meta.cast,
            genre: if meta.genre.is_empty() {
                meta.genres
            } else {
                meta.genre
            },
            rating: meta.imdb_rating.and_then(|r| r.trim().parse().ok()),
            year: meta
                .year
                .or(meta.release_info)
                .and_then(|y| parse_year(&y)),
            poster_url: non_empty(meta.poster),
            background_url: non_empty(meta.background),
        }
    }
}

#[async_trait::async_trait]
impl MetadataSource for CinemetaClient {
    async fn fetch(&self, content_type: ContentType, imdb_id: &str) -> Result<Enrichment> {
        let url = format!(
            "{}/meta/{}/{}.json",
            self.base_url,
            content_type.cinemeta_kind(),
            imdb_id
        );

        let response: MetaResponse = self.http.get_json(&url).await?;
        let meta = response
            .meta
            .ok_or_else(|| Error::Metadata(format!("No meta for {}", imdb_id)))?;

        Ok(meta.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> CinemetaClient {
        CinemetaClient::new(HttpClient::new(&HttpConfig::default()).unwrap(), base_url)
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2010"), Some(2010));
        assert_eq!(parse_year("2017–2020"), Some(2017));
        assert_eq!(parse_year("TBA"), None);
    }

    #[tokio::test]
    async fn test_fetch_maps_meta_fields() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meta/movie/tt1375666.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {
                    "id": "tt1375666",
                    "name": "Inception",
                    "description": "A thief who steals corporate secrets.",
                    "cast": ["Leonardo DiCaprio", "Joseph Gordon-Levitt"],
                    "genre": ["Action", "Adventure"],
                    "imdbRating": "8.8",
                    "year": "2010",
                    "poster": "https://images.metahub.space/poster/medium/tt1375666/img",
                    "background": "https://images.metahub.space/background/medium/tt1375666/img"
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let enrichment = client(&mock_server.uri())
            .fetch(ContentType::Movie, "tt1375666")
            .await
            .unwrap();

        assert_eq!(enrichment.cast.len(), 2);
        assert_eq!(enrichment.genre, vec!["Action", "Adventure"]);
        assert_eq!(enrichment.rating, Some(8.8));
        assert_eq!(enrichment.year, Some(2010));
        assert!(enrichment.background_url.is_some());
    }

    #[tokio::test]
    async fn test_series_use_series_path() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meta/series/tt5753856.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": { "genres": ["Drama"], "releaseInfo": "2017–2020" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let enrichment = client(&mock_server.uri())
            .fetch(ContentType::TvShow, "tt5753856")
            .await
            .unwrap();
        assert_eq!(enrichment.genre, vec!["Drama"]);
        assert_eq!(enrichment.year, Some(2017));
    }

    #[tokio::test]
    async fn test_missing_meta_and_server_errors_fail() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meta/movie/tt0000001.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/meta/movie/tt0000002.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server.uri());
        assert!(client.fetch(ContentType::Movie, "tt0000001").await.is_err());
        assert!(client.fetch(ContentType::Movie, "tt0000002").await.is_err());

        let enrichment = crate::metadata::enrich(&client, ContentType::Movie, "tt0000002").await;
        assert!(enrichment.is_empty());
    }
}
