use async_trait::async_trait;
use serde::Deserialize;

use super::Extractor;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::models::LinkDescriptor;

const DEFAULT_QUALITY: &str = "720p";

/// Drive-style host answering with a JSON file description
pub struct GDriveExtractor {
    http: HttpClient,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    download_url: Option<String>,
    quality: Option<String>,
}

impl GDriveExtractor {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Extractor for GDriveExtractor {
    fn name(&self) -> &'static str {
        "gdrive"
    }

    fn host_patterns(&self) -> &'static [&'static str] {
        &["drive.google.com"]
    }

    async fn extract(&self, url: &str) -> Result<Vec<LinkDescriptor>> {
        let file: DriveFile = self.http.get_json(url).await?;
        let download_url = file
            .download_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Upstream(format!("No downloadUrl in {}", url)))?;

        Ok(vec![LinkDescriptor::new(download_url).with_quality(
            file.quality.unwrap_or_else(|| DEFAULT_QUALITY.to_string()),
        )])
    }
}
