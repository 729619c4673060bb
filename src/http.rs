use std::time::Duration;

use reqwest::{ClientBuilder, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Shared outbound HTTP client with the configured timeouts applied to every call
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    browser_user_agent: String,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Self::with_builder(config, reqwest::Client::builder())
    }

    pub fn with_builder(config: &HttpConfig, builder: ClientBuilder) -> Result<Self> {
        let client = builder
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            browser_user_agent: config.browser_user_agent.clone(),
        })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// GET with a desktop browser User-Agent, for Cloudflare-fronted sites
    pub fn get_as_browser(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.browser_user_agent)
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.text(self.get(url)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.json(self.get(url)).await
    }

    /// Send the request and return the body, treating non-2xx as an upstream failure
    pub async fn text(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();

        if !status.is_success() {
            return Err(Error::Upstream(format!("HTTP {} from {}", status, url)));
        }

        debug!(url = %url, status = %status, "Fetched");
        Ok(response.text().await?)
    }

    /// Body of the response whatever its status; only transport errors fail
    pub async fn text_any_status(&self, url: &str) -> Result<String> {
        let response = self.get(url).send().await?;
        debug!(url = %url, status = %response.status(), "Fetched");
        Ok(response.text().await?)
    }

    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.text(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
