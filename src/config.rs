use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Outbound HTTP settings shared by every provider, extractor and the enricher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Sent to sites that sit behind Cloudflare and reject non-browser agents
    #[serde(default = "default_browser_user_agent")]
    pub browser_user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_bollyflix_url")]
    pub bollyflix_url: String,
    #[serde(default = "default_vegamovies_url")]
    pub vegamovies_url: String,
    #[serde(default = "default_moviesmod_url")]
    pub moviesmod_url: String,
    #[serde(default = "default_moviesdrive_url")]
    pub moviesdrive_url: String,
    #[serde(default = "default_netflixmirror_url")]
    pub netflixmirror_url: String,
    #[serde(default = "default_netflixmirror_image_url")]
    pub netflixmirror_image_url: String,
    #[serde(default = "default_bollyflix_max_pages")]
    pub bollyflix_max_pages: u32,
    #[serde(default = "default_vegamovies_max_pages")]
    pub vegamovies_max_pages: u32,
}

fn default_user_agent() -> String {
    "cinehub/0.1".to_string()
}

fn default_browser_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_metadata_base_url() -> String {
    "https://v3-cinemeta.strem.io".to_string()
}

fn default_bollyflix_url() -> String {
    "https://bollyflix.guru".to_string()
}

fn default_vegamovies_url() -> String {
    "https://vegamovies.band".to_string()
}

fn default_moviesmod_url() -> String {
    "https://moviesmod.net".to_string()
}

fn default_moviesdrive_url() -> String {
    "https://moviesdrive.xyz".to_string()
}

fn default_netflixmirror_url() -> String {
    "https://netfree.cc".to_string()
}

fn default_netflixmirror_image_url() -> String {
    "https://img.nfmirrorcdn.top".to_string()
}

fn default_bollyflix_max_pages() -> u32 {
    6
}

fn default_vegamovies_max_pages() -> u32 {
    7
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            browser_user_agent: default_browser_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_base_url(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            bollyflix_url: default_bollyflix_url(),
            vegamovies_url: default_vegamovies_url(),
            moviesmod_url: default_moviesmod_url(),
            moviesdrive_url: default_moviesdrive_url(),
            netflixmirror_url: default_netflixmirror_url(),
            netflixmirror_image_url: default_netflixmirror_image_url(),
            bollyflix_max_pages: default_bollyflix_max_pages(),
            vegamovies_max_pages: default_vegamovies_max_pages(),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "cinehub").ok_or(Error::NoConfigDir)
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Read the config at `path`, writing the defaults there on first run
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
