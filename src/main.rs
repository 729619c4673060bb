mod aggregator;
mod config;
mod error;
mod extractor;
mod http;
mod metadata;
mod models;
mod provider;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::ExtractorRegistry;
use crate::http::HttpClient;
use crate::metadata::CinemetaClient;
use crate::provider::{ProviderContext, ProviderRegistry};

#[derive(Parser)]
#[command(name = "cinehub")]
#[command(about = "Search and browse movie and series sites through one interface")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers
    Providers,

    /// Search every provider, or just one
    Search {
        query: String,

        /// Only search this provider
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Home-page sections of one provider
    Catalog { provider: String },

    /// Home-page sections of every provider
    Browse,

    /// Full details of a title
    Load { provider: String, url: String },

    /// Print the link reference for a title, or one of its episodes
    Links {
        provider: String,
        url: String,

        #[arg(long, requires = "episode")]
        season: Option<u32>,

        #[arg(long, requires = "season")]
        episode: Option<u32>,
    },

    /// Resolve a link reference into playable links
    Resolve { provider: String, reference: String },
}

fn setup_logging() -> Result<()> {
    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let file_appender = tracing_appender::rolling::daily(&data_dir, "cinehub.log");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("cinehub=info".parse().unwrap()))
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .init();

    Ok(())
}

fn build_aggregator(config: &Config) -> Result<Aggregator> {
    let http = HttpClient::new(&config.http)?;
    let context = Arc::new(ProviderContext {
        extractors: Arc::new(ExtractorRegistry::with_defaults(http.clone())),
        metadata: Arc::new(CinemetaClient::new(http.clone(), &config.metadata.base_url)),
        http,
    });

    Ok(Aggregator::new(ProviderRegistry::with_defaults(
        context,
        &config.providers,
    )))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON output, so logs go to a file
    if let Err(e) = setup_logging() {
        eprintln!("Warning: Could not set up logging: {}", e);
    }

    info!("Starting cinehub");

    let config = Config::load()?;
    let aggregator = build_aggregator(&config)?;
    info!(providers = aggregator.providers().len(), "Registered providers");

    match cli.command {
        Commands::Providers => print_json(&aggregator.providers()),
        Commands::Search { query, provider } => {
            print_json(&aggregator.search(&query, provider.as_deref()).await?)
        }
        Commands::Catalog { provider } => print_json(&aggregator.list_catalog(&provider).await?),
        Commands::Browse => print_json(&aggregator.list_all_catalogs().await),
        Commands::Load { provider, url } => {
            print_json(&aggregator.load_detail(&provider, &url).await?)
        }
        Commands::Links {
            provider,
            url,
            season,
            episode,
        } => {
            let Some(detail) = aggregator.load_detail(&provider, &url).await? else {
                return print_json(&Option::<String>::None);
            };

            let selected = match season.zip(episode) {
                Some((s, e)) => Some(detail.find_episode(s, e).ok_or_else(|| {
                    Error::Upstream(format!("No episode S{:02}E{:02} in {}", s, e, detail.title))
                })?),
                None => None,
            };

            let reference = aggregator.link_reference(&provider, &detail, selected)?;
            println!("{}", reference.encode()?);
            Ok(())
        }
        Commands::Resolve {
            provider,
            reference,
        } => print_json(&aggregator.resolve_links(&provider, &reference).await?),
    }
}
