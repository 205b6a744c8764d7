use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "portada",
    version,
    about = "Regional news harvester: front page discovery, article extraction and relevance filtering",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every enabled source and store the extracted articles
    Crawl {
        /// TOML configuration file (defaults plus PORTADA_* variables when absent)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Crawl a single source by name
        #[arg(short, long)]
        source: Option<String>,

        /// Override the global concurrency cap
        #[arg(long)]
        concurrency: Option<usize>,

        /// Keep results in memory instead of writing to the database
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Run the relevance classifier over keyword matches
        #[arg(long, default_value = "false")]
        classify: bool,
    },

    /// Show stored article counts
    Stats {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only count one source
        #[arg(short, long)]
        source: Option<String>,
    },

    /// List configured sources
    Sources {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Self::Crawl { config, .. } | Self::Stats { config, .. } | Self::Sources { config } => {
                config.as_deref()
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.command.config_path())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("portada starting");

    match cli.command {
        Commands::Crawl {
            config: path,
            source,
            concurrency,
            dry_run,
            classify,
        } => {
            tracing::info!(
                config = ?path,
                source = ?source,
                concurrency = ?concurrency,
                dry_run = %dry_run,
                classify = %classify,
                "Starting crawl command"
            );
            let options = commands::crawl::CrawlOptions {
                source,
                concurrency,
                dry_run,
                classify,
            };
            commands::crawl::crawl(config, options).await?;
        }

        Commands::Stats { source, .. } => {
            commands::stats::stats(&config, source.as_deref())?;
        }

        Commands::Sources { .. } => {
            commands::stats::sources(&config);
        }
    }

    tracing::info!("portada completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("portada=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("portada={level},warn"))
        })
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "text" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        other => anyhow::bail!("Unknown log format: {other}. Valid: text, json"),
    }

    Ok(())
}
