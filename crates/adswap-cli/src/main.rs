mod commands;
mod pages;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use adswap_types::{AdSwapConfig, SwapError, CONFIG_FILENAME};

/// adswap -- substitutes creatives into ad-sized page regions and
/// screenshots each substitution.
#[derive(Parser, Debug)]
#[command(name = "adswap", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a replacement session against a target site
    Run {
        /// Target site; its same-host article links become the candidate pages
        #[arg(long)]
        url: Option<String>,

        /// Stop after this many captured screenshots
        #[arg(long)]
        screenshots: Option<u32>,

        /// How many candidate article pages to collect
        #[arg(long)]
        articles: Option<u32>,

        /// DevTools endpoint of the browser to attach to
        #[arg(long)]
        devtools_url: Option<String>,

        /// Screen to capture from; only meaningful for OS-level capture
        /// backends
        #[arg(long, default_value_t = 1)]
        screen: u32,

        /// Path to a TOML config file (default: ./adswap.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Verbose scan/mutation logging
        #[arg(long)]
        debug: bool,
    },

    /// List the creatives parsed from a folder
    Inventory {
        /// Creative folder to inspect
        #[arg(long)]
        folder: PathBuf,
    },

    /// Print (or write) a default configuration file
    Config {
        /// Write to this path instead of stdout
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<(), SwapError> {
    match cli.command {
        Commands::Run {
            url,
            screenshots,
            articles,
            devtools_url,
            screen,
            config,
            debug,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(url) = url {
                config.base_url = url;
            }
            if let Some(n) = screenshots {
                config.target_captures = n;
            }
            if let Some(n) = articles {
                config.article_count = n;
            }
            if let Some(endpoint) = devtools_url {
                config.devtools_url = endpoint;
            }
            if debug {
                config.debug = true;
            }
            init_tracing(config.debug);
            if screen != 1 {
                tracing::info!(screen, "page-clip capture backend ignores screen selection");
            }

            if config.base_url.is_empty() {
                return Err(SwapError::Config(
                    "no target URL; pass --url or set base_url in adswap.toml".into(),
                ));
            }
            commands::run::execute(config).await
        }
        Commands::Inventory { folder } => {
            init_tracing(false);
            commands::inventory(&folder)
        }
        Commands::Config { write } => {
            init_tracing(false);
            commands::write_default_config(write.as_deref())
        }
    }
}

/// Load the config file: an explicit `--config` path must exist; the
/// default `adswap.toml` is optional.
fn load_config(path: Option<&std::path::Path>) -> Result<AdSwapConfig, SwapError> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                SwapError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            AdSwapConfig::from_toml(&content)
        }
        None => {
            let default = std::path::Path::new(CONFIG_FILENAME);
            if default.is_file() {
                let content = std::fs::read_to_string(default).map_err(|e| {
                    SwapError::Config(format!("cannot read {CONFIG_FILENAME}: {e}"))
                })?;
                AdSwapConfig::from_toml(&content)
            } else {
                Ok(AdSwapConfig::default())
            }
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
