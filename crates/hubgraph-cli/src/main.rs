//! HubGraph - serves a live graph of the latest public GitHub activity.

mod progress;
mod serve;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use console::Term;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use hubgraph_core::{Config, GitHubClient, Poller};

use crate::progress::ProgressReporter;
use crate::serve::ServeConfig;

#[derive(Parser)]
#[command(name = "hubgraph")]
#[command(version)]
#[command(about = "Live graph of the latest public GitHub activity")]
#[command(after_long_help = r#"CONFIGURATION
    HubGraph reads configuration from the first file found:
      1. --config <path>
      2. ./hubgraph.toml
      3. ~/.config/hubgraph/config.toml
    Environment variables override the file, and flags override both.

ENVIRONMENT VARIABLES
    HUBGRAPH_TOKEN      GitHub personal access token (GITHUB_TOKEN also works)
    HUBGRAPH_API_URL    API base URL (default: https://api.github.com)
    HUBGRAPH_PAGES      Event pages per run
    HUBGRAPH_DELAY      Fixed refresh delay in seconds
    HUBGRAPH_PORT       Port of the query server
"#)]
struct Cli {
    /// Port of the query server
    #[arg(short, long)]
    port: Option<u16>,

    /// Event pages to read per run
    #[arg(long)]
    pages: Option<u32>,

    /// Fixed refresh delay in seconds (defaults to the API's poll interval)
    #[arg(short, long)]
    delay: Option<u64>,

    /// GitHub personal access token
    #[arg(long)]
    token: Option<String>,

    /// Path to a config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of front-end files to serve at `/`
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Open the browser once the server is up
    #[arg(long)]
    open: bool,

    /// Print the default config file and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config, hubgraph_core::ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::load()?,
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(pages) = self.pages {
            config.poll.pages = pages;
        }
        if let Some(delay) = self.delay {
            config.poll.delay_secs = Some(delay);
        }
        if let Some(token) = &self.token {
            config.github.token = Some(token.clone());
        }
        if let Some(dir) = &self.public_dir {
            config.server.public_dir = Some(dir.display().to_string());
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(interactive: bool) {
    // The spinner owns the terminal in interactive mode; only warnings get through.
    let default = if interactive {
        "hubgraph=warn"
    } else {
        "hubgraph=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Config::default_config_string());
        return Ok(());
    }

    init_tracing(Term::stdout().is_term());

    let config = cli.load_config().wrap_err("Invalid configuration")?;
    let client =
        GitHubClient::from_config(&config.github).wrap_err("Could not build the API client")?;

    tracing::info!(
        api_url = %client.base_url(),
        authenticated = client.identity().is_authenticated(),
        pages = config.poll.pages,
        "Starting HubGraph"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let poller = Poller::new(client, &config.poll).with_progress(tx);

    let serve_config = ServeConfig::from_server_config(&config.server, cli.open);
    let listener = serve::bind(&serve_config)
        .await
        .wrap_err_with(|| format!("Could not bind port {}", serve_config.port))?;

    let reader = poller.reader();
    let server = tokio::spawn(serve::start_server(listener, serve_config, reader));
    let reporter = ProgressReporter::new().spawn(rx);

    tokio::select! {
        _ = poller.run_forever() => {}
        result = server => {
            result
                .wrap_err("Query server task panicked")?
                .wrap_err("Query server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    reporter.abort();
    Ok(())
}
