//! bivouac command-line driver.
//!
//! Runs one lifecycle step or one fetch against the configured site and
//! prints the result as JSON on stdout. Logs go to stderr.

use anyhow::Result;
use bivouac_client::{FetchOutcome, Network, SiteService, resolve};
use bivouac_core::{AppConfig, Request};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bivouac")]
#[command(about = "Offline cache for a static site: precache, activate, and serve with fallback")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install the configured generation and activate it immediately
    Deploy,

    /// Precache the manifest without activating
    Install,

    /// Activate the installed generation and delete the others
    Activate,

    /// Fetch a URL (absolute, or relative to the scope) through the cache
    Fetch {
        url: String,

        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,

        /// Accept header to send
        #[arg(long)]
        accept: Option<String>,

        /// HTTP method
        #[arg(long, default_value = "GET")]
        method: String,
    },

    /// Show generation state
    Status {
        /// Also list cached URLs
        #[arg(long)]
        keys: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::load()?;
    let service = SiteService::open(&config).await?;

    let output = match args.command {
        Command::Deploy => {
            let report = service.deploy().await?;
            json!({
                "generation": report.install.generation,
                "entries": report.install.entries,
                "deleted": report.activation.deleted,
                "claimed": report.activation.claimed,
            })
        }
        Command::Install => {
            let report = service.install().await?;
            json!({ "generation": report.generation, "entries": report.entries })
        }
        Command::Activate => {
            let report = service.activate().await?;
            json!({ "generation": report.generation, "deleted": report.deleted })
        }
        Command::Fetch { url, navigate, accept, method } => {
            let url = resolve(service.scope(), &url)?;
            let mut request = if navigate { Request::navigate(url) } else { Request::get(url) };
            if let Some(accept) = accept {
                request = request.with_header("Accept", accept);
            }
            let request = request.with_method(method);

            let (response, passthrough) = match service.handle_fetch(&request).await? {
                FetchOutcome::Respond(response) => (response, None),
                FetchOutcome::Passthrough(reason) => (service.network().fetch(&request).await?, Some(reason.as_str())),
            };
            json!({
                "url": response.url.as_str(),
                "status": response.status,
                "source": response.source.as_str(),
                "passthrough": passthrough,
                "content_type": response.content_type(),
                "body": String::from_utf8_lossy(&response.body),
            })
        }
        Command::Status { keys } => {
            let status = service.status().await?;
            let generations: Vec<_> = status
                .generations
                .iter()
                .map(|g| {
                    json!({
                        "name": g.name,
                        "version": g.version,
                        "state": g.state.as_str(),
                        "created_at": g.created_at,
                        "activated_at": g.activated_at,
                    })
                })
                .collect();
            let mut output = json!({
                "generation": status.generation,
                "state": status.state.as_str(),
                "active": status.active,
                "generations": generations,
                "clients": service.clients().len().await,
            });
            if keys {
                output["keys"] = json!(service.cached_urls().await?);
            }
            output
        }
    };

    let failed = service.flush().await;
    if failed > 0 {
        tracing::warn!(failed, "some responses could not be stored");
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
