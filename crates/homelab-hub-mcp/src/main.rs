//! homelab-hub MCP Server - Entry Point
//!
//! Usage:
//!   homelab-hub-mcp                          # same as `start`
//!   homelab-hub-mcp start                    # serve MCP over stdio
//!   homelab-hub-mcp status                   # show resolved configuration
//!   homelab-hub-mcp config --url <url>       # persist backend URL / token

use anyhow::{bail, Result};
use argh::FromArgs;
use homelab_hub_mcp::client::HttpBackend;
use homelab_hub_mcp::config::{self, FileConfig, HomelabConfig};
use homelab_hub_mcp::{HomelabServer, SERVER_NAME, SERVER_VERSION};

/// homelab-hub MCP Server - Expose the homelab inventory to AI assistants
#[derive(FromArgs)]
struct Args {
    /// show version information
    #[argh(switch, short = 'V')]
    version: bool,

    #[argh(subcommand)]
    command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Start(StartArgs),
    Status(StatusArgs),
    Config(ConfigArgs),
}

/// Start the MCP server on stdio (default command)
#[derive(FromArgs)]
#[argh(subcommand, name = "start")]
struct StartArgs {}

/// Show current configuration
#[derive(FromArgs)]
#[argh(subcommand, name = "status")]
struct StatusArgs {}

/// Save backend URL and/or token to the config file
#[derive(FromArgs)]
#[argh(subcommand, name = "config")]
struct ConfigArgs {
    /// backend base URL (e.g. http://homelab.lan:8000)
    #[argh(option)]
    url: Option<String>,

    /// bearer token for the backend API
    #[argh(option)]
    token: Option<String>,
}

async fn run_start() -> Result<()> {
    let config = HomelabConfig::load();
    log::info!("Starting {} MCP server", SERVER_NAME);
    log::info!("Backend: {}", config.url());
    if !config.has_token() {
        log::warn!("No API token configured, calling the backend unauthenticated");
    }

    let backend = HttpBackend::new(&config)?;
    HomelabServer::new(backend).run_stdio().await
}

fn run_status() {
    let config = HomelabConfig::load();
    println!("HOMELAB_URL : {}", config.url());
    println!(
        "Token set   : {}",
        if config.has_token() { "yes" } else { "no (dev mode)" }
    );
    println!("Config file : {}", config::config_path().display());
}

fn run_config(args: ConfigArgs) -> Result<()> {
    if args.url.is_none() && args.token.is_none() {
        bail!("nothing to save: pass --url and/or --token");
    }
    let path = config::config_path();
    config::save_config(
        &path,
        FileConfig {
            url: args.url,
            token: args.token,
            ..FileConfig::default()
        },
    )?;
    println!("Saved {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    if args.version {
        println!("homelab-hub-mcp {}", SERVER_VERSION);
        return Ok(());
    }

    // Initialize logging to stderr (stdout is used for MCP protocol)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match args.command {
        None | Some(Command::Start(_)) => run_start().await?,
        Some(Command::Status(_)) => run_status(),
        Some(Command::Config(args)) => run_config(args)?,
    }

    Ok(())
}
