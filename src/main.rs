//! OSH Connect CLI
//!
//! Command-line interface for an OpenSensorHub node:
//! - List systems and their datastreams
//! - Stream live or archived observations
//! - Generate a default configuration file

use anyhow::Context;
use clap::{Parser, Subcommand};
use oshconnect::config::{generate_default_config, Config, LoggingConfig};
use oshconnect::*;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "oshconnect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover and stream data from OpenSensorHub nodes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Node address, overrides the config file
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// Node port, overrides the config file
    #[arg(long, global = true)]
    pub port: Option<u16>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the systems hosted on the node
    Systems,

    /// List the datastreams of a system
    Datastreams {
        /// Server id of the system
        system_id: String,
    },

    /// Print observations received on a datastream
    Stream {
        /// Server id of the datastream
        datastream_id: String,
        /// Replay archived observations instead of following live data
        #[arg(long)]
        archive: bool,
        /// Archive start (ISO 8601 or "now")
        #[arg(long)]
        start: Option<String>,
        /// Archive end (ISO 8601 or "now")
        #[arg(long)]
        end: Option<String>,
        /// Stop after this many messages
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Print a default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(address) = cli.address {
        config.node.address = address;
    }
    if let Some(port) = cli.port {
        config.node.port = port;
    }

    init_logging(&config.logging)?;
    tracing::debug!("OSH Connect v{}", env!("CARGO_PKG_VERSION"));

    let manager = SessionManager::with_config(config.streaming.session_config());
    let node = Node::from_config(&config.node, Some(&manager))?;
    tracing::info!(endpoint = %node.api_endpoint(), "Using node");

    let result = match cli.command {
        Commands::Systems => list_systems(&node).await,
        Commands::Datastreams { system_id } => list_datastreams(&node, &system_id).await,
        Commands::Stream {
            datastream_id,
            archive,
            start,
            end,
            count,
        } => {
            let mut streaming = config.streaming.clone();
            if archive {
                streaming.playback = PlaybackMode::Archive;
            }
            if start.is_some() || end.is_some() {
                streaming.start = start;
                streaming.end = end;
            }
            let playback = streaming.playback()?;
            stream_observations(&node, &manager, &datastream_id, playback, count).await
        }
        Commands::InitConfig => Ok(()),
    };

    manager.close_all().await;
    result
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("oshconnect={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    let json = logging.format.eq_ignore_ascii_case("json");

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            let writer = std::sync::Mutex::new(file);
            if json {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .init();
            } else {
                registry
                    .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                    .init();
            }
        }
        None if json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

async fn list_systems(node: &Node) -> anyhow::Result<()> {
    let systems = node.discover_systems().await?;
    if systems.is_empty() {
        println!("No systems found");
        return Ok(());
    }

    println!("{:<24} {:<32} URN", "ID", "NAME");
    println!("{}", "-".repeat(80));
    for system in systems {
        println!(
            "{:<24} {:<32} {}",
            system.resource_id().unwrap_or_default(),
            system.name(),
            system.urn()
        );
    }
    Ok(())
}

async fn list_datastreams(node: &Node, system_id: &str) -> anyhow::Result<()> {
    let resource: SystemResource = node
        .api()
        .retrieve(ResourceType::System, system_id)
        .await
        .with_context(|| format!("System {} not found", system_id))?;
    let system = System::from_resource(resource, node.clone());

    let datastreams = system.discover_datastreams().await?;
    println!("Datastreams of {} ({}):", system.name(), system_id);
    for ds in datastreams {
        let valid = ds.valid_time.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:<32} {}",
            ds.id.as_deref().unwrap_or("-"),
            ds.name,
            valid
        );
    }
    Ok(())
}

async fn stream_observations(
    node: &Node,
    manager: &SessionManager,
    datastream_id: &str,
    playback: Playback,
    count: Option<usize>,
) -> anyhow::Result<()> {
    let resource: DatastreamResource = node
        .api()
        .retrieve(ResourceType::Datastream, datastream_id)
        .await
        .with_context(|| format!("Datastream {} not found", datastream_id))?;

    let datastream = Datastream::new(node.clone(), resource);
    datastream.stream().set_playback(playback);
    datastream.register()?;
    datastream.initialize()?;
    let mut messages = datastream
        .take_receiver()
        .context("Message queue already taken")?;

    manager.start_all_streams();
    tracing::info!(datastream_id, mode = %playback.mode, "Streaming observations (Ctrl+C to stop)");

    let mut received = 0usize;
    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else {
                    break;
                };
                match message {
                    StreamMessage::Text(text) => println!("{}", text),
                    StreamMessage::Binary(data) => println!("<{} bytes>", data.len()),
                }
                received += 1;
                if count.is_some_and(|limit| received >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    if let Some(error) = datastream.last_error() {
        anyhow::bail!("Stream failed: {}", error);
    }
    tracing::info!(received, "Stream finished");
    Ok(())
}
