//! Clipboard Bridge - command-line entry point
//!
//! `serve` runs the relay until Ctrl+C. The other subcommands are offline
//! helpers for converting documents and building or reading frames.

use std::path::PathBuf;

use base64::Engine as _;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipboard_bridge::{
    protocol, select_adapter, BridgeError, ChannelKind, Config, Orchestrator, Role,
};

#[derive(Parser)]
#[command(name = "clipboard-bridge", version, about, arg_required_else_help = true)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Relay requests until interrupted
    Serve(ServeArgs),
    /// Convert a local .docx file to JSON on stdout
    Convert {
        file: PathBuf,
    },
    /// Print the request frame a client would place on the medium
    Request(RequestArgs),
    /// Decode a response frame saved to a file
    Response {
        file: PathBuf,
    },
    /// Write the effective configuration to the config file
    InitConfig,
}

#[derive(Args)]
struct ServeArgs {
    /// auto, clipboard or directory
    #[arg(long)]
    channel: Option<ChannelKind>,

    /// Workspace for the directory channel
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Delay between poll cycles
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[derive(Args)]
struct RequestArgs {
    /// Request type, e.g. DOCX_TO_JSON
    #[arg(long = "type")]
    kind: String,

    /// File whose bytes are sent base64-encoded
    #[arg(long, conflicts_with = "content", required_unless_present = "content")]
    file: Option<PathBuf>,

    /// Literal request content
    #[arg(long)]
    content: Option<String>,

    /// Clipboard content to carry along for restoration
    #[arg(long)]
    residual: Option<String>,
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    init_logging(&config.general.log_level);

    match cli.command {
        Command::Serve(args) => serve(config, args).await,
        Command::Convert { file } => {
            let bytes = std::fs::read(&file)?;
            let json = clipboard_bridge::convert_docx_to_json(&bytes)?;
            println!("{}", json);
            Ok(())
        }
        Command::Request(args) => {
            let content = match (&args.file, args.content) {
                (Some(file), _) => {
                    base64::engine::general_purpose::STANDARD.encode(std::fs::read(file)?)
                }
                (None, Some(content)) => content,
                (None, None) => {
                    return Err(BridgeError::Config("--file or --content is required".into()).into())
                }
            };
            if protocol::contains_reserved_token(&content)
                || args.residual.as_deref().is_some_and(protocol::contains_reserved_token)
            {
                warn!("Request contains a reserved frame token and will not decode intact");
            }
            print!(
                "{}",
                protocol::encode(Role::Server, &args.kind, &content, args.residual.as_deref())
            );
            Ok(())
        }
        Command::Response { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let frame = protocol::decode_response(&raw)
                .ok_or_else(|| BridgeError::Config(format!("{:?} holds no response frame", file)))?;
            println!("Type: {}", frame.kind);
            println!("Residual: {}", frame.residual);
            println!("{}", frame.content);
            Ok(())
        }
        Command::InitConfig => {
            match &cli.config {
                Some(path) => config.save_to_path(path.clone())?,
                None => config.save()?,
            }
            Ok(())
        }
    }
}

async fn serve(mut config: Config, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(kind) = args.channel {
        config.channel.kind = kind;
    }
    if let Some(workspace) = args.workspace {
        config.channel.workspace_dir = Some(workspace);
    }
    if let Some(interval) = args.interval_ms {
        config.timing.poll_interval_ms = interval;
    }

    info!("Starting Clipboard Bridge");

    let orchestrator = Orchestrator::new(select_adapter(&config), &config);
    if let Err(e) = orchestrator.initialize() {
        error!("Failed to initialize channel: {}", e);
        return Err(e.into());
    }

    let handle = orchestrator.spawn();
    info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    let outcome = handle.shutdown().await;
    info!("Shutdown complete ({:?})", outcome);

    // The worker may still be blocked on the medium; do not wait for it.
    std::process::exit(0);
}
