//! udsboot - Bind unix domain server sockets from the command line

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::PathBuf;
use udsboot::bootstrap::{SocketPath, MAX_PATH_LEN, SUN_PATH_CAPACITY};
use udsboot::config::Config;
use udsboot::server::{start_listening, UnixServerSocket};

#[derive(Parser)]
#[command(name = "udsboot")]
#[command(about = "Bootstrap bound Unix domain stream sockets for server endpoints")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind a server socket
    Bind(BindArgs),
    /// Validate a socket path without touching the filesystem
    Check {
        /// Socket path
        path: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the configured socket path for a name
    Path {
        /// Server name
        name: String,
    },
}

#[derive(Args)]
struct BindArgs {
    /// Socket path
    #[arg(required_unless_present = "name", conflicts_with = "name")]
    path: Option<PathBuf>,

    /// Bind `<runtime_dir>/<NAME>.sock` instead of an explicit path
    #[arg(short, long)]
    name: Option<String>,

    /// Call listen(2) after binding
    #[arg(short, long)]
    listen: bool,

    /// Listen backlog (defaults to the configured value)
    #[arg(long, requires = "listen")]
    backlog: Option<u32>,

    /// Keep the socket open until Ctrl-C, then remove the socket file
    #[arg(long)]
    hold: bool,

    /// With --hold, leave the socket file on disk on exit
    #[arg(short, long, requires = "hold")]
    keep: bool,

    /// Bind even if a server is accepting connections at the path
    #[arg(short, long)]
    force: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct BindReport {
    path: PathBuf,
    fd: i32,
    listening: bool,
    backlog: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    path: PathBuf,
    length: usize,
    max_length: usize,
    capacity: usize,
    valid: bool,
    error: Option<String>,
    exists: bool,
    live: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Bind(args) => run_bind(args, &config).await,
        Commands::Check { path, json } => run_check(path, json),
        Commands::Path { name } => {
            println!("{}", config.socket_path(&name).display());
            Ok(())
        }
    }
}

async fn run_bind(args: BindArgs, config: &Config) -> Result<()> {
    let path = match (args.path, args.name) {
        (Some(path), _) => path,
        (None, Some(name)) => {
            let runtime_dir = config.runtime_dir();
            std::fs::create_dir_all(&runtime_dir)
                .with_context(|| format!("Failed to create runtime dir {:?}", runtime_dir))?;
            config.socket_path(&name)
        }
        (None, None) => bail!("Either a path or --name is required"),
    };

    let server = UnixServerSocket::new(&path);

    if server.is_live() {
        if !args.force {
            bail!("A server is already accepting connections at {:?}", path);
        }
        tracing::warn!("Replacing live server socket at {:?}", path);
    }

    let descriptor = server.bind()?;
    let fd = descriptor.as_raw_fd();

    let backlog = args.listen.then(|| args.backlog.unwrap_or(config.server.backlog));
    let held: OwnedFd = match backlog {
        Some(backlog) => start_listening(descriptor, backlog)?,
        None => descriptor.into(),
    };

    let report = BindReport {
        path: path.clone(),
        fd,
        listening: backlog.is_some(),
        backlog,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("path:      {}", report.path.display());
        println!("fd:        {}", report.fd);
        println!(
            "state:     {}",
            if report.listening { "listening" } else { "bound" }
        );
        if let Some(backlog) = report.backlog {
            println!("backlog:   {}", backlog);
        }
    }

    if args.hold {
        tracing::info!("Holding {:?} open, press Ctrl-C to exit", path);
        tokio::signal::ctrl_c()
            .await
            .context("Failed to wait for Ctrl-C")?;
        tracing::info!("Shutdown signal received");
    }

    drop(held);

    if config.cleans_up_on_exit(args.hold, args.keep) {
        server.cleanup();
    }

    Ok(())
}

fn run_check(path: PathBuf, json: bool) -> Result<()> {
    let server = UnixServerSocket::new(&path);
    let validation = SocketPath::new(&path);

    let report = CheckReport {
        length: path.as_os_str().len(),
        max_length: MAX_PATH_LEN,
        capacity: SUN_PATH_CAPACITY,
        valid: validation.is_ok(),
        error: validation.as_ref().err().map(|e| e.to_string()),
        exists: server.socket_exists(),
        live: server.is_live(),
        path,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("path:      {}", report.path.display());
        println!(
            "length:    {} / {} bytes (sun_path {})",
            report.length, report.max_length, report.capacity
        );
        println!("exists:    {}", report.exists);
        println!("live:      {}", report.live);
        match &report.error {
            Some(error) => println!("valid:     no ({})", error),
            None => println!("valid:     yes"),
        }
    }

    validation
        .map(|_| ())
        .map_err(|e| anyhow!(e).context("Socket path cannot be bound"))
}
