//! Locus command-line tool
//!
//! Inspect addresses, dump bytes and manage the recent locations list.
//!
//! # Examples
//!
//! ```bash
//! # Show how an address resolves
//! locus resolve "remote://db.local:4064/?session=abc"
//!
//! # Hex dump 64 bytes starting at offset 128
//! locus dump /data/image.tif --offset 128 --length 64
//!
//! # Recent locations
//! locus recent add /data/image.tif
//! locus recent list
//! ```

use clap::{Args, Parser, Subcommand};
use locus_io::{AccessMode, ByteOrder, DataHandle, IoConfig, IoService};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Locus - typed random-access I/O over files, memory and remote stores
#[derive(Parser, Debug)]
#[command(name = "locus")]
#[command(version = locus_io::VERSION)]
#[command(about = "Locus - typed random-access I/O over pluggable locations", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "LOCUS_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory; file logging is off when unset
    #[arg(long, global = true, env = "LOCUS_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve an address and describe the location
    Resolve(ResolveArgs),

    /// Hex dump a byte range of a location
    Dump(DumpArgs),

    /// Recently used locations
    Recent {
        #[command(subcommand)]
        command: RecentCommands,
    },

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Address to resolve
    address: String,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Address to read
    address: String,

    /// First byte to dump
    #[arg(short, long, default_value = "0")]
    offset: u64,

    /// Number of bytes to dump
    #[arg(short, long, default_value = "256")]
    length: u64,

    /// Byte order used for the word column (big, little)
    #[arg(long, default_value = "big")]
    order: ByteOrder,
}

#[derive(Subcommand, Debug)]
enum RecentCommands {
    /// List recent locations, most recent last
    List,

    /// Record a location as recently used
    Add {
        /// Address of the location
        address: String,
    },

    /// Forget one location
    Remove {
        /// Address of the location
        address: String,
    },

    /// Forget all recent locations
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let config = IoConfig::load(cli.config.as_deref())?;
    let service = IoService::new(config);
    debug!(?service, "Service ready");

    match cli.command {
        Commands::Resolve(args) => resolve_command(&service, args),
        Commands::Dump(args) => dump_command(&service, args),
        Commands::Recent { command } => recent_command(&service, command),
        Commands::Version => {
            println!("locus {}", locus_io::VERSION);
            Ok(())
        }
    }
}

/// Console logging plus an optional daily-rolling log file
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    let file_layer = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "locus.log");
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(file_layer)
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

fn resolve_command(service: &IoService, args: ResolveArgs) -> anyhow::Result<()> {
    let location = service.resolve(&args.address)?;
    let supported = service.handles().supports(location.as_ref());

    if args.json {
        let description = serde_json::json!({
            "kind": location.kind(),
            "display": location.to_string(),
            "canonical": location.path(),
            "uri": location.uri().map(|u| u.to_string()),
            "openable": supported,
        });
        println!("{}", serde_json::to_string_pretty(&description)?);
    } else {
        println!("Kind:      {}", location.kind());
        println!("Display:   {}", location);
        println!("Canonical: {}", location.path());
        if let Some(uri) = location.uri() {
            println!("URI:       {}", uri);
        }
        println!("Openable:  {}", if supported { "yes" } else { "no" });
    }
    Ok(())
}

fn dump_command(service: &IoService, args: DumpArgs) -> anyhow::Result<()> {
    let mut handle = service.open(&args.address, AccessMode::Read)?;
    handle.set_order(args.order);

    let length = handle.length()?;
    if args.offset > length {
        anyhow::bail!("offset {} is past the end ({} bytes)", args.offset, length);
    }
    handle.seek(args.offset)?;

    let wanted = args.length.min(length - args.offset);
    let mut data = vec![0u8; usize::try_from(wanted)?];
    let read = handle.read(&mut data)?;
    data.truncate(read);
    info!(location = %handle.location(), offset = args.offset, bytes = read, "Dumping");

    for (row, chunk) in data.chunks(16).enumerate() {
        println!("{}", format_row(args.offset + (row as u64) * 16, chunk, args.order));
    }
    handle.close()?;
    Ok(())
}

/// One dump line: offset, hex bytes, 32-bit words in `order`, ASCII
fn format_row(offset: u64, chunk: &[u8], order: ByteOrder) -> String {
    let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
    let words: Vec<String> = chunk
        .chunks_exact(4)
        .map(|w| format!("{:08x}", order.decode_u32([w[0], w[1], w[2], w[3]])))
        .collect();
    let ascii: String = chunk
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect();
    format!("{:08x}  {:<47}  {:<35}  |{}|", offset, hex.join(" "), words.join(" "), ascii)
}

fn recent_command(service: &IoService, command: RecentCommands) -> anyhow::Result<()> {
    let mut recent = service.recent()?;

    match command {
        RecentCommands::List => {
            if recent.is_empty() {
                println!("No recent locations.");
            } else {
                println!("Recent locations ({}/{})", recent.len(), recent.max());
                for location in recent.locations() {
                    println!("  {:<6} {}", location.kind(), location);
                }
            }
        }
        RecentCommands::Add { address } => {
            let location = service.resolve(&address)?;
            println!("Added {}", location);
            recent.add(location)?;
        }
        RecentCommands::Remove { address } => {
            let location = service.resolve(&address)?;
            if recent.remove(location.as_ref())? {
                println!("Removed {}", location);
            } else {
                println!("{} was not in the recent list", location);
            }
        }
        RecentCommands::Clear => {
            recent.clear()?;
            println!("Cleared recent locations.");
        }
    }
    Ok(())
}
