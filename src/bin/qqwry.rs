//! qqwry: CLI tool for looking up IPv4 locations in QQWry.dat files.

use clap::{Parser, Subcommand};
use qqwry::text::{display_fields, format_location};
use qqwry::{parse_ipv4, Database, DatabaseConfig, Error, SourceMode};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "qqwry")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Look up IPv4 locations in QQWry.dat databases", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more IPv4 addresses
    Lookup {
        /// Database file
        #[arg(short, long)]
        db: PathBuf,

        /// JSON database configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Access mode override (mmap, file, memory)
        #[arg(long)]
        source: Option<String>,

        /// Addresses to resolve
        #[arg(required = true)]
        ips: Vec<String>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,

        /// Print fields as UTF-8 instead of decoding GBK
        #[arg(long)]
        raw: bool,

        /// Keep the CZ88.NET filler in empty areas
        #[arg(long)]
        keep_placeholder: bool,
    },

    /// Show database layout and release label
    Info {
        /// Database file
        #[arg(short, long)]
        db: PathBuf,

        /// JSON database configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Access mode override (mmap, file, memory)
        #[arg(long)]
        source: Option<String>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct LookupOutput<'a> {
    ip: &'a str,
    range_start: Option<String>,
    country: Option<String>,
    area: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct InfoOutput {
    #[serde(flatten)]
    info: qqwry::DatabaseInfo,
    version: String,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Lookup {
            db,
            config,
            source,
            ips,
            json,
            raw,
            keep_placeholder,
        } => lookup(
            &db,
            config.as_deref(),
            source.as_deref(),
            &ips,
            OutputOptions {
                json,
                gbk: !raw,
                strip_placeholder: !keep_placeholder,
            },
        ),
        Commands::Info {
            db,
            config,
            source,
            json,
        } => info(&db, config.as_deref(), source.as_deref(), json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct OutputOptions {
    json: bool,
    gbk: bool,
    strip_placeholder: bool,
}

fn load_config(config: Option<&Path>, source: Option<&str>) -> Result<DatabaseConfig, Error> {
    let mut db_config = match config {
        Some(path) => DatabaseConfig::from_json_file(path)?,
        None => DatabaseConfig::default(),
    };
    if let Some(name) = source {
        db_config.source = SourceMode::from_str(name)
            .ok_or_else(|| Error::Config(format!("unknown source mode: {}", name)))?;
    }
    Ok(db_config)
}

fn lookup(
    db_path: &Path,
    config: Option<&Path>,
    source: Option<&str>,
    ips: &[String],
    opts: OutputOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let db_config = load_config(config, source)?;
    let db = Database::open_with_config(db_path, &db_config)?;

    let mut failed = false;
    for ip_text in ips {
        let result = parse_ipv4(ip_text).and_then(|ip| db.lookup(ip));
        let mut output = LookupOutput {
            ip: ip_text,
            range_start: None,
            country: None,
            area: None,
            error: None,
        };

        match result {
            Ok(location) => {
                let (country, area) = display_fields(
                    &location.country,
                    &location.area,
                    opts.gbk,
                    opts.strip_placeholder,
                );
                if !opts.json {
                    println!("{}\t{}", ip_text, format_location(&country, &area));
                    continue;
                }
                output.range_start = Some(location.range_start.to_string());
                output.country = Some(country);
                output.area = Some(area);
            }
            Err(Error::NotFound(_)) => {
                if !opts.json {
                    println!("{}\tnot found", ip_text);
                    continue;
                }
                output.error = Some("not found".to_string());
            }
            Err(e) => {
                failed = true;
                if !opts.json {
                    eprintln!("{}\terror: {}", ip_text, e);
                    continue;
                }
                output.error = Some(e.to_string());
            }
        }

        println!("{}", serde_json::to_string(&output)?);
    }

    if failed {
        return Err("one or more lookups failed".into());
    }
    Ok(())
}

fn info(
    db_path: &Path,
    config: Option<&Path>,
    source: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let db_config = load_config(config, source)?;
    let db = Database::open_with_config(db_path, &db_config)?;
    let info = db.info()?;
    let version = db.version()?;
    let (country, area) = display_fields(&version.country, &version.area, true, true);
    let version = format_location(&country, &area);

    if json {
        let output = InfoOutput { info, version };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("File:        {:?} ({} bytes)", db_path, info.file_size);
    println!(
        "Index:       {:#x}..={:#x} ({} entries)",
        info.index_start, info.index_end, info.entry_count
    );
    println!("Coverage:    {} - {}", info.first_ip, info.last_ip);
    println!("Version:     {}", version);
    Ok(())
}
