//! blockvault CLI - Command line interface for a blockvault directory
//!
//! Every command prints one JSON document on stdout. Logs go to stderr.

use blockvault::{Config, FileId, FileRecord, Vault};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

#[derive(Parser)]
#[command(name = "blockvault")]
#[command(about = "A two-store file vault: metadata and content joined by file id")]
#[command(version)]
struct Cli {
    /// Vault directory (overrides the config file)
    #[arg(short, long)]
    vault: Option<PathBuf>,

    /// Config file (default: ~/.config/blockvault/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty vault
    Init,

    /// Upload a file
    Upload {
        /// Path of the file to store
        path: PathBuf,
        /// File name to record (default: the path's file name)
        #[arg(short, long)]
        name: Option<String>,
        /// File type to record
        #[arg(short = 't', long = "type", default_value = DEFAULT_FILE_TYPE)]
        file_type: String,
        /// Size to record (default: bytes read)
        #[arg(short, long)]
        size: Option<u64>,
    },

    /// List all files
    List {
        /// Maximum number of records to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Get a file by ID
    Get {
        /// The file ID
        id: String,
        /// Write the content to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Update a file's name and type
    Update {
        /// The file ID
        id: String,
        /// New file name
        #[arg(short, long)]
        name: String,
        /// New file type
        #[arg(short = 't', long = "type")]
        file_type: String,
    },

    /// Delete a file
    Delete {
        /// The file ID
        id: String,
    },

    /// Check that both stores hold the same ids
    Check {
        /// Remove ids found in only one store
        #[arg(long)]
        repair: bool,
    },

    /// Show vault status
    Status,
}

/// Returns the exit code from inside the scope that owns the vault, so the
/// stores are dropped (and synced) before the process ends
fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.vault {
        config = config.with_vault_dir(dir);
    }
    init_logging(&config);

    let vault = Vault::open(&config)?;

    match cli.command {
        Commands::Init => {
            vault.sync()?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Vault ready at {}", config.vault_dir.display())
                }),
            );
        }

        Commands::Upload {
            path,
            name,
            file_type,
            size,
        } => {
            let content = std::fs::read(&path)?;
            let name = match name {
                Some(name) => name,
                None => file_name_of(&path)?,
            };
            let size = size.unwrap_or(content.len() as u64);
            let record = vault.upload(name, size, file_type, content)?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "file": record
                }),
            );
        }

        Commands::List { limit } => {
            let mut records = vault.list_all()?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            output(
                cli.format,
                &serde_json::json!({
                    "count": records.len(),
                    "files": records
                }),
            );
        }

        Commands::Get { id, output: dest } => {
            let (record, content) = match vault.get_by_id(&FileId::new(id)) {
                Err(e) if e.is_not_found() => return Ok(not_found(cli.format, &e)),
                other => other?,
            };
            let written = match &dest {
                Some(dest) => {
                    std::fs::write(dest, &content)?;
                    Some(dest.display().to_string())
                }
                None => None,
            };
            output(
                cli.format,
                &serde_json::json!({
                    "file": record,
                    "contentLength": content.len(),
                    "writtenTo": written
                }),
            );
        }

        Commands::Update {
            id,
            name,
            file_type,
        } => {
            let record = match vault.update_metadata(&FileId::new(id), name, file_type) {
                Err(e) if e.is_not_found() => return Ok(not_found(cli.format, &e)),
                other => other?,
            };
            print_record(cli.format, &record);
        }

        Commands::Delete { id } => {
            // A split pair loses its surviving half here even though the
            // result is NotFound, so the vault must still be synced on exit
            let record = match vault.delete_file(&FileId::new(id)) {
                Err(e) if e.is_not_found() => return Ok(not_found(cli.format, &e)),
                other => other?,
            };
            print_record(cli.format, &record);
        }

        Commands::Check { repair } => {
            let report = if repair {
                vault.repair()?
            } else {
                vault.check()?
            };
            output(
                cli.format,
                &serde_json::json!({
                    "consistent": report.is_consistent(),
                    "repaired": repair && !report.is_consistent(),
                    "report": report
                }),
            );
        }

        Commands::Status => {
            let report = vault.check()?;
            output(
                cli.format,
                &serde_json::json!({
                    "vault": config.vault_dir.display().to_string(),
                    "records": report.records,
                    "blobs": report.blobs,
                    "consistent": report.is_consistent()
                }),
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the NotFound message; the caller returns the failure code
fn not_found(format: OutputFormat, error: &blockvault::Error) -> ExitCode {
    output(
        format,
        &serde_json::json!({
            "status": "error",
            "message": error.to_string()
        }),
    );
    ExitCode::FAILURE
}

fn print_record(format: OutputFormat, record: &FileRecord) {
    output(
        format,
        &serde_json::json!({
            "status": "ok",
            "file": record
        }),
    );
}

fn file_name_of(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("Cannot take a file name from {}", path.display()))
}

fn output(format: OutputFormat, value: &serde_json::Value) {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Text => serde_json::to_string_pretty(value),
    };
    match rendered {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to render output: {}", e),
    }
}
