use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use filebox_core::{
    constants::DEFAULT_DATA_DIR, max_upload_bytes_from_env_value, CoreConfig, FileId,
    FileRecord, Filebox, Identity, IncomingFile, SortDirection, SyncDirection,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filebox")]
#[command(about = "Filebox file storage CLI")]
struct Cli {
    /// Data directory holding metadata and blobs
    #[arg(long, env = "FILEBOX_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct UserArgs {
    /// Acting user's numeric id
    #[arg(long)]
    user_id: i64,
    /// Acting user's display name
    #[arg(long)]
    user_name: String,
}

impl UserArgs {
    fn identity(&self) -> anyhow::Result<Identity> {
        Ok(Identity::new(self.user_id, &self.user_name)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List all files
    List {
        /// Sort by file type, A to Z
        #[arg(long, conflicts_with = "descending")]
        ascending: bool,
        /// Sort by file type, Z to A
        #[arg(long)]
        descending: bool,
        /// Only show files of this type (repeatable)
        #[arg(long = "type")]
        types: Vec<String>,
    },
    /// Upload a local file
    Upload {
        path: PathBuf,
        #[command(flatten)]
        user: UserArgs,
    },
    /// Replace a stored file with a local file
    Replace {
        id: FileId,
        path: PathBuf,
        #[command(flatten)]
        user: UserArgs,
    },
    /// Write a stored file's content to a local path
    Download {
        id: FileId,
        dest: PathBuf,
        /// Overwrite `dest` if it exists
        #[arg(long)]
        force: bool,
    },
    /// Show a file's metadata
    Info { id: FileId },
    /// Delete a stored file
    Delete { id: FileId },
    /// Two-way sync of a local folder with the user's files
    Sync {
        folder: PathBuf,
        #[command(flatten)]
        user: UserArgs,
        /// Only print what would be transferred
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove blobs no file references (run while the server is stopped)
    Reclaim,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let max_upload_bytes =
        max_upload_bytes_from_env_value(std::env::var("FILEBOX_MAX_UPLOAD_BYTES").ok())?;
    let cfg = CoreConfig::new(cli.data_dir, max_upload_bytes)?;
    let filebox = Filebox::open(&cfg)
        .with_context(|| format!("opening data directory {}", cfg.data_dir().display()))?;

    match cli.command {
        Commands::List {
            ascending,
            descending,
            types,
        } => {
            let direction = match (ascending, descending) {
                (true, _) => Some(SortDirection::Ascending),
                (_, true) => Some(SortDirection::Descending),
                _ => None,
            };
            let files = filebox.listing.sort_and_filter(direction, &types)?;
            if files.is_empty() {
                println!("No files found.");
            }
            for file in files {
                print_summary(&file);
            }
        }
        Commands::Upload { path, user } => {
            let file = read_local(&path, cfg.max_upload_bytes())?;
            let record = filebox.files.upload(file, &user.identity()?)?;
            println!("Uploaded {} as file {}", record.name, record.id);
        }
        Commands::Replace { id, path, user } => {
            let file = read_local(&path, cfg.max_upload_bytes())?;
            let record = filebox.files.replace(id, file, &user.identity()?)?;
            println!("Replaced file {} (revision {})", record.id, record.revision);
        }
        Commands::Download { id, dest, force } => {
            if dest.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", dest.display());
            }
            let (record, bytes) = filebox.files.fetch(id)?;
            fs::write(&dest, &bytes).with_context(|| format!("writing {}", dest.display()))?;
            println!("Wrote {} ({} bytes) to {}", record.name, record.size, dest.display());
        }
        Commands::Info { id } => {
            let record = filebox.files.get_metadata(id)?;
            println!("ID:       {}", record.id);
            println!("Name:     {}", record.name);
            println!("Type:     {}", record.file_type);
            println!("Size:     {} bytes", record.size);
            println!("Owner:    {} ({})", record.owner_name, record.owner_id);
            println!("Created:  {}", record.created_at.to_rfc3339());
            println!("Editor:   {} ({})", record.editor_name, record.editor_id);
            println!("Modified: {}", record.modified_at.to_rfc3339());
            println!("Revision: {}", record.revision);
        }
        Commands::Delete { id } => {
            filebox.files.delete(id)?;
            println!("Deleted file {id}");
        }
        Commands::Sync {
            folder,
            user,
            dry_run,
        } => {
            let identity = user.identity()?;
            if dry_run {
                let plan = filebox.folder_sync.plan(&folder, &identity)?;
                if plan.is_in_sync() {
                    println!("Already in sync.");
                }
                for name in &plan.to_upload {
                    println!("would upload   {name}");
                }
                for name in &plan.to_download {
                    println!("would download {name}");
                }
                return Ok(());
            }

            let report = filebox.folder_sync.sync(&folder, &identity)?;
            for record in &report.uploaded {
                println!("uploaded   {} (file {})", record.name, record.id);
            }
            for path in &report.downloaded {
                println!("downloaded {}", path.display());
            }
            for failure in &report.failures {
                let direction = match failure.direction {
                    SyncDirection::Upload => "upload",
                    SyncDirection::Download => "download",
                };
                eprintln!("failed to {direction} {}: {}", failure.name, failure.reason);
            }
            if !report.is_complete() {
                bail!("{} file(s) failed to sync", report.failures.len());
            }
        }
        Commands::Reclaim => {
            let reclaimed = filebox.files.reclaim_orphans()?;
            println!("Reclaimed {} orphaned blob(s)", reclaimed.len());
        }
    }

    Ok(())
}

fn print_summary(file: &FileRecord) {
    println!(
        "ID: {}, Name: {}, Type: {}, Size: {}, Owner: {}, Modified: {}",
        file.id,
        file.name,
        file.file_type,
        file.size,
        file.owner_name,
        file.modified_at.to_rfc3339()
    );
}

fn read_local(path: &Path, max_bytes: usize) -> anyhow::Result<IncomingFile> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.len() > max_bytes {
        bail!("{} exceeds the {max_bytes} byte upload limit", path.display());
    }
    Ok(IncomingFile::new(file_name, bytes))
}
