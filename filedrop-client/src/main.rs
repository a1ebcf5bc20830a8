//! Filedrop command-line client

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use filedrop_client::{Client, ClientError, Download};
use filedrop_common::DEFAULT_PORT;
use filedrop_common::validators::validate_file_name;

/// Filedrop file service client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server address (host:port)
    #[arg(short, long, default_value_t = format!("127.0.0.1:{DEFAULT_PORT}"))]
    server: String,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file
    Upload {
        /// File to upload
        path: PathBuf,
        /// Name to store it under (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List files on the server
    List,
    /// Download a file
    Download {
        /// Name of the file on the server
        name: String,
        /// Where to write it (defaults to the name, in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    debug!(server = %cli.server, "connecting");
    let mut client = Client::connect(cli.server.as_str()).await?;

    match cli.command {
        Command::Upload { path, name } => upload(&mut client, &path, name).await,
        Command::List => list(&mut client).await,
        Command::Download { name, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            download(&mut client, &name, &output).await
        }
    }
}

async fn upload(client: &mut Client, path: &Path, name: Option<String>) -> Result<(), ClientError> {
    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_default(),
    };
    validate_file_name(&name)?;

    let content = tokio::fs::read(path).await?;
    let message = client.upload_file(&name, &content).await?;
    println!("{name}: {message} ({} bytes)", content.len());
    Ok(())
}

async fn list(client: &mut Client) -> Result<(), ClientError> {
    let mut files = client.get_file_list().await?;
    if files.is_empty() {
        println!("No files");
        return Ok(());
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    let width = files.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for file in files {
        println!(
            "{:<width$}  created {}  updated {}",
            file.name, file.created_at, file.updated_at
        );
    }
    Ok(())
}

/// Download `name` to `output`
///
/// Chunks go to a `.part` sibling that is renamed over `output` only once the
/// server confirms completion, so a failed download never leaves a truncated
/// file under the requested name.
async fn download(client: &mut Client, name: &str, output: &Path) -> Result<(), ClientError> {
    validate_file_name(name)?;

    let mut download = client.download_file(name).await?;
    let partial = partial_path(output);
    let written = match write_chunks(&mut download, &partial).await {
        Ok(()) => tokio::fs::rename(&partial, output).await.map_err(ClientError::from),
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
            debug!(path = %partial.display(), error = %remove_err, "partial download not removed");
        }
        return Err(e);
    }

    println!(
        "{name}: {} bytes in {} chunks -> {}",
        download.bytes(),
        download.chunks(),
        output.display()
    );
    Ok(())
}

async fn write_chunks(download: &mut Download<'_>, path: &Path) -> Result<(), ClientError> {
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = download.next_chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// `output` with `.part` appended to its file name
fn partial_path(output: &Path) -> PathBuf {
    let mut file_name = output.file_name().map(OsString::from).unwrap_or_default();
    file_name.push(".part");
    output.with_file_name(file_name)
}
