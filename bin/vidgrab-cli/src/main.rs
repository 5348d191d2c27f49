//! vidgrab - command-line client for vidgrab-server.
//!
//! URLs are checked locally with the same validator the server runs, so an
//! unsupported link fails fast without a round trip. The server still has the
//! final say.

mod cli;
mod client;
mod display;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use strum::IntoEnumIterator;
use tracing::{debug, warn};
use vidgrab_core::{
    validate, DownloadHistory, MediaSelection, NewHistoryItem, Platform, ValidatedUrl,
};

use crate::cli::{Cli, Commands, HistoryCommands};
use crate::client::ApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Info { url } => {
            let url = check_url(&url)?;
            let client = ApiClient::new(&cli.server)?;
            let meta = client.info(url.as_str()).await?;
            print!("{}", display::render_metadata(&meta));
        }
        Commands::Download { url, format, audio_only, output } => {
            let url = check_url(&url)?;
            let client = ApiClient::new(&cli.server)?;
            download(&client, &url, format.as_deref(), audio_only, output).await?;
        }
        Commands::History(cmd) => history(cmd)?,
        Commands::Platforms => {
            for platform in Platform::iter() {
                println!("{platform}");
            }
        }
    }
    Ok(())
}

/// Advisory validation, identical to the server's own check.
fn check_url(input: &str) -> Result<ValidatedUrl> {
    validate(input).map_err(|reason| {
        let supported: Vec<String> = Platform::iter().map(|p| p.to_string()).collect();
        anyhow!("{reason}: {}\nSupported platforms: {}", input.trim(), supported.join(", "))
    })
}

async fn download(
    client: &ApiClient,
    url: &ValidatedUrl,
    format: Option<&str>,
    audio_only: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    // Metadata only names the file and the history entry; a failure here
    // does not block the download itself.
    let meta = match client.info(url.as_str()).await {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!(error = %e, "could not fetch video information; using defaults");
            None
        }
    };
    let title = meta.as_ref().map(|m| m.title.as_str()).unwrap_or("download");
    let selection = MediaSelection::from_request(format, audio_only);
    let destination = output.unwrap_or_else(|| display::default_output(title, &selection));

    eprintln!("Downloading to {} ...", destination.display());
    let written = client
        .download(url.as_str(), format, audio_only, &destination)
        .await?;
    println!("Saved {} ({})", destination.display(), display::format_file_size(Some(written)));

    let mut store = open_history()?;
    store.add(NewHistoryItem {
        title: title.to_owned(),
        platform: url.platform().to_string(),
        url: url.as_str().to_owned(),
        thumbnail: meta.and_then(|m| m.thumbnail).unwrap_or_default(),
        format: history_format(selection),
    });
    if let Err(e) = store.save() {
        warn!(error = %e, "failed to record download in history");
    }
    Ok(())
}

/// Label recorded in the history `format` field.
fn history_format(selection: MediaSelection) -> String {
    match selection {
        MediaSelection::AudioOnly => "audio".to_owned(),
        MediaSelection::Format(id) => id,
        MediaSelection::ToolDefault => "default".to_owned(),
    }
}

fn history(cmd: HistoryCommands) -> Result<()> {
    let mut store = open_history()?;
    match cmd {
        HistoryCommands::List => print!("{}", display::render_history(store.items())),
        HistoryCommands::Clear => {
            store.clear();
            store.save().context("Failed to clear download history")?;
            println!("Download history cleared");
        }
        HistoryCommands::Remove { id } => {
            if !store.remove(&id) {
                return Err(anyhow!("No history entry with id {id}"));
            }
            store.save().context("Failed to update download history")?;
            println!("Removed {id}");
        }
    }
    Ok(())
}

fn open_history() -> Result<DownloadHistory> {
    let path = history_path()?;
    debug!(path = %path.display(), "opening download history");
    DownloadHistory::load(path).context("Failed to load download history")
}

fn history_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("VIDGRAB_HISTORY") {
        return Ok(PathBuf::from(path));
    }
    let dir = dirs_next::data_dir().context("Could not determine the user data directory")?;
    Ok(dir.join("vidgrab").join("history.json"))
}
