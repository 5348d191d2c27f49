//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_SERVER: &str = "http://localhost:3001";

/// vidgrab - fetch metadata and download media through a vidgrab-server
#[derive(Parser, Debug)]
#[command(name = "vidgrab")]
#[command(about = "Fetch metadata and download media through a vidgrab-server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the vidgrab-server
    #[arg(long, global = true, env = "VIDGRAB_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show title, uploader and available formats for a video
    Info {
        /// Link to a video on a supported platform
        url: String,
    },

    /// Download a video (or its audio track) to a local file
    Download {
        /// Link to a video on a supported platform
        url: String,

        /// A format id listed by `vidgrab info`
        #[arg(short, long)]
        format: Option<String>,

        /// Extract the audio track as mp3 (overrides --format)
        #[arg(short, long)]
        audio_only: bool,

        /// Destination file; defaults to `<title>.<ext>` in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recent downloads
    #[command(subcommand)]
    History(HistoryCommands),

    /// List the platforms the server accepts
    Platforms,
}

/// History subcommands
#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Show recent downloads, newest first
    List,

    /// Forget every recorded download
    Clear,

    /// Forget one recorded download
    Remove {
        /// Entry id as shown by `vidgrab history list`
        id: String,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn download_flags_parse() {
        let cli = Cli::try_parse_from([
            "vidgrab",
            "download",
            "https://youtu.be/abc",
            "--format",
            "22",
            "--audio-only",
            "-o",
            "out.mp3",
        ])
        .unwrap();
        match cli.command {
            Commands::Download { url, format, audio_only, output } => {
                assert_eq!(url, "https://youtu.be/abc");
                assert_eq!(format.as_deref(), Some("22"));
                assert!(audio_only);
                assert_eq!(output, Some(PathBuf::from("out.mp3")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn server_flag_is_global() {
        let cli = Cli::try_parse_from([
            "vidgrab",
            "history",
            "list",
            "--server",
            "http://media.lan:8080",
        ])
        .unwrap();
        assert_eq!(cli.server, "http://media.lan:8080");
        assert!(matches!(cli.command, Commands::History(HistoryCommands::List)));
    }

    #[test]
    fn history_remove_requires_id() {
        assert!(Cli::try_parse_from(["vidgrab", "history", "remove"]).is_err());
    }
}
