//! Command-line arguments
//!
//! Flags override the configuration file and the `SIGNIN_` environment
//! variables.

use clap::{Args, Parser, Subcommand};
use common::{ClientConfig, ScanMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "signin")]
#[command(about = "QR sign-in client: manage users, scan codes, read history")]
#[command(version)]
pub struct CliArgs {
    /// Configuration file (default: ./signin.toml when present)
    #[arg(long, short = 'c', global = true, env = "SIGNIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Local storage file holding the session
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    /// Apply flag overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(path) = &self.storage_path {
            config.storage_path = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = Some(timeout);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or change the local session
    #[command(subcommand)]
    Session(SessionCommand),

    /// Manage users on the backend
    #[command(subcommand)]
    Users(UsersCommand),

    /// Submit a decoded QR payload
    Signin {
        /// Decoded QR content
        payload: String,

        /// Submitting user (default: session user)
        #[arg(long)]
        user: Option<String>,
    },

    /// Scan a QR code and submit it
    Scan(ScanArgs),

    /// Read scan or sign-in history
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Print the session
    Show,

    /// Set the API endpoint
    Endpoint { url: String },

    /// Forget the API endpoint
    ClearEndpoint,

    /// Select the current user
    User {
        id: String,

        /// Display name (looked up on the backend when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// Forget the current user
    ClearUser,

    /// Forget user and endpoint
    ClearAll,

    /// Choose between camera stream and photo scanning
    ScanMode { mode: ScanMode },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List users with their latest cookie
    List,

    /// Register a new user
    Add { name: String },

    /// Remove a user
    Remove { id: String },

    /// Rename a user
    Rename { id: String, name: String },

    /// Upload a fresh cookie for a user
    Refresh { id: String, cookie: String },

    /// Toggle automatic sign-in for a user
    Auto {
        id: String,

        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Decode a single image file
    #[arg(long, conflicts_with_all = ["frames", "native"])]
    pub image: Option<PathBuf>,

    /// Scan a directory of frames as a camera stream
    #[arg(long, conflicts_with = "native")]
    pub frames: Option<PathBuf>,

    /// Use the native scanner on the configured video device
    #[arg(long)]
    pub native: bool,

    /// Print the payload without submitting it
    #[arg(long)]
    pub dry_run: bool,

    /// Submitting user (default: session user)
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Sign-in attempts
    Signin(HistoryArgs),

    /// Submitted scans
    Scan(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of entries
    #[arg(long)]
    pub count: Option<u32>,

    /// Only entries of this user
    #[arg(long)]
    pub user: Option<String>,

    /// Offset of the first entry
    #[arg(long)]
    pub index: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_history_filters() {
        let args =
            CliArgs::parse_from(["signin", "history", "scan", "--count", "5", "--index", "0"]);
        match args.command {
            Command::History(HistoryCommand::Scan(filters)) => {
                assert_eq!(filters.count, Some(5));
                assert_eq!(filters.index, Some(0));
                assert_eq!(filters.user, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_scan_mode_and_auto_flag() {
        let args = CliArgs::parse_from(["signin", "session", "scan-mode", "photo"]);
        assert!(matches!(
            args.command,
            Command::Session(SessionCommand::ScanMode {
                mode: ScanMode::Photo
            })
        ));

        let args = CliArgs::parse_from(["signin", "users", "auto", "u1", "false"]);
        assert!(matches!(
            args.command,
            Command::Users(UsersCommand::Auto { enabled: false, .. })
        ));
    }

    #[test]
    fn test_scan_sources_are_exclusive() {
        let result =
            CliArgs::try_parse_from(["signin", "scan", "--image", "a.png", "--frames", "dir"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::parse_from([
            "signin",
            "--storage-path",
            "/tmp/session.json",
            "--timeout",
            "7",
            "session",
            "show",
        ]);
        let mut config = ClientConfig {
            storage_path: PathBuf::from("/default.json"),
            log_level: "info".to_string(),
            default_endpoint: None,
            prefer_native: false,
            scan_interval_ms: 40,
            request_timeout_secs: None,
            video_device: "/dev/video0".to_string(),
        };
        args.apply(&mut config);

        assert_eq!(config.storage_path, PathBuf::from("/tmp/session.json"));
        assert_eq!(config.request_timeout_secs, Some(7));
        assert_eq!(config.log_level, "info");
    }
}
