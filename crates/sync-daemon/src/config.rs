use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use sync_core::{RefreshPolicy, SyncSettings};

#[derive(Parser, Debug)]
#[command(name = "workspace-sync")]
#[command(about = "Sync a directory of markdown documents to a local object service")]
pub struct Args {
    /// Directory of documents to watch
    #[arg(short, long, env = "WORKSPACE_SYNC_DIR", default_value = "~/anytype-workspace")]
    pub watch_dir: String,

    /// Space that new objects are created in
    #[arg(short, long, env = "WORKSPACE_SYNC_SPACE_ID")]
    pub space_id: String,

    /// Base URL of the service's local API
    #[arg(long, env = "ANYTYPE_API_URL", default_value = "http://127.0.0.1:31012")]
    pub api_url: String,

    /// Service configuration file holding the session token
    #[arg(long, env = "ANYTYPE_CONFIG", default_value = "~/.anytype/config.json")]
    pub credential_file: String,

    /// Where the filename -> object ID mapping is kept
    #[arg(
        long,
        env = "WORKSPACE_SYNC_OBJECT_MAP",
        default_value = "~/.anytype-workspace-objectmap.json"
    )]
    pub object_map: String,

    /// Service binary restarted to obtain a fresh session
    #[arg(long, env = "ANYTYPE_BINARY", default_value = "~/.local/bin/anytype")]
    pub service_binary: String,

    /// Debounce window for file events, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub debounce_ms: u64,

    /// Minimum time between session refreshes, in seconds
    #[arg(long, default_value_t = 30)]
    pub refresh_cooldown_secs: u64,

    /// Extension of tracked documents
    #[arg(long, default_value = "md")]
    pub extension: String,

    /// Also sync documents in subdirectories at startup.
    ///
    /// Objects are keyed by file name without extension, so `a.md` and
    /// `sub/a.md` share one remote object.
    #[arg(long)]
    pub recursive: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,
}

/// Daemon configuration with paths expanded.
#[derive(Debug, Clone)]
pub struct Config {
    pub watch_dir: PathBuf,
    pub space_id: String,
    pub api_url: String,
    pub credential_file: PathBuf,
    pub object_map: PathBuf,
    pub service_binary: PathBuf,
    pub sync: SyncSettings,
    pub refresh: RefreshPolicy,
    pub verbose: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            watch_dir: expand_tilde(&args.watch_dir),
            space_id: args.space_id,
            api_url: args.api_url,
            credential_file: expand_tilde(&args.credential_file),
            object_map: expand_tilde(&args.object_map),
            service_binary: expand_tilde(&args.service_binary),
            sync: SyncSettings {
                debounce: Duration::from_millis(args.debounce_ms),
                extension: args.extension.trim_start_matches('.').to_string(),
                recursive: args.recursive,
            },
            refresh: RefreshPolicy {
                cooldown: Duration::from_secs(args.refresh_cooldown_secs),
            },
            verbose: args.verbose,
        }
    }
}

/// Expand ~ or ~/ prefix to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    }
}
