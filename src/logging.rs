//! Log file setup
//!
//! The terminal belongs to the dashboard, so tracing output goes to a file in
//! the platform cache directory instead of stderr.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "SHEETDASH_LOG";

/// Default log location: `~/.cache/sheetdash/sheetdash.log` on Linux
pub fn default_log_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "sheetdash")?;
    Some(project_dirs.cache_dir().join("sheetdash.log"))
}

/// Installs the global subscriber writing to `path`
///
/// The filter comes from `SHEETDASH_LOG` and defaults to `info`.
pub fn init(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_path_is_xdg_compliant() {
        if let Some(path) = default_log_path() {
            assert!(path.to_string_lossy().contains("sheetdash"));
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("log"));
        }
    }
}
