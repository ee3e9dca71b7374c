// src/infra/paths.rs — Path management
//
// All paths respect the REPAIRBENCH_HOME environment variable for isolation.
// When unset, config lives under ~/.repairbench/.

use std::path::PathBuf;

/// Returns the REPAIRBENCH_HOME override, if set.
fn repairbench_home() -> Option<PathBuf> {
    std::env::var_os("REPAIRBENCH_HOME").map(PathBuf::from)
}

/// Configuration directory: $REPAIRBENCH_HOME/ or ~/.repairbench/
pub fn config_dir() -> PathBuf {
    if let Some(home) = repairbench_home() {
        return home;
    }
    dirs_home().join(".repairbench")
}

/// Home directory, falling back to the current directory when unknown.
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
