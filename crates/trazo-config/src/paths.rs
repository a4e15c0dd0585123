//! Platform-specific configuration paths.
//!
//! - **Linux**: `~/.config/trazo/`
//! - **macOS**: `~/Library/Application Support/trazo/`
//! - **Windows**: `%APPDATA%\trazo\`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "trazo";

/// Profile file name inside the config directory.
const PROFILE_FILE: &str = "profile.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path (the current directory) if the platform config
/// directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default profile path inside the user config directory.
pub fn default_profile_path() -> PathBuf {
    user_config_dir().join(PROFILE_FILE)
}
