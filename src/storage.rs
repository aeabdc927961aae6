// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

/// Get the system-wide storage directory for Octorag
/// Following XDG Base Directory specification on Unix-like systems
/// and proper conventions on other systems
pub fn get_system_storage_dir() -> Result<PathBuf> {
    let base_dir = if cfg!(target_os = "macos") {
        // macOS: ~/.local/share/octorag
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".local")
            .join("share")
            .join("octorag")
    } else if cfg!(target_os = "windows") {
        // Windows: %APPDATA%/octorag
        dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine data directory"))?
            .join("octorag")
    } else {
        resolve_unix_storage_dir(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())?
    };

    if !base_dir.exists() {
        fs::create_dir_all(&base_dir)?;
    }

    Ok(base_dir)
}

/// $XDG_DATA_HOME/octorag when set and non-empty, ~/.local/share/octorag otherwise
fn resolve_unix_storage_dir(
    xdg_data_home: Option<String>,
    home_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    match xdg_data_home.filter(|dir| !dir.trim().is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir).join("octorag")),
        None => Ok(home_dir
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".local")
            .join("share")
            .join("octorag")),
    }
}

/// Get the system config file path
/// Stored directly under ~/.local/share/octorag/ on all systems
pub fn get_system_config_path() -> Result<PathBuf> {
    let system_dir = get_system_storage_dir()?;
    Ok(system_dir.join("config.toml"))
}

/// Get the directory that holds rotated MCP server logs
pub fn get_log_dir() -> Result<PathBuf> {
    let log_dir = get_system_storage_dir()?.join("logs");
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }
    Ok(log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xdg_data_home_wins() {
        let dir = resolve_unix_storage_dir(
            Some("/tmp/xdg".to_string()),
            Some(PathBuf::from("/home/user")),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/xdg/octorag"));
    }

    #[test]
    fn test_blank_xdg_falls_back_to_home() {
        let dir =
            resolve_unix_storage_dir(Some("  ".to_string()), Some(PathBuf::from("/home/user")))
                .unwrap();
        assert_eq!(dir, PathBuf::from("/home/user/.local/share/octorag"));
    }

    #[test]
    fn test_missing_home_is_an_error() {
        assert!(resolve_unix_storage_dir(None, None).is_err());
    }
}
