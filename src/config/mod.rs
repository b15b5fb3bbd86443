//! Configuration management

use crate::server::DEFAULT_BACKLOG;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub server: ServerConfig,
}

/// General settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Socket directory
    pub runtime_dir: Option<PathBuf>,
}

/// Settings applied once a socket has been bound
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Backlog passed to listen(2)
    pub backlog: u32,

    /// Remove the socket file when a held server exits
    pub remove_on_exit: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            backlog: DEFAULT_BACKLOG,
            remove_on_exit: true,
        }
    }
}

impl Config {
    /// Load config from the default file, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, or return defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config {:?}", path))?;
            Ok(config)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("udsboot")
            .join("config.toml")
    }

    /// Get the runtime directory for sockets
    pub fn runtime_dir(&self) -> PathBuf {
        self.general
            .runtime_dir
            .clone()
            .or_else(dirs::runtime_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("udsboot")
    }

    /// Get socket path for a named server
    pub fn socket_path(&self, name: &str) -> PathBuf {
        self.runtime_dir().join(format!("{}.sock", name))
    }

    /// Whether the socket file should be removed when a bind command exits.
    ///
    /// Only a held server cleans up after itself; a plain bind leaves the
    /// socket file on disk for whoever adopts the path next.
    pub fn cleans_up_on_exit(&self, held: bool, keep: bool) -> bool {
        held && !keep && self.server.remove_on_exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.server.backlog, DEFAULT_BACKLOG);
        assert!(config.server.remove_on_exit);
        assert!(config.general.runtime_dir.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbacklog = 16\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.backlog, 16);
        assert!(config.server.remove_on_exit);
    }

    #[test]
    fn test_runtime_dir_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "[general]\nruntime_dir = {:?}\n\n[server]\nremove_on_exit = false\n",
                dir.path().display().to_string()
            ),
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.runtime_dir(), dir.path().join("udsboot"));
        assert_eq!(
            config.socket_path("agent"),
            dir.path().join("udsboot").join("agent.sock")
        );
        assert!(!config.server.remove_on_exit);
    }

    #[test]
    fn test_only_held_servers_remove_their_socket() {
        let config = Config::default();
        assert!(config.cleans_up_on_exit(true, false));
        assert!(!config.cleans_up_on_exit(true, true));
        assert!(!config.cleans_up_on_exit(false, false));
        assert!(!config.cleans_up_on_exit(false, true));

        let mut config = Config::default();
        config.server.remove_on_exit = false;
        assert!(!config.cleans_up_on_exit(true, false));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbacklog = \"many\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
