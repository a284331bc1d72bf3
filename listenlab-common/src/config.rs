//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the root folder
pub const ROOT_ENV_VAR: &str = "LISTENLAB_ROOT";

/// Service configuration loaded from `study.toml` under the root folder.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyConfig {
    /// Bind host for the HTTP server
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port for the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,
    /// Folder key holding sentence stimuli
    #[serde(default = "default_sentence_folder")]
    pub sentence_folder: String,
    /// Folder key holding word stimuli
    #[serde(default = "default_word_folder")]
    pub word_folder: String,
    /// Metadata CSV reference for sentence stimuli
    #[serde(default = "default_sentence_metadata")]
    pub sentence_metadata: String,
    /// Metadata CSV reference for word stimuli
    #[serde(default = "default_word_metadata")]
    pub word_metadata: String,
    /// Base URL of the remote content store; local content is used when unset
    #[serde(default)]
    pub content_base_url: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_sentence_folder() -> String {
    "sentences".to_string()
}

fn default_word_folder() -> String {
    "words".to_string()
}

fn default_sentence_metadata() -> String {
    "sentences_metadata.csv".to_string()
}

fn default_word_metadata() -> String {
    "words_metadata.csv".to_string()
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sentence_folder: default_sentence_folder(),
            word_folder: default_word_folder(),
            sentence_metadata: default_sentence_metadata(),
            word_metadata: default_word_metadata(),
            content_base_url: None,
        }
    }
}

impl StudyConfig {
    /// Load `study.toml` from the root folder, falling back to defaults when
    /// the file is absent. A present-but-malformed file is a fatal
    /// configuration error, not a silent fallback.
    pub fn load(root_folder: &Path) -> Result<Self> {
        let path = root_folder.join("study.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. `LISTENLAB_ROOT` environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = locate_config_file() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            if let Some(root) = root_folder_from_toml(&content) {
                return root;
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Find the platform config file, user config preferred over system config
fn locate_config_file() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("listenlab").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/listenlab/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Pull the `root_folder` key out of a config file body, if present
fn root_folder_from_toml(content: &str) -> Option<PathBuf> {
    toml::from_str::<toml::Value>(content)
        .ok()?
        .get("root_folder")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("listenlab"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/listenlab"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("listenlab"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/listenlab"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("listenlab"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\listenlab"))
    } else {
        PathBuf::from("./listenlab_data")
    }
}

/// Ensure the root folder exists, creating it on first run
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(root_folder)?;
    Ok(())
}

/// Database file path under the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("listenlab.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_wins() {
        let root = resolve_root_folder(Some("/tmp/listenlab-test"));
        assert_eq!(root, PathBuf::from("/tmp/listenlab-test"));
    }

    #[test]
    fn config_file_root_folder_key_is_honored() {
        assert_eq!(
            root_folder_from_toml("root_folder = \"/srv/listenlab\"\nport = 9000\n"),
            Some(PathBuf::from("/srv/listenlab"))
        );
    }

    #[test]
    fn config_file_without_root_folder_key_is_skipped() {
        assert_eq!(root_folder_from_toml("port = 9000\n"), None);
    }

    #[test]
    fn malformed_config_file_is_skipped_for_root_resolution() {
        assert_eq!(root_folder_from_toml("root_folder = [not toml"), None);
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StudyConfig::load(dir.path()).unwrap();
        assert_eq!(config.port, 5780);
        assert_eq!(config.sentence_folder, "sentences");
        assert!(config.content_base_url.is_none());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("study.toml"),
            "port = 8123\nword_folder = \"word_clips\"\n",
        )
        .unwrap();
        let config = StudyConfig::load(dir.path()).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.word_folder, "word_clips");
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn malformed_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("study.toml"), "port = \"not a port\"").unwrap();
        assert!(matches!(
            StudyConfig::load(dir.path()),
            Err(crate::Error::Config(_))
        ));
    }
}
