//! Configuration management for lorcon2

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{LorconError, LorconResult};

/// Main lorcon2 configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LorconConfig {
    /// Where to find liborcon2
    #[serde(default)]
    pub library: LibrarySettings,
    /// Settings applied when a context is opened
    #[serde(default)]
    pub defaults: DefaultSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// Directories searched for the shared object
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,
    /// File names tried in every search directory
    #[serde(default = "default_library_names")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// Receive timeout (milliseconds) set on every new handle
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
    /// Driver to use instead of auto-detection
    #[serde(default)]
    pub driver: Option<String>,
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/lib"),
        PathBuf::from("/usr/local/lib"),
        PathBuf::from("/usr/lib/x86_64-linux-gnu"),
    ]
}

fn default_library_names() -> Vec<String> {
    vec!["liborcon2.so".to_string(), "liborcon2.so.2".to_string()]
}

fn default_timeout_ms() -> i64 {
    100
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            names: default_library_names(),
        }
    }
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            driver: None,
        }
    }
}

impl Default for LorconConfig {
    fn default() -> Self {
        Self {
            library: LibrarySettings::default(),
            defaults: DefaultSettings::default(),
        }
    }
}

impl LorconConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> LorconResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| LorconError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| LorconError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> LorconResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LorconError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| LorconError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Candidate library paths, most specific first.
    ///
    /// Bare names come last so the system loader gets a chance too.
    pub fn library_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for dir in &self.library.search_paths {
            for name in &self.library.names {
                candidates.push(dir.join(name));
            }
        }
        for name in &self.library.names {
            candidates.push(PathBuf::from(name));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LorconConfig::default();
        assert_eq!(config.defaults.timeout_ms, 100);
        assert!(config.defaults.driver.is_none());
        assert!(config.library.names.contains(&"liborcon2.so".to_string()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lorcon.toml");

        let mut config = LorconConfig::default();
        config.defaults.timeout_ms = 250;
        config.defaults.driver = Some("mac80211".to_string());
        config.save(&path).unwrap();

        let loaded = LorconConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lorcon.toml");
        std::fs::write(&path, "[defaults]\ndriver = \"rtfile\"\n").unwrap();

        let loaded = LorconConfig::load(&path).unwrap();
        assert_eq!(loaded.defaults.driver.as_deref(), Some("rtfile"));
        assert_eq!(loaded.defaults.timeout_ms, 100);
        assert_eq!(loaded.library, LibrarySettings::default());
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            LorconConfig::load(dir.path().join("missing.toml")),
            Err(LorconError::Config(_))
        ));

        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "defaults = [").unwrap();
        assert!(matches!(LorconConfig::load(&path), Err(LorconError::Config(_))));
    }

    #[test]
    fn test_library_candidates_order() {
        let mut config = LorconConfig::default();
        config.library.search_paths = vec![PathBuf::from("/opt/lorcon/lib")];
        config.library.names = vec!["liborcon2.so".to_string()];

        assert_eq!(
            config.library_candidates(),
            vec![
                PathBuf::from("/opt/lorcon/lib/liborcon2.so"),
                PathBuf::from("liborcon2.so"),
            ]
        );
    }
}
