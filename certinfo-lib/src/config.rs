//! Configuration file handling.
//!
//! The file is TOML and optional. It describes the trust-store catalog and a
//! few defaults the command line can override:
//!
//! ```toml
//! timeout = "10s"
//! format = "json"
//!
//! [[trust_store]]
//! name = "Mozilla"
//! version = "2024-06"
//! path = "stores/mozilla.pem"
//! primary = true
//!
//! [[trust_store]]
//! name = "Apple"
//! version = "iOS 17"
//! path = "stores/apple.pem"
//! ```
//!
//! Relative store paths are resolved against the directory of the file.

use crate::report::OutputFormat;
use crate::CertinfoError;
use directories::ProjectDirs;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Socket timeout used when neither the file nor the command line sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Socket connect/read/write timeout.
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub timeout: Option<Duration>,

    /// Default report format.
    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Trust-store catalog, in display order.
    #[serde(default, rename = "trust_store")]
    pub trust_stores: Vec<TrustStoreEntry>,
}

/// One `[[trust_store]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustStoreEntry {
    pub name: String,
    pub version: String,
    /// PEM bundle with the store's anchors.
    pub path: PathBuf,
    /// Marks the reference store. At most one entry may set it; without
    /// any, the first entry is primary.
    #[serde(default)]
    pub primary: bool,
    /// EV policy OIDs. Only read for the primary store, which falls back
    /// to the built-in list when unset.
    #[serde(default)]
    pub ev_oids: Option<Vec<String>>,
}

fn deserialize_duration<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
    let raw = String::deserialize(d)?;
    humantime::parse_duration(&raw)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

impl Config {
    /// Platform location of the configuration file, e.g.
    /// `~/.config/certinfo/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "certinfo").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one the platform default is
    /// tried, and a missing file yields the default configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CertinfoError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, CertinfoError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CertinfoError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::from_toml(&content, base)
            .map_err(|e| CertinfoError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), stores = config.trust_stores.len(), "loaded configuration");
        Ok(config)
    }

    /// Parse TOML text, resolving relative store paths against `base`.
    pub fn from_toml(content: &str, base: &Path) -> Result<Self, CertinfoError> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| CertinfoError::Config(e.to_string()))?;

        if config.trust_stores.iter().filter(|e| e.primary).count() > 1 {
            return Err(CertinfoError::Config(
                "more than one trust_store is marked primary".into(),
            ));
        }
        for entry in &mut config.trust_stores {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
        Ok(config)
    }

    pub fn timeout_or_default(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Index of the primary entry, if the catalog is not empty.
    pub fn primary_index(&self) -> Option<usize> {
        if self.trust_stores.is_empty() {
            return None;
        }
        Some(
            self.trust_stores
                .iter()
                .position(|e| e.primary)
                .unwrap_or(0),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = Config::from_toml("", Path::new("/")).unwrap();
        assert!(config.trust_stores.is_empty());
        assert_eq!(config.primary_index(), None);
        assert_eq!(config.timeout_or_default(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn parses_catalog_and_defaults() {
        let text = r#"
            timeout = "1m 30s"
            format = "json"

            [[trust_store]]
            name = "Mozilla"
            version = "2024"
            path = "mozilla.pem"

            [[trust_store]]
            name = "Apple"
            version = "17"
            path = "/abs/apple.pem"
            primary = true
            ev_oids = ["2.23.140.1.1"]
        "#;
        let config = Config::from_toml(text, Path::new("/etc/certinfo")).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.format, Some(OutputFormat::Json));
        assert_eq!(config.trust_stores.len(), 2);
        assert_eq!(
            config.trust_stores[0].path,
            PathBuf::from("/etc/certinfo/mozilla.pem")
        );
        assert_eq!(config.trust_stores[1].path, PathBuf::from("/abs/apple.pem"));
        assert_eq!(config.primary_index(), Some(1));
    }

    #[test]
    fn first_store_is_primary_by_default() {
        let text = r#"
            [[trust_store]]
            name = "A"
            version = "1"
            path = "a.pem"
        "#;
        let config = Config::from_toml(text, Path::new(".")).unwrap();
        assert_eq!(config.primary_index(), Some(0));
    }

    #[test]
    fn two_primaries_are_rejected() {
        let text = r#"
            [[trust_store]]
            name = "A"
            version = "1"
            path = "a.pem"
            primary = true

            [[trust_store]]
            name = "B"
            version = "1"
            path = "b.pem"
            primary = true
        "#;
        let err = Config::from_toml(text, Path::new(".")).unwrap_err();
        assert!(matches!(err, CertinfoError::Config(_)));
    }

    #[test]
    fn bad_duration_is_a_config_error() {
        let err = Config::from_toml("timeout = \"soon\"", Path::new(".")).unwrap_err();
        assert!(matches!(err, CertinfoError::Config(_)));
    }

    #[test]
    fn load_from_file_uses_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[[trust_store]]\nname = \"A\"\nversion = \"1\"\npath = \"a.pem\"\n",
        )
        .unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.trust_stores[0].path, dir.path().join("a.pem"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/certinfo.toml"))).is_err());
    }
}
