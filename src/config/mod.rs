//! Configuration management for talkback

mod file;

use std::path::PathBuf;
use std::time::Duration;

pub use file::{TalkbackConfigFile, config_file_path, load_config_file, load_from};

use crate::platform::PlatformKind;
use crate::{Error, Result};

/// Default request timeout for a single upload
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// talkback configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Assistant service base URL (e.g. `http://10.0.0.2:8000`)
    ///
    /// Optional at load time; a turn cannot be uploaded without it
    pub endpoint: Option<String>,

    /// Which platform branch to run
    pub platform: PlatformKind,

    /// Directory for the recording and the cached reply
    pub cache_dir: PathBuf,

    /// Upload request timeout
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            platform: PlatformKind::Native,
            cache_dir: default_cache_dir(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Default cache directory: `~/.cache/talkback/`
fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cache/talkback"),
        |d| d.cache_dir().join("talkback"),
    )
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn load() -> Result<Self> {
        let fc = load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an env lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn from_sources<F>(env: F, fc: TalkbackConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = env("TALKBACK_ENDPOINT")
            .or(fc.server.endpoint)
            .filter(|s| !s.trim().is_empty());

        let platform = match env("TALKBACK_PLATFORM").or(fc.device.platform) {
            Some(s) => s.parse()?,
            None => PlatformKind::Native,
        };

        let cache_dir = env("TALKBACK_CACHE_DIR")
            .or(fc.device.cache_dir)
            .map_or_else(default_cache_dir, PathBuf::from);

        let timeout_secs = match env("TALKBACK_TIMEOUT_SECS") {
            Some(s) => s
                .parse()
                .map_err(|_| Error::Config(format!("invalid TALKBACK_TIMEOUT_SECS: {s}")))?,
            None => fc.server.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        if endpoint.is_none() {
            tracing::warn!("no endpoint configured - set TALKBACK_ENDPOINT");
        }

        Ok(Self {
            endpoint,
            platform,
            cache_dir,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(env_from(&[]), TalkbackConfigFile::default()).unwrap();
        assert!(config.endpoint.is_none());
        assert_eq!(config.platform, PlatformKind::Native);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut fc = TalkbackConfigFile::default();
        fc.server.endpoint = Some("http://file:8000".to_string());
        fc.device.platform = Some("native".to_string());

        let config = Config::from_sources(
            env_from(&[
                ("TALKBACK_ENDPOINT", "http://env:9000"),
                ("TALKBACK_PLATFORM", "browser"),
                ("TALKBACK_CACHE_DIR", "/tmp/talkback-test"),
            ]),
            fc,
        )
        .unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("http://env:9000"));
        assert_eq!(config.platform, PlatformKind::Browser);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/talkback-test"));
    }

    #[test]
    fn test_blank_endpoint_is_unset() {
        let config = Config::from_sources(
            env_from(&[("TALKBACK_ENDPOINT", "   ")]),
            TalkbackConfigFile::default(),
        )
        .unwrap();
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_invalid_platform() {
        let err = Config::from_sources(
            env_from(&[("TALKBACK_PLATFORM", "toaster")]),
            TalkbackConfigFile::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = Config::from_sources(
            env_from(&[("TALKBACK_TIMEOUT_SECS", "soon")]),
            TalkbackConfigFile::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
