use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};

/// Source that produced the station configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Tunables for one gate station. Every field has a default so partial
/// files only need to name what they change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// Base url of the roster API. A missing scheme is filled in with
    /// `http://` and a trailing slash is dropped.
    pub server_url: String,
    /// Bearer token attached to every roster request.
    pub api_token: Option<String>,
    /// Prefix for shareable gate links; the gate id is appended.
    pub station_base_url: String,
    /// Number of attendees shown per queue page.
    pub page_size: u32,
    /// Quiet period (ms) after the last keystroke before a search runs.
    pub search_debounce_ms: u64,
    /// How many roster pages a search fetches at once. `0` fetches every
    /// remaining page at the same time.
    pub search_concurrency: usize,
    /// Refresh period (s) for the roster-size badge. `0` disables polling.
    pub badge_poll_interval_secs: u64,
    /// HTTP client timeout (s).
    pub request_timeout_secs: u64,
    /// Use the batched endpoint for bulk check-in instead of one request
    /// per attendee.
    pub batched_check_in: bool,
    /// Re-arm the camera after a decoded code has been handled.
    pub resume_scan_after_decode: bool,
    /// Capacity of the session event channel.
    pub event_capacity: usize,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            api_token: None,
            station_base_url: "http://localhost:3000/gates".to_string(),
            page_size: 10,
            search_debounce_ms: 500,
            search_concurrency: 4,
            badge_poll_interval_secs: 30,
            request_timeout_secs: 30,
            batched_check_in: true,
            resume_scan_after_decode: true,
            event_capacity: 256,
        }
    }
}

impl StationConfig {
    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$GATEKEEP_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$GATEKEEP_CONFIG_JSON` (inline JSON),
    /// 3) the first default file that exists,
    /// 4) defaults.
    ///
    /// `GATEKEEP_SERVER_URL` and `GATEKEEP_API_TOKEN` override whatever the
    /// chosen source says.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        let (mut config, source) = Self::load_base()?;

        if let Ok(url) = env::var("GATEKEEP_SERVER_URL")
            && !url.trim().is_empty()
        {
            config.server_url = url;
        }
        if let Ok(token) = env::var("GATEKEEP_API_TOKEN")
            && !token.trim().is_empty()
        {
            config.api_token = Some(token);
        }

        config.validate()?;
        Ok((config, source))
    }

    fn load_base() -> anyhow::Result<(Self, ConfigSource)> {
        if let Ok(path_str) = env::var("GATEKEEP_CONFIG_PATH")
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var("GATEKEEP_CONFIG_JSON")
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .context("failed to parse GATEKEEP_CONFIG_JSON")?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read station config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid station config {}", path.display())
            }),
            Some("toml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid station config {}: {}", path.display(), err)
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // Try TOML first, then JSON.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse station config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid station config json: {err}"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server_url.trim().is_empty() {
            bail!("server_url must not be empty");
        }
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        Ok(())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn badge_poll_interval(&self) -> Option<Duration> {
        (self.badge_poll_interval_secs > 0)
            .then(|| Duration::from_secs(self.badge_poll_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "gatekeep.toml",
            "gatekeep.json",
            "config/gatekeep.toml",
            "config/gatekeep.json",
        ];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "page_size = 25\nbatched_check_in = false").unwrap();

        let config = StationConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.page_size, 25);
        assert!(!config.batched_check_in);
        assert_eq!(config.search_debounce_ms, 500);
    }

    #[test]
    fn extensionless_file_falls_back_to_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server_url": "gates.example:8080"}}"#).unwrap();

        let config = StationConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.server_url, "gates.example:8080");
    }

    #[test]
    fn unreadable_config_reports_both_parsers() {
        let err = StationConfig::parse_from_str("page_size = [", "inline")
            .unwrap_err()
            .to_string();
        assert!(err.contains("toml error"));
        assert!(err.contains("json error"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = StationConfig {
            page_size: 0,
            ..StationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_interval_disables_badge_polling() {
        let config = StationConfig {
            badge_poll_interval_secs: 0,
            ..StationConfig::default()
        };
        assert_eq!(config.badge_poll_interval(), None);
    }
}
