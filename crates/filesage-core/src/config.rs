use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::compare::{CompareOptions, DEFAULT_PARTIAL_SAMPLE};
use crate::reader::{HttpOptions, DEFAULT_CHUNK_SIZE};

/// HTTP transfer settings (optional `[http]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    /// Optional User-Agent header; curl's default when unset.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            user_agent: None,
        }
    }
}

/// Global configuration loaded from `~/.config/filesage/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesageConfig {
    /// Chunk size for local streams, in bytes.
    pub chunk_size: usize,
    /// Bytes sampled at each end by partial-hash.
    pub partial_sample_bytes: u64,
    /// Report a fingerprint match as equal.
    pub trust_fingerprint: bool,
    /// Report a head/tail digest match as equal.
    pub trust_partial_hash: bool,
    pub http: HttpConfig,
}

impl Default for FilesageConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            partial_sample_bytes: DEFAULT_PARTIAL_SAMPLE,
            trust_fingerprint: false,
            trust_partial_hash: false,
            http: HttpConfig::default(),
        }
    }
}

impl FilesageConfig {
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            low_speed_limit: self.http.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(self.http.low_speed_time_secs),
            user_agent: self.http.user_agent.clone(),
            ..HttpOptions::default()
        }
    }

    /// Strategy options; a zero chunk size falls back to the default.
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            chunk_size: if self.chunk_size == 0 {
                DEFAULT_CHUNK_SIZE
            } else {
                self.chunk_size
            },
            partial_sample_bytes: self.partial_sample_bytes,
            trust_fingerprint: self.trust_fingerprint,
            trust_partial_hash: self.trust_partial_hash,
            http: self.http_options(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("filesage")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FilesageConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FilesageConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FilesageConfig = toml::from_str(&data)?;
    Ok(cfg)
}
