//! `outage.toml`: run configuration.
//!
//! Looked up at `$OUTAGE_SYNC_CONFIG`, else
//! `<config dir>/outage-sync/outage.toml`. A missing default file means
//! "all defaults"; a missing file named by the env var is an error.
//!
//! ```toml
//! [providers]
//! dom_base = "http://outagemap.dominionenergy.com.s3.amazonaws.com"
//! aep_base = "http://outagemap.appalachianpower.com.s3.amazonaws.com"
//! coop_url = "http://outages.vmdaec.com/data.js"
//!
//! [window]
//! max_offset = 14
//!
//! [http]
//! timeout_secs = 30
//!
//! [paths]
//! database = "/var/lib/outage-sync/outages.sqlite"
//! audit_csv = "/var/lib/outage-sync/CSV_Output.csv"
//!
//! [seed]
//! localities = "/etc/outage-sync/localities.csv"
//!
//! [regions]
//! "Region 1" = ["Henrico", "Chesterfield"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use outage_recon::RegionMap;

pub const CONFIG_ENV: &str = "OUTAGE_SYNC_CONFIG";
pub const APP_DIR: &str = "outage-sync";

pub const DEFAULT_DOM_BASE: &str = "http://outagemap.dominionenergy.com.s3.amazonaws.com";
pub const DEFAULT_AEP_BASE: &str = "http://outagemap.appalachianpower.com.s3.amazonaws.com";
pub const DEFAULT_COOP_URL: &str = "http://outages.vmdaec.com/data.js";

/// Buckets are `{0,15,30,45} + offset`; anything above 14 would spill
/// past minute 59.
pub const MAX_WINDOW_OFFSET: u32 = 14;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("config validation error: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub providers: ProviderConfig,
    pub window: WindowConfig,
    pub http: HttpConfig,
    pub paths: PathsConfig,
    pub seed: SeedConfig,
    /// Region name -> member locality names.
    pub regions: RegionMap,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub dom_base: String,
    pub aep_base: String,
    pub coop_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            dom_base: DEFAULT_DOM_BASE.to_string(),
            aep_base: DEFAULT_AEP_BASE.to_string(),
            coop_url: DEFAULT_COOP_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Largest minute offset tried after each quarter hour.
    pub max_offset: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { max_offset: MAX_WINDOW_OFFSET }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("outage-sync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub database: PathBuf,
    pub audit_csv: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let dir = dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            database: dir.join("outages.sqlite"),
            audit_csv: dir.join("CSV_Output.csv"),
        }
    }
}

/// Optional CSV files holding the authoritative entity set per table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedConfig {
    pub provider_localities: Option<PathBuf>,
    pub localities: Option<PathBuf>,
    pub regions: Option<PathBuf>,
}

impl SyncConfig {
    /// Parse and validate a TOML string.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `$OUTAGE_SYNC_CONFIG` or the default location.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }
        match default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.max_offset > MAX_WINDOW_OFFSET {
            return Err(ConfigError::Invalid(format!(
                "window.max_offset must be <= {MAX_WINDOW_OFFSET}, got {}",
                self.window.max_offset
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be > 0".into()));
        }
        for (field, url) in [
            ("providers.dom_base", &self.providers.dom_base),
            ("providers.aep_base", &self.providers.aep_base),
            ("providers.coop_url", &self.providers.coop_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        for (region, members) in &self.regions {
            if members.is_empty() {
                return Err(ConfigError::Invalid(format!("region '{region}' has no localities")));
            }
        }
        Ok(())
    }
}

/// `<config dir>/outage-sync/outage.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("outage.toml"))
}
