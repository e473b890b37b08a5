use crate::core::fetch::{FetchSettings, DEFAULT_MAX_BYTES, DEFAULT_USER_AGENT};
use crate::core::url_guard::Ipv6Policy;
use crate::domain::model::{ProximityQuery, DEFAULT_LIMIT, DEFAULT_RADIUS_KM};
use crate::utils::error::{GardenError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Half the Earth's circumference; no two points are farther apart.
const MAX_RADIUS_KM: f64 = 20_038.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub store: StoreConfig,
    pub proximity: Option<ProximityConfig>,
    pub guard: Option<GuardConfig>,
    pub fetch: Option<FetchConfig>,
    pub resolver: Option<ResolverConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub gardens_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProximityConfig {
    pub default_radius_km: Option<f64>,
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
    pub store_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    pub ipv6_policy: Option<Ipv6Policy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_seconds: Option<u64>,
    pub max_bytes: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Static `host = "address"` overrides consulted before the OS resolver.
    pub hosts: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GardenError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GardenError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GardenError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.store.gardens_file.trim().is_empty() {
            return Err(GardenError::MissingConfigError {
                field: "store.gardens_file".to_string(),
            });
        }
        validate_path("store.gardens_file", &self.store.gardens_file)?;
        validate_file_extension("store.gardens_file", &self.store.gardens_file, &["json", "toml"])?;

        validate_range(
            "proximity.default_radius_km",
            self.default_radius_km(),
            f64::MIN_POSITIVE,
            MAX_RADIUS_KM,
        )?;
        validate_positive_number("proximity.default_limit", self.default_limit(), 1)?;
        validate_positive_number("proximity.max_limit", self.max_limit(), self.default_limit())?;
        if let Some(timeout) = self.proximity.as_ref().and_then(|p| p.store_timeout_ms) {
            validate_positive_number("proximity.store_timeout_ms", timeout as usize, 1)?;
        }

        let fetch = self.fetch_settings();
        validate_positive_number("fetch.timeout_seconds", fetch.timeout.as_secs() as usize, 1)?;
        validate_positive_number("fetch.max_bytes", fetch.max_bytes as usize, 1)?;
        validate_non_empty_string("fetch.user_agent", &fetch.user_agent)?;

        crate::adapters::dns::StaticResolver::from_table(&self.resolver_hosts())?;

        Ok(())
    }

    pub fn gardens_file(&self) -> &str {
        &self.store.gardens_file
    }

    pub fn default_radius_km(&self) -> f64 {
        self.proximity
            .as_ref()
            .and_then(|p| p.default_radius_km)
            .unwrap_or(DEFAULT_RADIUS_KM)
    }

    pub fn default_limit(&self) -> usize {
        self.proximity
            .as_ref()
            .and_then(|p| p.default_limit)
            .unwrap_or(DEFAULT_LIMIT)
    }

    pub fn max_limit(&self) -> usize {
        self.proximity
            .as_ref()
            .and_then(|p| p.max_limit)
            .unwrap_or(DEFAULT_LIMIT * 4)
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        self.proximity
            .as_ref()
            .and_then(|p| p.store_timeout_ms)
            .map(Duration::from_millis)
    }

    pub fn ipv6_policy(&self) -> Ipv6Policy {
        self.guard
            .as_ref()
            .and_then(|g| g.ipv6_policy)
            .unwrap_or_default()
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let fetch = self.fetch.clone().unwrap_or_default();
        FetchSettings {
            timeout: Duration::from_secs(fetch.timeout_seconds.unwrap_or(15)),
            max_bytes: fetch.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
            user_agent: fetch
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }

    pub fn resolver_hosts(&self) -> HashMap<String, String> {
        self.resolver
            .as_ref()
            .and_then(|r| r.hosts.clone())
            .unwrap_or_default()
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    /// Applies configured defaults and the pagination cap to caller input.
    pub fn build_query(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
        limit: Option<usize>,
    ) -> Result<ProximityQuery> {
        let limit = limit.unwrap_or_else(|| self.default_limit());
        if limit > self.max_limit() {
            return Err(GardenError::invalid_argument(
                "limit",
                format!("must not exceed {}", self.max_limit()),
            ));
        }

        Ok(ProximityQuery::new(latitude, longitude)
            .with_radius_km(radius_km.unwrap_or_else(|| self.default_radius_km()))
            .with_limit(limit))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
