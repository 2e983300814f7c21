use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Variables that must be present (and non-empty) before anything starts.
pub const REQUIRED_ENV_VARS: [&str; 4] = ["MONGODB_URL", "CLOUD_NAME", "API_KEY", "API_SECRET"];

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_ENVIRONMENT: &str = "development";
/// 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// A string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Which connection-options variant to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbProfile {
    /// Single pooled connection, no write flags.
    #[default]
    Minimal,
    /// Pool of ten with retryable writes and majority write concern.
    Standard,
}

impl FromStr for DbProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            other => Err(ConfigError::Invalid {
                var: "DB_PROFILE".into(),
                reason: format!("expected 'minimal' or 'standard', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for DbProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

/// Cloudinary credentials.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: Secret,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: u64,
    pub temp_dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_UPLOAD_BYTES,
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Everything the server needs, read from the process environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Secret,
    pub db_profile: DbProfile,
    pub media: MediaConfig,
    pub port: u16,
    pub frontend_url: String,
    pub environment: String,
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing = missing_env_vars(&get);
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let required = |key: &str| get(key).unwrap_or_default();

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT".into(),
                reason: format!("'{raw}' is not a valid port: {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let db_profile = match get("DB_PROFILE") {
            Some(raw) => raw.parse()?,
            None => DbProfile::default(),
        };

        let mut upload = UploadConfig::default();
        if let Some(dir) = get("UPLOAD_TMP_DIR") {
            upload.temp_dir = PathBuf::from(dir);
        }

        Ok(Self {
            database_url: Secret::new(required("MONGODB_URL")),
            db_profile,
            media: MediaConfig {
                cloud_name: required("CLOUD_NAME"),
                api_key: required("API_KEY"),
                api_secret: Secret::new(required("API_SECRET")),
            },
            port,
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            environment: get("APP_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            upload,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

/// Names of required variables the lookup cannot resolve, in declaration order.
pub fn missing_env_vars<F>(lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_ENV_VARS
        .iter()
        .filter(|key| lookup(key).map_or(true, |v| v.trim().is_empty()))
        .map(|key| key.to_string())
        .collect()
}
