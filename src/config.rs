use rocket::figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api/v1";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    pub cors: CorsConfig,
    pub sessions: SessionsConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_path: String,
    pub enable_swagger: bool,
    /// Lifetime of a member login before the cookie stops being honoured.
    pub member_session_hours: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Scheduling rules for the live-session feed.
///
/// Session dates and times are stored without an offset; they are always read
/// in `timezone`, regardless of where the server or the member is.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionsConfig {
    pub timezone: String,
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub early_join_minutes: i64,
    pub live_duration_minutes: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DirectoryConfig {
    /// JSON object mapping member e-mail to display name.
    pub names_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/ictpl_portal".to_string(),
            max_connections: 16,
            min_connections: 0,
            acquire_timeout: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            enable_swagger: true,
            member_session_hours: 12,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Kolkata".to_string(),
            poll_interval_secs: 30,
            fetch_timeout_secs: 10,
            early_join_minutes: 5,
            live_duration_minutes: 60,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            names_path: "names.json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Portal.toml (if present)
    /// 3. Environment variables prefixed with PORTAL_ (e.g. PORTAL_SESSIONS_POLL_INTERVAL_SECS)
    /// 4. DATABASE_URL
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("Portal.toml"))
            // Only the first underscore separates the section from the field,
            // so PORTAL_SESSIONS_POLL_INTERVAL_SECS -> sessions.poll_interval_secs
            .merge(Env::prefixed("PORTAL_").map(|key| key.as_str().replacen('_', ".", 1).into()))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .extract()
    }
}
