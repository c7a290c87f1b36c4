use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::auth::password::DEFAULT_PASSWORD_COST;

#[derive(Deserialize, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub base_url: String,
    pub database_url: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("jwt_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("database_url", &"<redacted>")
            .field("listen_addr", &self.listen_addr)
            .field("image_dir", &self.image_dir)
            .field("log_dir", &self.log_dir)
            .field("password_cost", &self.password_cost)
            .finish()
    }
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    jwt_secret: Option<String>,
    base_url: Option<String>,
    database_url: Option<String>,
    listen_addr: Option<String>,
    image_dir: Option<String>,
    log_dir: Option<String>,
    password_cost: Option<u32>,
}

impl PartialServerConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let password_cost = match lookup("PASSWORD_COST") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u32>()
                    .map_err(|e| format!("PASSWORD_COST must be an integer: {e}"))?,
            ),
            None => None,
        };

        Ok(PartialServerConfig {
            jwt_secret: lookup("JWT_SECRET"),
            base_url: lookup("BASE_URL"),
            database_url: lookup("DATABASE_URL"),
            listen_addr: lookup("LISTEN_ADDR"),
            image_dir: lookup("IMAGE_DIR"),
            log_dir: lookup("LOG_DIR"),
            password_cost,
        })
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_image_dir() -> String {
    "images".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_password_cost() -> u32 {
    DEFAULT_PASSWORD_COST
}

impl ServerConfig {
    /// Builds the process-wide configuration. Called once at startup; the
    /// result is shared read-only from then on.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let path = Path::new(path_str);
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            }
            Some(path_str) => return Err(format!("Config file {path_str} does not exist")),
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_lookup(|key| env::var(key).ok())?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(primary: PartialServerConfig, fallback: PartialServerConfig) -> Result<Self, String> {
        let jwt_secret = primary
            .jwt_secret
            .or(fallback.jwt_secret)
            .filter(|secret| !secret.is_empty())
            .ok_or("JWT_SECRET is required")?;

        let mut base_url = primary
            .base_url
            .or(fallback.base_url)
            .ok_or("BASE_URL is required")?;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let database_url = primary
            .database_url
            .or(fallback.database_url)
            .ok_or("DATABASE_URL is required")?;

        let password_cost = primary
            .password_cost
            .or(fallback.password_cost)
            .unwrap_or_else(default_password_cost);
        if !(4..=31).contains(&password_cost) {
            return Err(format!("PASSWORD_COST must be between 4 and 31, got {password_cost}"));
        }

        Ok(ServerConfig {
            jwt_secret,
            base_url,
            database_url,
            listen_addr: primary
                .listen_addr
                .or(fallback.listen_addr)
                .unwrap_or_else(default_listen_addr),
            image_dir: primary
                .image_dir
                .or(fallback.image_dir)
                .unwrap_or_else(default_image_dir),
            log_dir: primary
                .log_dir
                .or(fallback.log_dir)
                .unwrap_or_else(default_log_dir),
            password_cost,
        })
    }
}
