use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:atrium.db".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on the session cookie.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Public base URL of the site, used to build password-reset links.
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5080,
            cors_allowed_origins: vec![
                "http://localhost:5080".to_string(),
                "http://127.0.0.1:5080".to_string(),
            ],
            secure_cookies: true,
            public_url: "http://localhost:5080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens. Must be set (config file or
    /// the `ATRIUM_JWT_SECRET` environment variable) before the server starts.
    pub jwt_secret: String,

    /// Session token lifetime in days.
    pub token_expiry_days: i64,

    /// Lifetime of a password-reset token in minutes.
    pub reset_token_expiry_minutes: i64,

    pub lockout: LockoutConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_days: 7,
            reset_token_expiry_minutes: 10,
            lockout: LockoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Failed attempts before the account is locked.
    pub max_attempts: i32,

    /// How long a lockout lasts once triggered.
    pub lock_duration_minutes: i64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration_minutes: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });

        config.apply_env_overrides();

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over the config file so secrets can stay out
    /// of it entirely.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("ATRIUM_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(path) = std::env::var("ATRIUM_DATABASE_PATH") {
            self.general.database_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!(
                "auth.jwt_secret is not set. Configure it in config.toml or via ATRIUM_JWT_SECRET"
            );
        }
        if self.auth.jwt_secret.len() < 32 {
            bail!("auth.jwt_secret must be at least 32 characters");
        }
        if self.auth.token_expiry_days < 1 {
            bail!("auth.token_expiry_days must be at least 1");
        }
        if self.auth.reset_token_expiry_minutes < 1 {
            bail!("auth.reset_token_expiry_minutes must be at least 1");
        }
        if self.auth.lockout.max_attempts < 1 {
            bail!("auth.lockout.max_attempts must be at least 1");
        }
        if self.auth.lockout.lock_duration_minutes < 1 {
            bail!("auth.lockout.lock_duration_minutes must be at least 1");
        }
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    pub fn create_default_if_missing() -> Result<()> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            info!("Config already exists at: {}", path.display());
            return Ok(());
        }
        Self::default().save_to_path(&path)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("atrium").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".atrium").join("config.toml"));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = "a".repeat(32);
        config
    }

    #[test]
    fn test_validate_accepts_defaults_with_secret() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_lockout_threshold() {
        let mut config = valid_config();
        config.auth.lockout.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
