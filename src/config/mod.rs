// src/config/mod.rs
// All values come from the environment (.env supported), with sane defaults.

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct NudgeableConfig {
    // ── Server Configuration
    pub host: String,
    pub port: u16,

    // ── Database Configuration
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Authentication
    // Static credential list: "alice:secret,bob:hunter2". Lazily creates a
    // user row on first successful login.
    pub users: String,
    pub cookie_secure: bool,

    // ── Gemini Configuration
    pub gemini_model: String,
    pub chat_temperature: f32,
    pub model_timeout: u64,

    // ── CORS Settings
    pub cors_origin: String,

    // ── Logging Configuration
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            // Tolerate trailing comments and whitespace in .env values
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {key} = '{val}' (parse failed, using default)");
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl NudgeableConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        Self {
            host: env_var_or("NUDGEABLE_HOST", "0.0.0.0".to_string()),
            port: env_var_or("NUDGEABLE_PORT", 3001),
            database_url: env_var_or("DATABASE_URL", "sqlite:./nudgeable.db".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 10),
            users: env_var_or("USERS", String::new()),
            cookie_secure: env_var_or("NUDGEABLE_COOKIE_SECURE", false),
            gemini_model: env_var_or("GEMINI_MODEL", "gemini-2.5-flash".to_string()),
            chat_temperature: env_var_or("NUDGEABLE_CHAT_TEMPERATURE", 0.5),
            model_timeout: env_var_or("NUDGEABLE_MODEL_TIMEOUT", 60),
            cors_origin: env_var_or("NUDGEABLE_CORS_ORIGIN", "http://localhost:3000".to_string()),
            log_level: env_var_or("NUDGEABLE_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Model call timeout in milliseconds
    pub fn model_timeout_ms(&self) -> u64 {
        self.model_timeout * 1000
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<NudgeableConfig> = Lazy::new(NudgeableConfig::from_env);
