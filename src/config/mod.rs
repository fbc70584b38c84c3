use std::env;
use std::path::PathBuf;

/// Session cookies are signed with a key built from the configured secret;
/// the key constructor requires at least this many bytes of input.
pub const MIN_SESSION_SECRET_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// PostgreSQL connection string. Presence selects the networked backend.
    pub database_url: Option<String>,
    pub production: bool,
    /// Directory holding the embedded SQLite file in development mode.
    pub data_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub admin_password: String,
    pub session_secret: String,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Reads the full configuration surface from the environment. Secrets
    /// have no fallback; a missing one fails startup with a clear message.
    pub fn load_from_env() -> Result<Self, String> {
        let config = Self {
            bind_addr: env::var("CONTACTS_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: env::var("CONTACTS_DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            production: env::var("CONTACTS_ENV").is_ok_and(|v| v == "production"),
            data_dir: PathBuf::from(
                env::var("CONTACTS_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            ),
            assets_dir: PathBuf::from(
                env::var("CONTACTS_ASSETS_DIR").unwrap_or_else(|_| "assets".to_string()),
            ),
            admin_password: env::var("CONTACTS_ADMIN_PASSWORD")
                .map_err(|_| "CONTACTS_ADMIN_PASSWORD is required".to_string())?,
            session_secret: env::var("CONTACTS_SESSION_SECRET")
                .map_err(|_| "CONTACTS_SESSION_SECRET is required".to_string())?,
            max_body_bytes: env::var("CONTACTS_MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(16 * 1024),
        };
        validate_startup_config(&config)?;
        Ok(config)
    }

    /// Where the embedded backend keeps its database file. Production mode
    /// targets the system temp directory, matching serverless filesystems
    /// where only /tmp is writable.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        if self.production {
            env::temp_dir().join("contacts.sqlite")
        } else {
            self.data_dir.join("contacts.sqlite")
        }
    }
}

pub fn validate_startup_config(config: &ServerConfig) -> Result<(), String> {
    if config.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(format!("invalid bind address: {}", config.bind_addr));
    }
    if config.admin_password.is_empty() {
        return Err("admin password must not be empty".to_string());
    }
    if config.session_secret.len() < MIN_SESSION_SECRET_BYTES {
        return Err(format!(
            "session secret must be at least {MIN_SESSION_SECRET_BYTES} bytes"
        ));
    }
    if config.max_body_bytes == 0 {
        return Err("max body bytes must be > 0".to_string());
    }
    Ok(())
}
