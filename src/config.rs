use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// Default session lifetime: roughly one month, in milliseconds.
pub const DEFAULT_SESSION_TTL_MS: i64 = 2_629_800_000;
/// Default period between two expiry sweeps, in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 3_000;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The URL of the PostgreSQL database holding accounts, if any.
    pub database_url: Option<String>,
    /// The directory holding one JSON document per live session.
    pub sessions_dir: PathBuf,
    /// The secret used to sign login tokens.
    pub token_secret: Zeroizing<String>,
    /// How long a session lives after creation or refresh, in milliseconds.
    pub session_ttl_ms: i64,
    /// The period of the expired-session sweep.
    pub sweep_interval: Duration,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a `Config` from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret = lookup("SERVER_SECRET_TOKEN_KEY")
            .filter(|s| !s.is_empty())
            .context("SERVER_SECRET_TOKEN_KEY must be set (generate with: openssl rand -hex 32)")?;

        let host: IpAddr = lookup("SERVER_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse()
            .context("Invalid SERVER_HOST")?;
        let port: u16 = lookup("SERVER_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        let session_ttl_ms: i64 = match lookup("SESSION_TTL_MS") {
            Some(raw) => raw.parse().context("Invalid SESSION_TTL_MS")?,
            None => DEFAULT_SESSION_TTL_MS,
        };
        if session_ttl_ms <= 0 {
            anyhow::bail!("SESSION_TTL_MS must be greater than zero");
        }

        let sweep_interval_ms: u64 = match lookup("SESSION_SWEEP_INTERVAL_MS") {
            Some(raw) => raw.parse().context("Invalid SESSION_SWEEP_INTERVAL_MS")?,
            None => DEFAULT_SWEEP_INTERVAL_MS,
        };
        if sweep_interval_ms == 0 {
            anyhow::bail!("SESSION_SWEEP_INTERVAL_MS must be greater than zero");
        }

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            sessions_dir: lookup("SESSIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./sessions")),
            token_secret: Zeroizing::new(token_secret),
            session_ttl_ms,
            sweep_interval: Duration::from_millis(sweep_interval_ms),
            allowed_origins,
        })
    }
}
