use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server settings, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Allowed browser origin; `*` allows any.
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("AGORA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = get("AGORA_PORT")
            .unwrap_or_else(|| "3001".into())
            .parse::<u16>()
            .context("AGORA_PORT must be a port number")?;
        let db_path: PathBuf = get("AGORA_DB_PATH").unwrap_or_else(|| "agora.db".into()).into();
        let cors_origin =
            get("AGORA_CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".into());

        Ok(Self {
            host,
            port,
            db_path,
            cors_origin,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}
