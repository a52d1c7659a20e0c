use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3050";
const DEFAULT_DATA_FILE: &str = "meditrack.json";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File(PathBuf),
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
}

impl Config {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be host:port")?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
        let kind = lookup("STORE_BACKEND").unwrap_or_else(|| {
            if database_url.is_some() { "postgres" } else { "file" }.to_string()
        });

        let backend = match kind.to_ascii_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "file" => StoreBackend::File(
                lookup("DATA_FILE")
                    .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string())
                    .into(),
            ),
            "postgres" => {
                let database_url = database_url
                    .ok_or_else(|| anyhow!("STORE_BACKEND=postgres requires DATABASE_URL"))?;
                let max_connections = match lookup("DB_MAX_CONNECTIONS") {
                    Some(v) => v
                        .parse()
                        .context("DB_MAX_CONNECTIONS must be a positive integer")?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                StoreBackend::Postgres {
                    database_url,
                    max_connections,
                }
            }
            other => return Err(anyhow!("Unknown STORE_BACKEND `{}`", other)),
        };

        Ok(Self { bind_addr, backend })
    }
}
