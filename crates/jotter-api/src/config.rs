//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `FILE_STORAGE_PATH` | `uploads` |
//! | `MAX_UPLOAD_BYTES` | `10485760` |
//! | `ALLOWED_ORIGINS` | `http://localhost,http://localhost:3000` |
//! | `ATTACHMENT_GC_ON_START` | `false` |
//!
//! `.env` is loaded by the binary before this runs.

use jotter_core::{defaults, Error, Result};
use std::net::SocketAddr;

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub file_storage_path: String,
    pub max_upload_bytes: usize,
    pub allowed_origins: String,
    pub gc_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            file_storage_path: defaults::FILE_STORAGE_PATH.to_string(),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            allowed_origins: defaults::ALLOWED_ORIGINS.to_string(),
            gc_on_start: false,
        }
    }
}

impl ServerConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys take their
    /// default; values that fail to parse are a `Error::Config`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base = Self::default();

        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("PORT '{}' is not a valid port: {}", v, e)))?,
            None => base.port,
        };

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(v) => {
                let n: usize = v.trim().parse().map_err(|e| {
                    Error::Config(format!("MAX_UPLOAD_BYTES '{}' is not a number: {}", v, e))
                })?;
                if n == 0 {
                    return Err(Error::Config("MAX_UPLOAD_BYTES must be > 0".into()));
                }
                n
            }
            None => base.max_upload_bytes,
        };

        let gc_on_start = match get("ATTACHMENT_GC_ON_START") {
            Some(v) => crate::query_types::parse_bool(&v).ok_or_else(|| {
                Error::Config(format!("ATTACHMENT_GC_ON_START '{}' is not a boolean", v))
            })?,
            None => base.gc_on_start,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(base.host),
            port,
            file_storage_path: get("FILE_STORAGE_PATH").unwrap_or(base.file_storage_path),
            max_upload_bytes,
            allowed_origins: get("ALLOWED_ORIGINS").unwrap_or(base.allowed_origins),
            gc_on_start,
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address {}:{}: {}", self.host, self.port, e)))
    }
}
