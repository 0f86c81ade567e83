//! Server configuration
//!
//! Everything is read from the environment once at startup.

use crate::contexts::ContextTable;
use crate::llm::{AspectRatio, LlmConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid context table: {0}")]
    ContextTable(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Aspect ratio for images requested by conversations
    pub aspect_ratio: AspectRatio,
    /// Optional TOML file replacing the built-in context table
    pub contexts_path: Option<PathBuf>,
    pub llm: LlmConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = match lookup("NEXUS_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidVar {
                var: "NEXUS_PORT",
                message: format!("{e}"),
            })?,
            None => 8000,
        };

        let ip: IpAddr = match lookup("NEXUS_BIND") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidVar {
                var: "NEXUS_BIND",
                message: format!("{e}"),
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let aspect_ratio = match lookup("NEXUS_ASPECT_RATIO") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidVar {
                var: "NEXUS_ASPECT_RATIO",
                message,
            })?,
            None => AspectRatio::default(),
        };

        Ok(Self {
            bind: SocketAddr::new(ip, port),
            aspect_ratio,
            contexts_path: lookup("NEXUS_CONTEXTS").map(PathBuf::from),
            llm: LlmConfig {
                gemini_api_key: lookup("GEMINI_API_KEY"),
                gateway: lookup("LLM_GATEWAY"),
                text_model: lookup("NEXUS_TEXT_MODEL"),
                image_model: lookup("NEXUS_IMAGE_MODEL"),
            },
        })
    }

    /// The configured context table, or the built-in one
    pub fn load_contexts(&self) -> Result<ContextTable, ConfigError> {
        match &self.contexts_path {
            Some(path) => ContextTable::load(path),
            None => Ok(ContextTable::builtin()),
        }
    }
}
