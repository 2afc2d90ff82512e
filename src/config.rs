//! Environment-driven configuration.
//!
//! Every credential is resolved exactly once at startup into an owned
//! [`Config`]; a missing required value is a
//! [`ServiceError::Configuration`] and aborts the process before any
//! request is served.

use std::env;
use std::net::SocketAddr;

use crate::types::ServiceError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DATABASE_PATH: &str = "tutorsmith.db";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite database holding embeddings and syllabus nodes.
    pub database_path: String,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Credential for the embeddings API.
    pub openai_api_key: String,
    /// Optional override for OpenAI-compatible embedding endpoints.
    pub openai_base_url: Option<String>,
    /// Credential for the chat-completions API.
    pub openrouter_api_key: String,
    /// Optional override for OpenAI-compatible completion endpoints.
    pub openrouter_base_url: Option<String>,
}

impl Config {
    /// Reads configuration from the environment (`.env` files are loaded by
    /// the binary before this runs).
    pub fn from_env() -> Result<Self, ServiceError> {
        let bind_addr = env::var("TUTORSMITH_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|err| {
                ServiceError::Configuration(format!("TUTORSMITH_ADDR is invalid: {err}"))
            })?;

        Ok(Self {
            database_path: env::var("TUTORSMITH_DB")
                .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string()),
            bind_addr,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            openrouter_api_key: required("OPENROUTER_API_KEY")?,
            openrouter_base_url: env::var("OPENROUTER_BASE_URL").ok(),
        })
    }
}

fn required(name: &'static str) -> Result<String, ServiceError> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ServiceError::Configuration(name.to_string()))
}
