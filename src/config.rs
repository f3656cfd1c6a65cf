//! Process configuration read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::agents::{ClientCredentials, GenerationPolicy};

const DEFAULT_OUTPUT_DIR: &str = "./outputs";
const DEFAULT_API_VERSION: &str = "v1";
const DEFAULT_PDF2DOCX: &str = "pdf2docx";
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_TOKEN_SCOPE: &str = "https://ai.azure.com/.default";

/// Fatal configuration problems; the process cannot serve with these.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Connection settings for the agent service.
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    pub endpoint: String,
    pub model_deployment: String,
    /// Fixed bearer token, used when no service principal is configured.
    pub api_token: Option<String>,
    /// Entra service principal; tokens are then acquired and renewed.
    pub credentials: Option<ClientCredentials>,
    pub api_version: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub agents: AgentsConfig,
    pub api_key: Option<String>,
    pub output_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub pdf2docx_path: String,
    pub server_host: String,
    pub server_port: u16,
    pub generation: GenerationPolicy,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = get("PROJECT_ENDPOINT").ok_or(ConfigError::Missing("PROJECT_ENDPOINT"))?;
        let model_deployment =
            get("MODEL_DEPLOYMENT_NAME").ok_or(ConfigError::Missing("MODEL_DEPLOYMENT_NAME"))?;

        let defaults = GenerationPolicy::default();
        let generation = GenerationPolicy {
            poll_interval: Duration::from_millis(parse_or(
                &get,
                "GENERATION_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            max_poll_interval: Duration::from_millis(parse_or(
                &get,
                "GENERATION_MAX_POLL_INTERVAL_MS",
                defaults.max_poll_interval.as_millis() as u64,
            )?),
            backoff_factor: parse_or(&get, "GENERATION_BACKOFF_FACTOR", defaults.backoff_factor)?,
            timeout: Duration::from_secs(parse_or(
                &get,
                "GENERATION_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            max_retries: parse_or(&get, "GENERATION_MAX_RETRIES", defaults.max_retries)?,
        };
        if !(generation.backoff_factor >= 1.0) {
            return Err(ConfigError::Invalid {
                name: "GENERATION_BACKOFF_FACTOR",
                value: generation.backoff_factor.to_string(),
            });
        }
        // a zero deadline fails every job; a zero interval polls in a hot loop
        if generation.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "GENERATION_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        if generation.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "GENERATION_POLL_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        let credentials = client_credentials(&get)?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:8080".to_string(),
                ]
            });

        Ok(Self {
            agents: AgentsConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                model_deployment,
                api_token: get("PROJECT_API_TOKEN"),
                credentials,
                api_version: get("AGENTS_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            },
            api_key: get("API_KEY"),
            output_dir: PathBuf::from(
                get("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            chrome_path: get("CHROME_PATH").map(PathBuf::from),
            pdf2docx_path: get("PDF2DOCX_PATH").unwrap_or_else(|| DEFAULT_PDF2DOCX.to_string()),
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(&get, "SERVER_PORT", 8080)?,
            generation,
            cors_allowed_origins,
        })
    }
}

/// Service principal settings. Tenant, client id and secret come as a set;
/// none of them means the fixed token is used instead.
fn client_credentials<G>(get: &G) -> Result<Option<ClientCredentials>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let tenant_id = get("AZURE_TENANT_ID");
    let client_id = get("AZURE_CLIENT_ID");
    let client_secret = get("AZURE_CLIENT_SECRET");
    if tenant_id.is_none() && client_id.is_none() && client_secret.is_none() {
        return Ok(None);
    }

    Ok(Some(ClientCredentials {
        tenant_id: tenant_id.ok_or(ConfigError::Missing("AZURE_TENANT_ID"))?,
        client_id: client_id.ok_or(ConfigError::Missing("AZURE_CLIENT_ID"))?,
        client_secret: client_secret.ok_or(ConfigError::Missing("AZURE_CLIENT_SECRET"))?,
        authority_host: get("AZURE_AUTHORITY_HOST")
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
        scope: get("AGENTS_TOKEN_SCOPE").unwrap_or_else(|| DEFAULT_TOKEN_SCOPE.to_string()),
    }))
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
