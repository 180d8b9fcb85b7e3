//! Runtime configuration, read from the environment.
//!
//! The binaries layer their command-line flags on top of [`Config::from_env`].

use anyhow::{anyhow, bail, Context, Result};
use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::environment::{get_env_var, get_env_var_as_vec, get_env_var_parsed};
use crate::extract::{ExtractionMode, ExtractionStrategy, ModelExtractor};
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

pub const DEFAULT_USER_AGENT: &str = "MDTracker by Impossible_Ad346";
pub const DEFAULT_SUBREDDIT: &str = "premed";
pub const DEFAULT_POST_LIMIT: u32 = 50;
pub const DEFAULT_KEYWORDS: [&str; 2] = ["interview", "invite"];
pub const DEFAULT_OUTPUT_PATH: &str = "index.html";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

#[derive(Clone, Debug)]
pub struct RedditConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub user_agent: String,
}

impl RedditConfig {
    /// Application-only OAuth credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LLMBackend {
    Ollama,
    OpenAI,
}

impl FromStr for LLMBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(LLMBackend::Ollama),
            "openai" => Ok(LLMBackend::OpenAI),
            other => Err(anyhow!("Unknown LLM_TYPE '{}', expected ollama or openai", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LLMConfig {
    /// Raw `LLM_TYPE`; parsed only when a model strategy is built.
    pub llm_type: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_host: String,
    /// Explicit model; the backend's default otherwise.
    pub model: Option<String>,
    pub temperature: f32,
}

impl LLMConfig {
    /// `LLM_TYPE` if set, else OpenAI when an API key is present, else Ollama.
    pub fn backend(&self) -> Result<LLMBackend> {
        match &self.llm_type {
            Some(raw) => raw.parse(),
            None if self.openai_api_key.is_some() => Ok(LLMBackend::OpenAI),
            None => Ok(LLMBackend::Ollama),
        }
    }

    /// Connects the configured backend.
    pub fn build_params(&self) -> Result<LLMParams> {
        let backend = self.backend()?;
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| default_model(backend).to_string());

        let llm_client = match backend {
            LLMBackend::OpenAI => {
                let api_key = self
                    .openai_api_key
                    .as_deref()
                    .context("OPENAI_API_KEY environment variable must be set for LLM_TYPE=openai")?;
                info!(target: TARGET_LLM_REQUEST, "Using OpenAI model {}", model);
                let config = OpenAIConfig::new().with_api_key(api_key);
                LLMClient::OpenAI(OpenAIClient::with_config(config))
            }
            LLMBackend::Ollama => {
                let (host, port) = parse_ollama_host(&self.ollama_host)?;
                info!(target: TARGET_LLM_REQUEST, "Connecting to Ollama at {}:{} with model {}", host, port, model);
                LLMClient::Ollama(Ollama::new(host, port))
            }
        };

        Ok(LLMParams {
            llm_client,
            model,
            temperature: self.temperature,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub reddit: RedditConfig,
    pub subreddit: String,
    pub post_limit: u32,
    pub keywords: Vec<String>,
    pub mode: ExtractionMode,
    pub output_path: PathBuf,
    pub llm: LLMConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode = match get_env_var("EXTRACTION_MODE") {
            Some(raw) => raw.parse()?,
            None => ExtractionMode::Lenient,
        };

        let mut keywords = get_env_var_as_vec("KEYWORDS", ';');
        if keywords.is_empty() {
            keywords = DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect();
        }

        Ok(Config {
            reddit: RedditConfig {
                client_id: get_env_var("REDDIT_CLIENT_ID"),
                client_secret: get_env_var("REDDIT_CLIENT_SECRET"),
                user_agent: get_env_var("USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
            subreddit: get_env_var("SUBREDDIT").unwrap_or_else(|| DEFAULT_SUBREDDIT.to_string()),
            post_limit: get_env_var_parsed("POST_LIMIT", DEFAULT_POST_LIMIT),
            keywords,
            mode,
            output_path: get_env_var("OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            llm: llm_config_from_env(),
        })
    }

    /// Builds the extractor for the configured mode. Only `model` touches the LLM settings.
    pub fn build_strategy(&self) -> Result<ExtractionStrategy> {
        Ok(match self.mode {
            ExtractionMode::Strict => ExtractionStrategy::Strict,
            ExtractionMode::Lenient => ExtractionStrategy::Lenient,
            ExtractionMode::Model => {
                ExtractionStrategy::Model(ModelExtractor::new(self.llm.build_params()?))
            }
        })
    }
}

fn llm_config_from_env() -> LLMConfig {
    LLMConfig {
        llm_type: get_env_var("LLM_TYPE"),
        openai_api_key: get_env_var("OPENAI_API_KEY"),
        ollama_host: get_env_var("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
        model: get_env_var("LLM_MODEL"),
        temperature: get_env_var_parsed("LLM_TEMPERATURE", 0.0),
    }
}

pub fn default_model(backend: LLMBackend) -> &'static str {
    match backend {
        LLMBackend::OpenAI => DEFAULT_OPENAI_MODEL,
        LLMBackend::Ollama => DEFAULT_OLLAMA_MODEL,
    }
}

/// True when the authority of `url` (text after `scheme://`) names a port.
fn has_explicit_port(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(|c| matches!(c, '/' | '?' | '#')).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let after_host = match host_port.rfind(']') {
        Some(end) => &host_port[end + 1..],
        None => host_port,
    };
    after_host
        .split_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

/// Splits an Ollama base URL into the `scheme://host` and port pair `Ollama::new` expects.
/// A bare `host` or `host:port` is read as plain http. A written port is always
/// kept, even the scheme's default; with no port the Ollama default applies.
pub fn parse_ollama_host(raw: &str) -> Result<(String, u16)> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = url::Url::parse(&with_scheme)
        .with_context(|| format!("Invalid OLLAMA_HOST '{}'", raw))?;
    let Some(host) = url.host_str() else {
        bail!("Missing host in OLLAMA_HOST '{}'", raw);
    };

    let port = if has_explicit_port(&with_scheme) {
        url.port_or_known_default().unwrap_or(DEFAULT_OLLAMA_PORT)
    } else {
        DEFAULT_OLLAMA_PORT
    };

    Ok((format!("{}://{}", url.scheme(), host), port))
}
