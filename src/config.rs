//! Environment-driven configuration for the UI agent.
//!
//! | Variable                   | Default                     |
//! |----------------------------|-----------------------------|
//! | `AGENT_B_HOST`             | `0.0.0.0`                   |
//! | `AGENT_B_PORT`             | `5002`                      |
//! | `AGENT_PUBLIC_URL`         | `http://localhost:<port>`   |
//! | `AGENT_MAX_TURNS`          | unset (unbounded)           |
//! | `MCP_URL`                  | `http://localhost:3000/mcp` |
//! | `MCP_PROMPT_ID`            | `a2ui_system`               |
//! | `MCP_KEEPALIVE_SECS`       | `1`                         |
//! | `MCP_RECONNECT`            | `true`                      |
//! | `MCP_CONNECT_TIMEOUT_SECS` | `30`                        |
//! | `MCP_PING_TIMEOUT_SECS`    | `10`                        |
//! | `OPENAI_API_KEY`           | required                    |
//! | `OPENAI_BASE_URL`          | unset                       |
//! | `OPENAI_MODEL`             | `gpt-4o`                    |
//! | `OPENAI_TEMPERATURE`       | `0.2`                       |
//! | `OPENAI_TIMEOUT_SECS`      | `120`                       |

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::session::{KeepAlivePolicy, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PROMPT_ID};

pub const DEFAULT_PORT: u16 = 5002;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_MCP_URL: &str = "http://localhost:3000/mcp";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_OPENAI_TIMEOUT: u64 = 120;
pub const DEFAULT_PING_TIMEOUT: u64 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable is required.")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration of the agent process.
#[derive(Clone, PartialEq)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    pub public_url: Option<String>,
    pub max_turns: Option<usize>,
    pub mcp_url: String,
    pub prompt_id: String,
    pub keepalive: Duration,
    pub reconnect: bool,
    pub connect_timeout: Duration,
    pub ping_timeout: Duration,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub openai_timeout: Duration,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("bind_addr", &self.bind_addr())
            .field("public_url", &self.public_url())
            .field("max_turns", &self.max_turns)
            .field("mcp_url", &self.mcp_url)
            .field("prompt_id", &self.prompt_id)
            .field("keepalive", &self.keepalive)
            .field("reconnect", &self.reconnect)
            .field("connect_timeout", &self.connect_timeout)
            .field("ping_timeout", &self.ping_timeout)
            .field("openai_api_key", &"<masked>")
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("openai_timeout", &self.openai_timeout)
            .finish()
    }
}

impl AgentConfig {
    /// Defaults for everything, with the given API key.
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: None,
            max_turns: None,
            mcp_url: DEFAULT_MCP_URL.to_string(),
            prompt_id: DEFAULT_PROMPT_ID.to_string(),
            keepalive: Duration::from_secs(1),
            reconnect: true,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            ping_timeout: Duration::from_secs(DEFAULT_PING_TIMEOUT),
            openai_api_key: openai_api_key.into(),
            openai_base_url: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            openai_timeout: Duration::from_secs(DEFAULT_OPENAI_TIMEOUT),
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; unset and empty values are
    /// treated alike.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let mut config = Self::new(api_key);

        if let Some(host) = get("AGENT_B_HOST") {
            config.host = host;
        }
        if let Some(port) = parse(&get, "AGENT_B_PORT")? {
            config.port = port;
        }
        config.public_url = get("AGENT_PUBLIC_URL");
        config.max_turns = parse(&get, "AGENT_MAX_TURNS")?;
        if let Some(url) = get("MCP_URL") {
            config.mcp_url = url;
        }
        if let Some(prompt_id) = get("MCP_PROMPT_ID") {
            config.prompt_id = prompt_id;
        }
        if let Some(keepalive) = parse_secs(&get, "MCP_KEEPALIVE_SECS")? {
            config.keepalive = keepalive;
        }
        if let Some(reconnect) = get("MCP_RECONNECT") {
            config.reconnect = parse_bool(&reconnect).ok_or(ConfigError::Invalid {
                name: "MCP_RECONNECT",
                value: reconnect,
            })?;
        }
        if let Some(timeout) = parse_secs(&get, "MCP_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = parse_secs(&get, "MCP_PING_TIMEOUT_SECS")? {
            config.ping_timeout = timeout;
        }
        config.openai_base_url = get("OPENAI_BASE_URL");
        if let Some(model) = get("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(temperature) = parse(&get, "OPENAI_TEMPERATURE")? {
            config.temperature = temperature;
        }
        if let Some(timeout) = parse_secs(&get, "OPENAI_TIMEOUT_SECS")? {
            config.openai_timeout = timeout;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL advertised in the agent card.
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn keep_alive_policy(&self) -> KeepAlivePolicy {
        KeepAlivePolicy {
            interval: self.keepalive,
            reconnect: self.reconnect,
            ping_timeout: self.ping_timeout,
            ..KeepAlivePolicy::default()
        }
    }
}

fn parse<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

/// A positive number of seconds.
fn parse_secs<G>(get: &G, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse::<u64, _>(get, name)? {
        Some(0) => Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
