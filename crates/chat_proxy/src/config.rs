use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use openrouter_api::OpenRouterConfig;

use crate::ProxyError;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";
pub const MODEL_ENV: &str = "CHAT_PROXY_MODEL";
pub const HOST_ENV: &str = "CHAT_PROXY_HOST";
pub const PORT_ENV: &str = "CHAT_PROXY_PORT";

pub const DEFAULT_MODEL: &str = "qwen/qwen3-8b:free";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Upper bound for one proxied request, streaming included.
pub const MAX_DURATION: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Empty when unset; requests then fail in-stream.
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub host: String,
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ProxyError> {
        let defaults = Self::default();
        let port = match env_string_opt(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ProxyError::InvalidConfig(format!("{PORT_ENV}={raw:?} is not a port")))?,
            None => defaults.port,
        };

        Ok(Self {
            api_key: env_string_opt(API_KEY_ENV).unwrap_or_default(),
            base_url: env_string_opt(BASE_URL_ENV),
            model: env_string_opt(MODEL_ENV).unwrap_or(defaults.model),
            host: env_string_opt(HOST_ENV).unwrap_or(defaults.host),
            port,
        })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ProxyError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ProxyError::InvalidConfig(format!("bad listen address {}:{}", self.host, self.port)))
    }

    pub fn upstream(&self) -> OpenRouterConfig {
        let mut config = OpenRouterConfig::new(self.api_key.clone()).with_timeout(MAX_DURATION);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        config
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
