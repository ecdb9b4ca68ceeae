use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::WebhookError;

pub const DEFAULT_API_BASE_URL: &str = "https://apis.roblox.com";
pub const DEFAULT_TOPIC: &str = "BagiBagiDonation";
pub const RELAY_TIMEOUT: Duration = Duration::from_millis(5000);
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RATE_LIMIT_RPM: u64 = 120;

/// How a configured shared secret is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// Missing or mismatched tokens are logged and the request proceeds.
    #[default]
    Advisory,
    /// Missing tokens are rejected with 401, mismatched tokens with 403.
    Strict,
}

impl TokenPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPolicy::Advisory => "advisory",
            TokenPolicy::Strict => "strict",
        }
    }
}

impl FromStr for TokenPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" | "lenient" | "optional" => Ok(TokenPolicy::Advisory),
            "strict" | "required" => Ok(TokenPolicy::Strict),
            _ => Err(ConfigError::InvalidValue {
                name: "TOKEN_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TokenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process configuration, built once at startup.
///
/// The downstream credentials are optional here and checked per request with
/// [`RelayConfig::credentials`], so the service can run before deployment is
/// finalized.
#[derive(Clone)]
pub struct RelayConfig {
    /// Shared secret expected from BagiBagi (None = verification disabled)
    pub webhook_token: Option<String>,
    pub token_policy: TokenPolicy,
    /// Roblox Open Cloud API key
    pub roblox_api_key: Option<String>,
    /// Target universe for MessagingService
    pub universe_id: Option<String>,
    /// Origin of the Open Cloud API (overridable for staging and tests)
    pub api_base_url: String,
    pub topic: String,
    pub relay_timeout: Duration,
    pub port: u16,
    pub rate_limit_rpm: u64,
    /// Bearer token required for /metrics (None = public)
    pub metrics_token: Option<String>,
}

/// Downstream credentials, present only once both are configured.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub api_key: &'a str,
    pub universe_id: &'a str,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field(
                "webhook_token",
                &self.webhook_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_policy", &self.token_policy)
            .field(
                "roblox_api_key",
                &self.roblox_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("universe_id", &self.universe_id)
            .field("api_base_url", &self.api_base_url)
            .field("topic", &self.topic)
            .field("relay_timeout", &self.relay_timeout)
            .field("port", &self.port)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_token: None,
            token_policy: TokenPolicy::default(),
            roblox_api_key: None,
            universe_id: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            relay_timeout: RELAY_TIMEOUT,
            port: DEFAULT_PORT,
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            metrics_token: None,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token_policy = match var("TOKEN_POLICY") {
            Some(raw) => raw.parse()?,
            None => TokenPolicy::default(),
        };

        let api_base_url = var("ROBLOX_API_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        Url::parse(&api_base_url).map_err(|_| ConfigError::InvalidUrl(api_base_url.clone()))?;

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let rate_limit_rpm = match var("RATE_LIMIT_RPM") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(rpm) if rpm > 0 => rpm,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "RATE_LIMIT_RPM",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_RATE_LIMIT_RPM,
        };

        let config = Self {
            webhook_token: var("BAGIBAGI_TOKEN"),
            token_policy,
            roblox_api_key: var("ROBLOX_API_KEY"),
            universe_id: var("UNIVERSE_ID").map(|u| u.trim().to_string()),
            api_base_url,
            topic: var("MESSAGING_TOPIC").unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            relay_timeout: RELAY_TIMEOUT,
            port,
            rate_limit_rpm,
            metrics_token: var("METRICS_TOKEN"),
        };

        if config.webhook_token.is_none() {
            tracing::info!("BAGIBAGI_TOKEN not set — webhook token check disabled");
            if config.token_policy == TokenPolicy::Strict {
                tracing::warn!("TOKEN_POLICY=strict has no effect without BAGIBAGI_TOKEN");
            }
        }
        if config.roblox_api_key.is_none() || config.universe_id.is_none() {
            tracing::warn!(
                roblox_api_key = presence(&config.roblox_api_key),
                universe_id = presence(&config.universe_id),
                "Roblox credentials incomplete — donations will be rejected until both are set"
            );
        }
        if config.metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set — /metrics endpoint is publicly accessible");
        }

        Ok(config)
    }

    /// Label reported by the readiness endpoint.
    pub fn token_check_mode(&self) -> &'static str {
        if self.webhook_token.is_none() {
            "disabled"
        } else {
            self.token_policy.as_str()
        }
    }

    /// Per-request guard on the downstream credentials.
    pub fn credentials(&self) -> Result<Credentials<'_>, WebhookError> {
        match (self.roblox_api_key.as_deref(), self.universe_id.as_deref()) {
            (Some(api_key), Some(universe_id)) => Ok(Credentials {
                api_key,
                universe_id,
            }),
            _ => {
                tracing::error!(
                    roblox_api_key = presence(&self.roblox_api_key),
                    universe_id = presence(&self.universe_id),
                    "missing Roblox environment variables"
                );
                Err(WebhookError::MissingCredentials)
            }
        }
    }
}

fn presence(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "SET"
    } else {
        "MISSING"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}
