use std::sync::Arc;

use crate::config::RelayConfig;
use crate::messaging::MessagingClient;

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub messaging: MessagingClient,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.relay_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self::with_client(config, http_client))
    }

    pub fn with_client(config: RelayConfig, http_client: reqwest::Client) -> Self {
        let messaging = MessagingClient::new(
            http_client,
            config.api_base_url.clone(),
            config.topic.clone(),
            config.relay_timeout,
        );
        Self {
            config: Arc::new(config),
            messaging,
        }
    }
}
