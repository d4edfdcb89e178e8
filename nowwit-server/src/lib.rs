pub mod http;

use std::sync::Arc;

use nowwit_core::{CardGenerator, ChatCompletionClient, GenerationError, NowwitConfig};

/// Build the shared HTTP state. A missing model credential is not fatal: the
/// server still starts and `/insight` answers 500 until it is configured.
pub fn build_state(config: NowwitConfig, api_key: Option<String>) -> http::HttpState {
    let generator: Option<Arc<dyn CardGenerator>> =
        match ChatCompletionClient::from_model_config(&config.model, api_key) {
            Ok(client) => Some(Arc::new(client)),
            Err(GenerationError::MissingApiKey) => {
                tracing::warn!(
                    "{} is not set; /insight will fail until it is configured",
                    nowwit_core::config::API_KEY_ENV
                );
                None
            }
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "Failed to create chat-completion client");
                None
            }
        };

    http::HttpState { config, generator }
}
