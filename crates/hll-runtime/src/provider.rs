use crate::config::ProviderConfig;
use crate::{Error, Result};
use serde_json::Value;

/// One HTTP exchange with the model provider.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub status: u16,
    pub body: String,
}

/// Transport to the model provider, behind a seam so the request loop can
/// be driven by a scripted provider in tests.
pub trait ModelProvider {
    fn generate(&mut self, body: &Value) -> Result<ProviderReply>;
}

/// Blocking client for the Gemini generateContent endpoint.
pub struct GeminiProvider {
    url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Provider(format!(
                "{} environment variable not set",
                config.api_key_env
            ))
        })?;
        Ok(Self {
            url: config.url.clone(),
            api_key,
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl ModelProvider for GeminiProvider {
    fn generate(&mut self, body: &Value) -> Result<ProviderReply> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| Error::Http(e.to_string()))?;
        Ok(ProviderReply { status, body })
    }
}
