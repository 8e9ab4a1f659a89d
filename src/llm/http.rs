use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;

use super::{LlmClient, LlmError, LlmRequest, LlmResponse};
use crate::settings::LlmSettings;

/// Posts requests to the configured proxy endpoint.
pub struct HttpLlmClient {
    client: Client,
    settings: LlmSettings,
}

impl HttpLlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, settings })
    }

    pub fn endpoint(&self) -> &str {
        &self.settings.endpoint
    }

    fn fill_defaults(&self, mut request: LlmRequest) -> LlmRequest {
        if request.model.is_none() {
            request.model = self.settings.model.clone();
        }
        if request.max_tokens.is_none() {
            request.max_tokens = Some(self.settings.max_tokens);
        }
        if request.temperature.is_none() {
            request.temperature = self.settings.temperature;
        }
        request
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        let body = self.fill_defaults(request);
        info!(
            "Calling style advisor at {} (vision: {})",
            self.settings.endpoint,
            body.has_image()
        );

        let resp = match self
            .client
            .post(&self.settings.endpoint)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("Style advisor HTTP request failed: {e}");
                return Err(LlmError::network(&e));
            }
        };

        let status = resp.status();
        let text = resp.text().await.map_err(|e| LlmError::network(&e))?;

        if !status.is_success() {
            error!("Style advisor returned {status}: {text}");
            return Err(LlmError::from_status(status.as_u16(), &text));
        }

        let data: LlmResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::malformed(format!("invalid response body: {e}")))?;

        data.first_text()
            .map(str::to_string)
            .ok_or_else(|| LlmError::malformed("response has no text content"))
    }
}
