// HTTP SMS gateway - Sends the distress message to every contact in one request
use crate::application::ports::SmsChannel;
use crate::domain::contact::Contact;
use crate::domain::error::SosError;
use crate::infrastructure::config::SmsGatewaySettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    to: Vec<&'a str>,
    body: &'a str,
}

/// Unavailable when no gateway is configured; the dispatcher then shares instead
#[derive(Debug, Clone)]
pub struct HttpSmsGateway {
    client: reqwest::Client,
    settings: Option<SmsGatewaySettings>,
}

impl HttpSmsGateway {
    pub fn new(settings: Option<SmsGatewaySettings>) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    async fn post(&self, settings: &SmsGatewaySettings, request: &SmsRequest<'_>) -> Result<()> {
        let mut builder = self.client.post(&settings.url).json(request);
        if let Some(token) = &settings.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send request to SMS gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("SMS gateway rejected message with status {}: {}", status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl SmsChannel for HttpSmsGateway {
    async fn is_available(&self) -> bool {
        self.settings.is_some()
    }

    async fn send(&self, recipients: &[Contact], message: &str) -> Result<(), SosError> {
        let Some(settings) = &self.settings else {
            return Err(SosError::ResourceUnavailable("SMS".to_string()));
        };

        let request = SmsRequest {
            to: recipients.iter().map(Contact::as_str).collect(),
            body: message,
        };
        self.post(settings, &request).await.map_err(|e| {
            tracing::error!("SMS gateway: {:#}", e);
            SosError::ResourceUnavailable("SMS".to_string())
        })?;

        tracing::info!("SMS handed to gateway for {} recipients", recipients.len());
        Ok(())
    }
}
