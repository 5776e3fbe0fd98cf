use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Template of the first automatic reminder.
pub const TEMPLATE_INITIAL: &str = "initial";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Result of one send. Transport failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailOutcome {
    pub ok: bool,
    pub message: String,
}

impl MailOutcome {
    pub fn sent(to: &str) -> Self {
        Self {
            ok: true,
            message: format!("Reminder sent to {to}"),
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            ok: false,
            message: format!("Reminder failed: {reason}"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, template: &str, to: &str, params: &Value) -> MailOutcome;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    template: &'a str,
    params: &'a Value,
}

/// Mail transport speaking the provider's JSON send API.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(url: String, api_key: String, from: String) -> Result<Self, MailError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            url,
            api_key,
            from,
        })
    }

    async fn try_send(&self, template: &str, to: &str, params: &Value) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from,
                to,
                template,
                params,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, template: &str, to: &str, params: &Value) -> MailOutcome {
        match self.try_send(template, to, params).await {
            Ok(()) => {
                debug!("Mail '{template}' sent to {to}");
                MailOutcome::sent(to)
            }
            Err(e) => {
                warn!("Mail '{template}' to {to} failed: {e}");
                MailOutcome::failed(e)
            }
        }
    }
}
