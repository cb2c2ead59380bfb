//! Webhook delivery
//!
//! Each destination is attempted once, in order. A failing destination never
//! prevents delivery to the ones after it.

use std::time::Duration;

use buildhook_api::WebhookResult;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

use crate::infrastructure::http_client::create_http_client;

/// Connect and read timeout applied to every webhook POST
pub const POST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered { status: u16 },
    Rejected { status: u16, body: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub url: String,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered { .. })
    }
}

pub struct Dispatcher {
    client: Client,
}

impl Dispatcher {
    pub fn new() -> WebhookResult<Self> {
        Ok(Self::with_client(create_http_client(POST_TIMEOUT)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// POSTs `payload` to every URL, one after another, and reports the
    /// outcome of each.
    pub async fn dispatch(&self, urls: &[String], payload: &str) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            outcomes.push(self.post(url, payload).await);
        }
        outcomes
    }

    async fn post(&self, url: &str, payload: &str) -> DeliveryOutcome {
        let result = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await;

        let status = match result {
            Ok(response) => {
                let code = response.status();
                if code.is_success() {
                    tracing::info!(url = %url, status = code.as_u16(), "Payload POST-ed to '{}'", url);
                    DeliveryStatus::Delivered {
                        status: code.as_u16(),
                    }
                } else {
                    let body = response.text().await.unwrap_or_default();
                    tracing::error!(
                        url = %url,
                        status = code.as_u16(),
                        "POST-ing payload to '{}' - got {} response: {}",
                        url,
                        code.as_u16(),
                        body
                    );
                    DeliveryStatus::Rejected {
                        status: code.as_u16(),
                        body,
                    }
                }
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to POST payload to '{}'", url);
                DeliveryStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        DeliveryOutcome {
            url: url.to_string(),
            status,
        }
    }
}
