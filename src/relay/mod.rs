// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! n8n webhook relay: one bounded HTTP POST per conversation turn.

use crate::configuration::RelaySettings;
use crate::errors::{ConnectivityError, RelayError};
use awc::error::{ConnectError, PayloadError, SendRequestError};
use log::{debug, error};
use std::time::Duration;
use url::Url;

#[cfg(test)]
pub(crate) mod mock;
mod model;

pub use model::*;

/// Forwards conversation input to an n8n webhook and returns its textual answer.
///
/// The relay holds no mutable state: concurrent calls are independent of each other. There is no
/// retry, every call issues exactly one request.
#[derive(Clone)]
pub struct WebhookRelay {
    client: awc::Client,
    url: Url,
    request_timeout: Duration,
    max_response_size: usize,
}

impl WebhookRelay {
    pub fn new(client: awc::Client, url: Url, settings: &RelaySettings) -> Self {
        Self {
            client,
            url,
            request_timeout: settings.request_timeout,
            max_response_size: settings.max_response_size_kb.saturating_mul(1024),
        }
    }

    /// POST the request to the webhook and extract the `response_text` of the answer.
    ///
    /// The complete exchange, including reading the response body, is bounded by the request
    /// timeout. `request.text` must not be empty.
    pub async fn converse(&self, request: &WebhookRequest) -> Result<WebhookReply, RelayError> {
        debug!(
            "Sending text to n8n webhook {} (language: {}, conversation: {:?})",
            self.url, request.language, request.conversation_id
        );

        match tokio::time::timeout(self.request_timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Timeout while calling n8n webhook: {}", self.url);
                Err(ConnectivityError::Timeout.into())
            }
        }
    }

    async fn exchange(&self, request: &WebhookRequest) -> Result<WebhookReply, RelayError> {
        let mut response = self
            .client
            .post(self.url.as_str())
            .timeout(self.request_timeout)
            .send_json(request)
            .await
            .map_err(|e| {
                error!("Failed to call n8n webhook {}: {e}", self.url);
                RelayError::from(map_send_error(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .body()
                .limit(self.max_response_size)
                .await
                .map(|b| String::from_utf8_lossy(&b).to_string())
                .unwrap_or_default();
            error!("n8n webhook returned HTTP {status}: {body}");
            debug!("Payload of failed n8n request: {request:?}");
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .body()
            .limit(self.max_response_size)
            .await
            .map_err(|e| match e {
                PayloadError::Overflow => RelayError::Protocol(format!(
                    "response body exceeds {} bytes",
                    self.max_response_size
                )),
                e => ConnectivityError::Transfer(e.to_string()).into(),
            })?;
        debug!("Received response from n8n: {}", String::from_utf8_lossy(&body));

        WebhookReply::from_slice(&body).inspect_err(|e| {
            error!(
                "Invalid n8n response: {e}. Full response: {}",
                String::from_utf8_lossy(&body)
            )
        })
    }
}

fn map_send_error(e: SendRequestError) -> ConnectivityError {
    match e {
        SendRequestError::Timeout | SendRequestError::Connect(ConnectError::Timeout) => {
            ConnectivityError::Timeout
        }
        SendRequestError::Connect(e) => ConnectivityError::Connect(e.to_string()),
        SendRequestError::Send(e) => ConnectivityError::Transfer(e.to_string()),
        e => ConnectivityError::Connect(e.to_string()),
    }
}
