// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Custom application errors with conversions from common Rust and 3rd-party errors.

use actix::MailboxError;
use derive_more::Display;
use log::error;

/// Management and API level error.
#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    #[display("Internal server error: {_0}")]
    InternalServerError(String),

    #[display("Internal serialization error: {_0}")]
    SerializationError(String),

    #[display("BadRequest: {_0}")]
    BadRequest(String),

    #[display("Not found: {_0}")]
    NotFound(String),

    #[display("Service unavailable: {_0}")]
    ServiceUnavailable(String),
}

impl std::error::Error for ServiceError {}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::InternalServerError(format!("{e:?}"))
    }
}

impl From<MailboxError> for ServiceError {
    fn from(e: MailboxError) -> Self {
        ServiceError::InternalServerError(format!("Internal message error: {e:?}"))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        error!("{e:?}");
        ServiceError::SerializationError(e.to_string())
    }
}

impl From<url::ParseError> for ServiceError {
    fn from(e: url::ParseError) -> Self {
        ServiceError::BadRequest(format!("Invalid URL: {e}"))
    }
}

/// Network level failure before a complete webhook response was received.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ConnectivityError {
    /// DNS resolution, connection refused, TLS handshake, etc.
    #[display("connection failed: {_0}")]
    Connect(String),
    /// The configured request bound elapsed.
    #[display("request timed out")]
    Timeout,
    /// The connection broke while sending the request or reading the response body.
    #[display("transfer failed: {_0}")]
    Transfer(String),
}

/// Failure of a single webhook exchange.
///
/// All variants are recovered by the conversation agent and turned into a spoken error response.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum RelayError {
    #[display("Connectivity error: {_0}")]
    Connectivity(ConnectivityError),

    /// Webhook answered with a non-2xx status.
    #[display("Upstream error: HTTP {status}")]
    Upstream { status: u16, body: String },

    /// Response body is not valid JSON or doesn't contain a `response_text` string.
    #[display("Protocol error: {_0}")]
    Protocol(String),

    /// The webhook request payload couldn't be created.
    #[display("Invalid request: {_0}")]
    Request(String),
}

impl std::error::Error for RelayError {}

impl RelayError {
    /// Message spoken to the user if the webhook exchange failed.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Connectivity(ConnectivityError::Timeout) => {
                "Sorry, the request to n8n timed out.".into()
            }
            RelayError::Connectivity(_) => "Sorry, I couldn't connect to the n8n service.".into(),
            RelayError::Upstream { status, .. } => {
                format!("The n8n service returned an error: {status}.")
            }
            RelayError::Protocol(_) => {
                "The response from n8n was not in the expected format.".into()
            }
            RelayError::Request(_) => "Sorry, I couldn't process your request with n8n.".into(),
        }
    }
}

impl From<ConnectivityError> for RelayError {
    fn from(e: ConnectivityError) -> Self {
        RelayError::Connectivity(e)
    }
}
