// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Setup and options flow for the webhook URL.

use crate::configuration::{CONF_WEBHOOK_URL, DEFAULT_NAME};
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const STEP_USER: &str = "user";
pub const STEP_INIT: &str = "init";

pub const ERROR_INVALID_URL: &str = "invalid_url";
pub const ERROR_CANNOT_CONNECT: &str = "cannot_connect";

/// User input of a flow step: field name to value.
pub type UserInput = BTreeMap<String, String>;

/// Input field of a flow form.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl SchemaField {
    fn webhook_url(default: Option<&str>) -> Self {
        Self {
            name: CONF_WEBHOOK_URL.into(),
            field_type: "url".into(),
            required: true,
            default: default.map(str::to_string),
        }
    }
}

/// Result of a flow step: either show a form (again) or finish the flow.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowResult {
    Form {
        step_id: String,
        data_schema: Vec<SchemaField>,
        errors: BTreeMap<String, String>,
    },
    CreateEntry {
        title: String,
        data: BTreeMap<String, String>,
    },
}

impl FlowResult {
    fn form(step_id: &str, default_url: Option<&str>, error: Option<&str>) -> Self {
        FlowResult::Form {
            step_id: step_id.into(),
            data_schema: vec![SchemaField::webhook_url(default_url)],
            errors: error
                .map(|e| BTreeMap::from([("base".to_string(), e.to_string())]))
                .unwrap_or_default(),
        }
    }

    /// Webhook URL of a finished flow. `None` for forms or unchanged options.
    pub fn webhook_url(&self) -> Option<&str> {
        match self {
            FlowResult::CreateEntry { data, .. } => data.get(CONF_WEBHOOK_URL).map(String::as_str),
            FlowResult::Form { .. } => None,
        }
    }
}

/// Config flow handler.
///
/// URLs are validated syntactically. An optional reachability check issues a GET request with
/// the given timeout: only connection errors fail, any HTTP status is accepted since n8n webhooks
/// usually only accept POST.
#[derive(Default)]
pub struct ConfigFlow {
    connection_check: Option<(awc::Client, Duration)>,
}

impl ConfigFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection_check(client: awc::Client, timeout: Duration) -> Self {
        Self {
            connection_check: Some((client, timeout)),
        }
    }

    /// Initial setup step.
    pub async fn step_user(&self, user_input: Option<&UserInput>) -> FlowResult {
        let Some(user_input) = user_input else {
            return FlowResult::form(STEP_USER, None, None);
        };

        match self.validate(user_input).await {
            Ok(url) => FlowResult::CreateEntry {
                title: DEFAULT_NAME.into(),
                data: BTreeMap::from([(CONF_WEBHOOK_URL.to_string(), url.to_string())]),
            },
            Err(error) => FlowResult::form(STEP_USER, None, Some(error)),
        }
    }

    /// Options step to change the webhook URL of an existing entry.
    ///
    /// Submitting the current URL finishes the flow without data.
    pub async fn step_init(&self, current_url: &str, user_input: Option<&UserInput>) -> FlowResult {
        let Some(user_input) = user_input else {
            return FlowResult::form(STEP_INIT, Some(current_url), None);
        };

        match self.validate(user_input).await {
            Ok(url) if is_same_url(&url, current_url) => {
                debug!("Webhook URL not changed");
                FlowResult::CreateEntry {
                    title: String::new(),
                    data: BTreeMap::new(),
                }
            }
            Ok(url) => FlowResult::CreateEntry {
                title: String::new(),
                data: BTreeMap::from([(CONF_WEBHOOK_URL.to_string(), url.to_string())]),
            },
            Err(error) => FlowResult::form(STEP_INIT, Some(current_url), Some(error)),
        }
    }

    async fn validate(&self, user_input: &UserInput) -> Result<Url, &'static str> {
        let url = validate_webhook_url(user_input.get(CONF_WEBHOOK_URL).map(String::as_str))?;

        if let Some((client, timeout)) = &self.connection_check
            && !is_reachable(client, &url, *timeout).await
        {
            return Err(ERROR_CANNOT_CONNECT);
        }

        Ok(url)
    }
}

/// Validate a user provided webhook URL: an absolute http or https URL with a host.
pub fn validate_webhook_url<'a>(addr: impl Into<Option<&'a str>>) -> Result<Url, &'static str> {
    let addr = addr.into().map(str::trim).unwrap_or_default();

    let url = Url::parse(addr).map_err(|e| {
        warn!("Invalid webhook URL '{addr}': {e}");
        ERROR_INVALID_URL
    })?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
        scheme => {
            warn!("Invalid webhook URL '{addr}': scheme '{scheme}' or host not supported");
            Err(ERROR_INVALID_URL)
        }
    }
}

fn is_same_url(url: &Url, current: &str) -> bool {
    Url::parse(current.trim())
        .map(|current| &current == url)
        .unwrap_or_else(|_| url.as_str() == current)
}

async fn is_reachable(client: &awc::Client, url: &Url, timeout: Duration) -> bool {
    match client.get(url.as_str()).timeout(timeout).send().await {
        Ok(response) => {
            debug!("Webhook validation GET response status: {}", response.status());
            true
        }
        Err(e) => {
            warn!("Connection error for webhook URL {url}: {e}");
            false
        }
    }
}
