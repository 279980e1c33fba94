// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Actix actor message definitions used to communicate with the [`Controller`].
//!
//! These are the messages used by the HTTP API and the command line tools to manage config
//! entries and to process conversation turns.

use crate::agent::{ConversationInput, ConversationResult};
use crate::config_flow::{FlowResult, UserInput};
use crate::configuration::ConfigEntry;
#[allow(unused_imports)] // used for doc links
use crate::controller::Controller;
use crate::errors::ServiceError;
use actix::prelude::Message;
use derive_more::Constructor;
use serde::Serialize;

/// Process a conversation turn with the agent of a config entry.
///
/// The agent is selected by [`ConversationInput::agent_id`], or the first loaded agent if not set.
/// Relay failures are part of the [`ConversationResult`], a [`ServiceError`] is only returned if
/// no agent could be selected.
#[derive(Debug, Message, Constructor)]
#[rtype(result = "Result<ConversationResult, ServiceError>")]
pub struct ProcessConversation {
    pub input: ConversationInput,
}

/// Run the `user` step of the config flow.
///
/// A finished flow creates a new config entry, persists and sets it up.
#[derive(Debug, Message, Constructor)]
#[rtype(result = "Result<FlowResponse, ServiceError>")]
pub struct StartConfigFlow {
    pub user_input: Option<UserInput>,
}

/// Run the `init` step of the options flow of an existing config entry.
///
/// A changed webhook URL is persisted and the entry reloaded.
#[derive(Debug, Message, Constructor)]
#[rtype(result = "Result<FlowResponse, ServiceError>")]
pub struct StartOptionsFlow {
    pub entry_id: String,
    pub user_input: Option<UserInput>,
}

/// Unload and set up a config entry again.
#[derive(Debug, Message, Constructor)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct ReloadEntry {
    pub entry_id: String,
}

/// Unload and delete a config entry.
#[derive(Debug, Message, Constructor)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct RemoveEntry {
    pub entry_id: String,
}

/// Get all config entries with their lifecycle state.
#[derive(Debug, Message)]
#[rtype(result = "Vec<ConfigEntryInfo>")]
pub struct GetConfigEntries;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigEntryInfo {
    #[serde(flatten)]
    pub entry: ConfigEntry,
    pub state: &'static str,
}

/// Flow step result with the affected config entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowResponse {
    #[serde(flatten)]
    pub result: FlowResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}
