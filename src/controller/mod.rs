// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Central controller owning the config entries and their conversation agents.

mod handler;
mod messages;

pub use messages::*;

use crate::agent::ConversationAgent;
use crate::config_flow::{ConfigFlow, validate_webhook_url};
use crate::configuration::{ConfigEntry, RelaySettings, save_config_entries};
use crate::errors::ServiceError;
use crate::relay::WebhookRelay;
use actix::prelude::{Actor, Context};
use log::{debug, error, info, warn};
use rust_fsm::*;
use std::path::PathBuf;

state_machine! {
    derive(Debug, Clone, Copy, PartialEq, Eq)
    EntryLifecycle(NotLoaded)

    NotLoaded => {
        SetupSucceeded => Loaded,
        SetupFailed => SetupError,
    },
    SetupError => {
        SetupSucceeded => Loaded,
        SetupFailed => SetupError,
        Unload => NotLoaded,
    },
    Loaded(Unload) => NotLoaded,
}

impl EntryLifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            EntryLifecycleState::NotLoaded => "not_loaded",
            EntryLifecycleState::Loaded => "loaded",
            EntryLifecycleState::SetupError => "setup_error",
        }
    }
}

/// A config entry with its lifecycle state and the agent while loaded.
struct EntryHandle {
    entry: ConfigEntry,
    machine: StateMachine<EntryLifecycle>,
    agent: Option<ConversationAgent>,
}

impl EntryHandle {
    fn new(entry: ConfigEntry) -> Self {
        Self {
            entry,
            machine: StateMachine::new(),
            agent: None,
        }
    }

    fn state(&self) -> EntryLifecycleState {
        *self.machine.state()
    }

    fn info(&self) -> ConfigEntryInfo {
        ConfigEntryInfo {
            entry: self.entry.clone(),
            state: self.state().name(),
        }
    }
}

pub struct Controller {
    settings: RelaySettings,
    /// HTTP client shared by all agents.
    // creating a client is sufficient once per process and can be used for multiple connections
    client: awc::Client,
    /// Config entries in creation order. The first loaded entry is the default agent.
    entries: Vec<EntryHandle>,
    /// Config entries file. Entries are not persisted if not set.
    entries_path: Option<PathBuf>,
}

impl Controller {
    pub fn new(
        settings: RelaySettings,
        client: awc::Client,
        entries: Vec<ConfigEntry>,
        entries_path: Option<PathBuf>,
    ) -> Self {
        Self {
            settings,
            client,
            entries: entries.into_iter().map(EntryHandle::new).collect(),
            entries_path,
        }
    }

    fn entry_mut(&mut self, entry_id: &str) -> Result<&mut EntryHandle, ServiceError> {
        self.entries
            .iter_mut()
            .find(|h| h.entry.entry_id == entry_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Config entry {entry_id} not found")))
    }

    /// Create and register the conversation agent of a config entry.
    fn setup_entry(&mut self, entry_id: &str) -> Result<(), ServiceError> {
        let settings = self.settings.clone();
        let client = self.client.clone();
        let handle = self.entry_mut(entry_id)?;

        if handle.state() == EntryLifecycleState::Loaded {
            debug!("[{entry_id}] Config entry already loaded");
            return Ok(());
        }

        let url = match validate_webhook_url(handle.entry.data.webhook_url.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                error!("[{entry_id}] Webhook URL not found or invalid in config entry: {e}");
                let _ = handle.machine.consume(&EntryLifecycleInput::SetupFailed);
                return Err(ServiceError::BadRequest(format!(
                    "Invalid webhook URL in config entry {entry_id}"
                )));
            }
        };

        info!("[{entry_id}] Setting up n8n conversation agent for {url}");
        let relay = WebhookRelay::new(client, url, &settings);
        handle.agent = Some(ConversationAgent::new(entry_id, relay));
        let _ = handle
            .machine
            .consume(&EntryLifecycleInput::SetupSucceeded);

        Ok(())
    }

    /// Unregister the conversation agent of a config entry.
    fn unload_entry(&mut self, entry_id: &str) -> Result<(), ServiceError> {
        let handle = self.entry_mut(entry_id)?;
        debug!("[{entry_id}] Unloading config entry");

        handle.agent = None;
        if handle
            .machine
            .consume(&EntryLifecycleInput::Unload)
            .is_err()
        {
            debug!("[{entry_id}] Config entry was not loaded");
        }
        Ok(())
    }

    fn reload_entry(&mut self, entry_id: &str) -> Result<(), ServiceError> {
        info!("[{entry_id}] Reloading config entry");
        self.unload_entry(entry_id)?;
        self.setup_entry(entry_id)
    }

    fn add_entry(&mut self, entry: ConfigEntry) -> Result<(), ServiceError> {
        let entry_id = entry.entry_id.clone();
        info!("[{entry_id}] Adding config entry '{}'", entry.title);
        self.entries.push(EntryHandle::new(entry));
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        self.setup_entry(&entry_id)
    }

    fn remove_entry(&mut self, entry_id: &str) -> Result<(), ServiceError> {
        self.unload_entry(entry_id)?;
        self.entries.retain(|h| h.entry.entry_id != entry_id);
        info!("[{entry_id}] Removed config entry");
        self.persist()
    }

    fn persist(&self) -> Result<(), ServiceError> {
        match &self.entries_path {
            Some(path) => {
                let entries: Vec<_> = self.entries.iter().map(|h| h.entry.clone()).collect();
                save_config_entries(path, &entries)
            }
            None => Ok(()),
        }
    }

    /// Select the agent for a conversation turn.
    ///
    /// Returns `None` if the selected config entry is not loaded.
    fn select_agent(
        &self,
        agent_id: Option<&str>,
    ) -> Result<Option<ConversationAgent>, ServiceError> {
        match agent_id {
            Some(agent_id) => self
                .entries
                .iter()
                .find(|h| h.entry.entry_id == agent_id)
                .map(|h| h.agent.clone())
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Conversation agent {agent_id} not found"))
                }),
            None if self.entries.is_empty() => Err(ServiceError::NotFound(
                "No n8n conversation agent configured".into(),
            )),
            None => Ok(self.entries.iter().find_map(|h| h.agent.clone())),
        }
    }

    fn new_config_flow(&self) -> ConfigFlow {
        if self.settings.validate_on_setup {
            ConfigFlow::with_connection_check(self.client.clone(), self.settings.connection_timeout)
        } else {
            ConfigFlow::new()
        }
    }
}

impl Actor for Controller {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        let entry_ids: Vec<_> = self.entries.iter().map(|h| h.entry.entry_id.clone()).collect();
        if entry_ids.is_empty() {
            warn!("No config entry available: start the config flow to add an n8n webhook");
        }
        for entry_id in entry_ids {
            if let Err(e) = self.setup_entry(&entry_id) {
                error!("[{entry_id}] Setup failed: {e}");
            }
        }
    }
}
