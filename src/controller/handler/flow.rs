// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Config and options flow handling.

use crate::config_flow::FlowResult;
use crate::configuration::ConfigEntry;
use crate::controller::{Controller, FlowResponse, StartConfigFlow, StartOptionsFlow};
use crate::errors::ServiceError;
use actix::{ActorFutureExt, Handler, ResponseActFuture, WrapFuture, fut};
use log::{debug, info};
use url::Url;

/// Run the `user` step of the config flow.
///
/// The flow step may check the webhook connection, the config entry is created afterwards
/// within the actor context.
impl Handler<StartConfigFlow> for Controller {
    type Result = ResponseActFuture<Self, Result<FlowResponse, ServiceError>>;

    fn handle(&mut self, msg: StartConfigFlow, _ctx: &mut Self::Context) -> Self::Result {
        debug!("Config flow user input: {:?}", msg.user_input);
        let flow = self.new_config_flow();

        Box::pin(
            async move { flow.step_user(msg.user_input.as_ref()).await }
                .into_actor(self) // converts future to ActorFuture
                .map(|result, act, _ctx| {
                    let new_entry = match &result {
                        FlowResult::CreateEntry { title, .. } => result
                            .webhook_url()
                            .map(|url| Url::parse(url).map(|url| ConfigEntry::new(title, &url)))
                            .transpose()?,
                        FlowResult::Form { .. } => None,
                    };
                    let Some(entry) = new_entry else {
                        return Ok(FlowResponse {
                            result,
                            entry_id: None,
                        });
                    };

                    let entry_id = entry.entry_id.clone();
                    act.add_entry(entry)?;

                    Ok(FlowResponse {
                        result,
                        entry_id: Some(entry_id),
                    })
                }),
        )
    }
}

/// Run the `init` step of the options flow.
///
/// A changed webhook URL updates and persists the config entry, then reloads its agent.
impl Handler<StartOptionsFlow> for Controller {
    type Result = ResponseActFuture<Self, Result<FlowResponse, ServiceError>>;

    fn handle(&mut self, msg: StartOptionsFlow, _ctx: &mut Self::Context) -> Self::Result {
        debug!("[{}] Options flow user input: {:?}", msg.entry_id, msg.user_input);
        let StartOptionsFlow {
            entry_id,
            user_input,
        } = msg;
        let flow = self.new_config_flow();
        let current_url = match self.entry_mut(&entry_id) {
            Ok(handle) => handle.entry.data.webhook_url.clone().unwrap_or_default(),
            Err(e) => return Box::pin(fut::ready(Err(e))),
        };

        Box::pin(
            async move { flow.step_init(&current_url, user_input.as_ref()).await }
                .into_actor(self)
                .map(move |result, act, _ctx| {
                    if let Some(url) = result.webhook_url() {
                        let handle = act.entry_mut(&entry_id)?;
                        let previous = handle.entry.data.webhook_url.replace(url.to_string());
                        if let Err(e) = act.persist() {
                            act.entry_mut(&entry_id)?.entry.data.webhook_url = previous;
                            return Err(e);
                        }
                        info!("[{entry_id}] n8n webhook URL changed");
                        act.reload_entry(&entry_id)?;
                    }

                    Ok(FlowResponse {
                        result,
                        entry_id: Some(entry_id),
                    })
                }),
        )
    }
}
