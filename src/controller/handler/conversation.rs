// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for [ProcessConversation].

use crate::agent::{ConversationResult, ErrorCode, IntentResponse, conversation_id_or_new};
use crate::controller::{Controller, ProcessConversation};
use crate::errors::ServiceError;
use actix::{Handler, ResponseFuture, fut};
use log::error;

impl Handler<ProcessConversation> for Controller {
    type Result = ResponseFuture<Result<ConversationResult, ServiceError>>;

    fn handle(&mut self, msg: ProcessConversation, _ctx: &mut Self::Context) -> Self::Result {
        let input = msg.input;

        let agent = match self.select_agent(input.agent_id.as_deref()) {
            Ok(Some(agent)) => agent,
            Ok(None) => {
                error!(
                    "n8n webhook URL is not configured for agent {}",
                    input.agent_id.as_deref().unwrap_or("-")
                );
                let result = ConversationResult {
                    response: IntentResponse::error(
                        input.language,
                        ErrorCode::FailedToHandle,
                        "n8n webhook URL is not configured.",
                    ),
                    conversation_id: conversation_id_or_new(input.conversation_id),
                    continue_conversation: false,
                };
                return Box::pin(fut::ready(Ok(result)));
            }
            Err(e) => return Box::pin(fut::ready(Err(e))),
        };

        // the webhook call doesn't touch the actor state: turns are processed concurrently
        Box::pin(async move { Ok(agent.process(input).await) })
    }
}
