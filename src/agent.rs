// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Conversation agent answering voice assistant input with an n8n workflow.

use crate::errors::RelayError;
use crate::relay::{WebhookRelay, WebhookReply, WebhookRequestBuilder};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The agent doesn't process language itself: STT, TTS and the n8n workflow handle it.
pub const SUPPORTED_LANGUAGES: &str = "*";

const MSG_EMPTY_TEXT: &str = "I didn't receive any text, please try again.";

/// Text input from the voice assistant pipeline.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ConversationInput {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Config entry of the agent to use. The first loaded agent is used if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

fn default_language() -> String {
    "en".into()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseType {
    ActionDone,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    /// The agent couldn't get an answer from the n8n workflow.
    FailedToHandle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlainSpeech {
    pub speech: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    pub plain: PlainSpeech,
}

/// Response spoken or displayed by the voice assistant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub language: String,
    pub response_type: ResponseType,
    pub speech: Speech,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl IntentResponse {
    pub fn speech(language: impl Into<String>, speech: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            response_type: ResponseType::ActionDone,
            speech: Speech {
                plain: PlainSpeech {
                    speech: speech.into(),
                },
            },
            error_code: None,
        }
    }

    pub fn error(language: impl Into<String>, code: ErrorCode, speech: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            error_code: Some(code),
            ..Self::speech(language, speech)
        }
    }

    pub fn speech_text(&self) -> &str {
        &self.speech.plain.speech
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub response: IntentResponse,
    pub conversation_id: String,
    #[serde(default)]
    pub continue_conversation: bool,
}

/// Use the given conversation id, or create a new one if missing or empty.
pub(crate) fn conversation_id_or_new(conversation_id: Option<String>) -> String {
    conversation_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

/// Conversation agent of a loaded config entry.
#[derive(Clone)]
pub struct ConversationAgent {
    entry_id: String,
    relay: WebhookRelay,
}

impl ConversationAgent {
    pub fn new(entry_id: impl Into<String>, relay: WebhookRelay) -> Self {
        Self {
            entry_id: entry_id.into(),
            relay,
        }
    }

    /// Process a sentence.
    ///
    /// Never fails: relay errors are turned into an error response with a message for the user.
    /// A new conversation id is created if the input doesn't have one.
    pub async fn process(&self, input: ConversationInput) -> ConversationResult {
        let conversation_id = conversation_id_or_new(input.conversation_id.clone());
        let language = input.language.clone();

        if input.text.trim().is_empty() {
            debug!("[{}] Received empty or whitespace-only text input", self.entry_id);
            return ConversationResult {
                response: IntentResponse::speech(language, MSG_EMPTY_TEXT),
                conversation_id,
                continue_conversation: false,
            };
        }

        debug!(
            "[{}] Processing text: '{}' for language: {language} (conversation: {conversation_id})",
            self.entry_id, input.text
        );

        match self.relay_turn(input, &conversation_id).await {
            Ok(reply) => {
                info!("[{}] n8n answered conversation {conversation_id}", self.entry_id);
                ConversationResult {
                    response: IntentResponse::speech(language, reply.response_text),
                    conversation_id,
                    continue_conversation: reply.continue_conversation,
                }
            }
            Err(e) => {
                error!("[{}] n8n conversation failed: {e}", self.entry_id);
                ConversationResult {
                    response: IntentResponse::error(
                        language,
                        ErrorCode::FailedToHandle,
                        e.user_message(),
                    ),
                    conversation_id,
                    continue_conversation: false,
                }
            }
        }
    }

    async fn relay_turn(
        &self,
        input: ConversationInput,
        conversation_id: &str,
    ) -> Result<WebhookReply, RelayError> {
        let mut builder = WebhookRequestBuilder::default();
        builder
            .text(input.text)
            .language(input.language)
            .conversation_id(Some(conversation_id.to_string()))
            .device_id(input.device_id);
        if let Some(context) = input.context {
            builder.context(context);
        }

        self.relay.converse(&builder.build()?).await
    }
}
