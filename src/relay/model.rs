// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! n8n webhook data structure definitions for JSON serialization & deserialization.

use crate::errors::RelayError;
use derive_builder::Builder;
use serde::Serialize;
use serde_json::Value;

/// Request payload POSTed to the webhook.
///
/// All keys are always serialized: absent optional values are sent as `null`, an absent
/// context as an empty object.
#[derive(Builder, Clone, Debug, PartialEq, Serialize)]
#[builder(setter(into))]
pub struct WebhookRequest {
    pub text: String,
    pub language: String,
    #[builder(default)]
    pub conversation_id: Option<String>,
    #[builder(default)]
    pub device_id: Option<String>,
    #[builder(default = "Value::Object(Default::default())")]
    pub context: Value,
}

impl From<WebhookRequestBuilderError> for RelayError {
    fn from(e: WebhookRequestBuilderError) -> Self {
        RelayError::Request(e.to_string())
    }
}

/// Successful webhook answer.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookReply {
    pub response_text: String,
    pub continue_conversation: bool,
}

impl WebhookReply {
    /// Parse a webhook response body.
    ///
    /// The body must be a JSON object with a non-empty `response_text` string. The optional
    /// `continue_conversation` flag defaults to `false`.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::Protocol(format!("invalid JSON response: {e}")))?;

        let response_text = value
            .get("response_text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| RelayError::Protocol("missing 'response_text' in response".into()))?;

        Ok(Self {
            response_text: response_text.to_string(),
            continue_conversation: value
                .get("continue_conversation")
                .and_then(Value::as_bool)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn request_serializes_all_keys() {
        let request = WebhookRequestBuilder::default()
            .text("turn on the lights")
            .language("en")
            .build()
            .unwrap();

        assert_eq!(
            json!({
                "text": "turn on the lights",
                "language": "en",
                "conversation_id": null,
                "device_id": null,
                "context": {}
            }),
            serde_json::to_value(&request).unwrap()
        );
    }

    #[test]
    fn request_passes_through_optional_values() {
        let request = WebhookRequestBuilder::default()
            .text("hi")
            .language("de-CH")
            .conversation_id(Some("01JABC".to_string()))
            .device_id(Some("kitchen-satellite".to_string()))
            .context(json!({ "user_id": "u1", "nested": [1, 2] }))
            .build()
            .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!("01JABC", value["conversation_id"]);
        assert_eq!("kitchen-satellite", value["device_id"]);
        assert_eq!(json!({ "user_id": "u1", "nested": [1, 2] }), value["context"]);
    }

    #[test]
    fn request_without_text_cannot_be_built() {
        let result = WebhookRequestBuilder::default().language("en").build();
        assert!(result.is_err());
    }

    #[test]
    fn reply_text_is_returned_unmodified() {
        let reply = WebhookReply::from_slice(br#"{"response_text": "  Lights turned on.\n"}"#);
        assert_eq!(
            Ok(WebhookReply {
                response_text: "  Lights turned on.\n".into(),
                continue_conversation: false
            }),
            reply
        );
    }

    #[test]
    fn reply_with_continue_conversation() {
        let reply =
            WebhookReply::from_slice(br#"{"response_text": "Which room?", "continue_conversation": true}"#)
                .unwrap();
        assert!(reply.continue_conversation);
    }

    #[rstest]
    #[case::empty_body(b"")]
    #[case::not_json(b"<html>Workflow error</html>")]
    #[case::missing_key(br#"{"text": "hello"}"#)]
    #[case::empty_text(br#"{"response_text": ""}"#)]
    #[case::number(br#"{"response_text": 42}"#)]
    #[case::null(br#"{"response_text": null}"#)]
    #[case::array(br#"[{"response_text": "hello"}]"#)]
    fn invalid_reply_is_protocol_error(#[case] body: &[u8]) {
        let result = WebhookReply::from_slice(body);
        assert!(
            matches!(result, Err(RelayError::Protocol(_))),
            "expected protocol error, got {result:?}"
        );
    }

    #[test]
    fn incomplete_request_is_request_error() {
        let result = WebhookRequestBuilder::default()
            .language("en")
            .build()
            .map_err(RelayError::from);

        assert!(matches!(result, Err(RelayError::Request(_))));
    }
}
