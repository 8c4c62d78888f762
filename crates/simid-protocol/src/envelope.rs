//! Wire envelope and its text encoding.
//!
//! Every message on the channel is a single JSON object:
//!
//! ```text
//! { "sessionId": "<string>", "messageId": <integer>, "type": "<string>", "args": <any> }
//! ```
//!
//! The channel is shared with unrelated traffic, so [`decode`] never fails
//! loudly: anything that is not a well-formed envelope comes back as `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::{REJECT, RESOLVE};

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Session the sender believes it belongs to. Empty before a guest has
    /// adopted one.
    pub session_id: String,
    /// Per-sender counter value; for control envelopes, the id being answered.
    pub message_id: u64,
    /// Control (`resolve`/`reject`) or namespaced application type.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Opaque payload. An absent field reads as `null`.
    #[serde(default)]
    pub args: Value,
}

/// Control outcome carried by a `resolve`/`reject` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Resolve,
    Reject,
}

impl Envelope {
    /// Create an envelope.
    #[must_use]
    pub fn new(
        message_type: impl Into<String>,
        args: Value,
        session_id: impl Into<String>,
        message_id: u64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message_id,
            message_type: message_type.into(),
            args,
        }
    }

    /// Build the control reply to `request` carrying `args`.
    #[must_use]
    pub fn reply_to(request: &Self, control: Control, args: Value, session_id: &str) -> Self {
        let message_type = match control {
            Control::Resolve => RESOLVE,
            Control::Reject => REJECT,
        };
        Self::new(message_type, args, session_id, request.message_id)
    }

    /// Control outcome, if this is a `resolve`/`reject` envelope.
    #[must_use]
    pub fn control(&self) -> Option<Control> {
        match self.message_type.as_str() {
            RESOLVE => Some(Control::Resolve),
            REJECT => Some(Control::Reject),
            _ => None,
        }
    }

    /// Canonical wire form.
    ///
    /// # Errors
    /// Returns error if `args` cannot be serialized.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Encode an envelope from its parts.
///
/// # Errors
/// Returns error if `args` cannot be serialized.
pub fn encode(
    message_type: &str,
    args: &Value,
    session_id: &str,
    message_id: u64,
) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Borrowed<'a> {
        session_id: &'a str,
        message_id: u64,
        #[serde(rename = "type")]
        message_type: &'a str,
        args: &'a Value,
    }

    serde_json::to_string(&Borrowed {
        session_id,
        message_id,
        message_type,
        args,
    })
}

/// Parse wire text. Malformed or foreign input yields `None`.
#[must_use]
pub fn decode(text: &str) -> Option<Envelope> {
    let value: Value = serde_json::from_str(text).ok()?;
    if !value.is_object() {
        return None;
    }
    let envelope = Envelope::deserialize(value).ok()?;
    if envelope.message_type.is_empty() {
        return None;
    }
    Some(envelope)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_encode_field_names() {
        let text = encode("Player:init", &json!({"foo": 1}), "S1", 1).unwrap();
        let raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            raw,
            json!({"sessionId": "S1", "messageId": 1, "type": "Player:init", "args": {"foo": 1}})
        );
    }

    #[test]
    fn test_decode_wire_text() {
        let env = decode(
            r#"{"sessionId":"S1","messageId":7,"type":"Creative:requestPlay","args":[1,"a"]}"#,
        )
        .unwrap();
        assert_eq!(env.session_id, "S1");
        assert_eq!(env.message_id, 7);
        assert_eq!(env.message_type, "Creative:requestPlay");
        assert_eq!(env.args, json!([1, "a"]));
        assert_eq!(env.control(), None);
    }

    #[test]
    fn test_decode_missing_args_is_null() {
        let env = decode(r#"{"sessionId":"S1","messageId":2,"type":"Media:play"}"#).unwrap();
        assert_eq!(env.args, Value::Null);
    }

    #[test]
    fn test_decode_tolerates_extra_fields() {
        let env = decode(r#"{"sessionId":"","messageId":1,"type":"resolve","args":{},"x":true}"#)
            .unwrap();
        assert_eq!(env.control(), Some(Control::Resolve));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let inputs = [
            "",
            "not json",
            "null",
            "42",
            "[]",
            r#"["S1",1,"Player:init",null]"#,
            r#"{"type":"Player:init"}"#,
            r#"{"sessionId":"S1","type":"Player:init"}"#,
            r#"{"sessionId":"S1","messageId":1}"#,
            r#"{"sessionId":"S1","messageId":-1,"type":"Player:init"}"#,
            r#"{"sessionId":"S1","messageId":1.5,"type":"Player:init"}"#,
            r#"{"sessionId":1,"messageId":1,"type":"Player:init"}"#,
            r#"{"sessionId":"S1","messageId":1,"type":""}"#,
        ];
        for input in inputs {
            assert!(decode(input).is_none(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_reply_keeps_request_id() {
        let request = Envelope::new("Player:init", json!({"foo": 1}), "S1", 9);
        let reply = Envelope::reply_to(&request, Control::Reject, json!({"errorCode": 1}), "S1");
        assert_eq!(reply.message_id, 9);
        assert_eq!(reply.message_type, "reject");
        assert_eq!(reply.args, json!({"errorCode": 1}));
    }
}
