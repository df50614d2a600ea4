//! Messages exchanged between an embedded widget and its host page.
//!
//! Two wire formats exist. The legacy one posts bare string tokens
//! (`"openChatbox"`) plus a `SIDREX_RESIZE` object; the versioned one posts
//! `{"v":1,"type":"openChatbox",...}` objects. Decoding accepts both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Schema version of the versioned format.
pub const PROTOCOL_VERSION: u64 = 1;

/// `type` of the legacy resize object.
pub const RESIZE_TYPE: &str = "SIDREX_RESIZE";

/// Failure to decode a cross-frame message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A string token nobody recognises.
    #[error("unknown message token {0:?}")]
    UnknownToken(String),
    /// A versioned message with another schema version.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u64),
    /// A versioned message whose fields do not match its type.
    #[error("malformed message: {0}")]
    Malformed(String),
    /// Neither a token nor an object.
    #[error("unexpected message shape")]
    UnexpectedShape,
}

/// Which wire format outbound messages use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Bare tokens, understood by existing host loaders.
    #[default]
    Legacy,
    /// `{"v":1,"type":...}` objects.
    Versioned,
}

/// Lifecycle status reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetStatus {
    /// Loaded and interactive.
    Ready,
    /// Still loading.
    Loading,
    /// Failed to load.
    Error,
}

impl WidgetStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Loading => "loading",
            Self::Error => "error",
        }
    }
}

/// What a resize asks the host to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeAction {
    /// Grow to the open panel size.
    Expand,
    /// Shrink to the button size.
    Collapse,
    /// First sizing after load.
    Init,
}

/// Explicit iframe size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    /// Kind of resize.
    pub action: ResizeAction,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Widget to host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WidgetEvent {
    /// The user engaged the widget button.
    RobotClicked,
    /// The chat panel opened.
    OpenChatbox,
    /// The chat panel closed.
    CloseChatbox,
    /// The widget was dismissed.
    WidgetClosed,
    /// Lifecycle status.
    Status {
        /// Reported status.
        status: WidgetStatus,
    },
    /// Pixel sizing.
    Resize(ResizeRequest),
}

impl WidgetEvent {
    /// Encode for posting.
    #[must_use]
    pub fn encode(&self, format: WireFormat) -> Value {
        match format {
            WireFormat::Legacy => self.encode_legacy(),
            WireFormat::Versioned => versioned(self),
        }
    }

    fn encode_legacy(&self) -> Value {
        match self {
            Self::RobotClicked => json!("robotClicked"),
            Self::OpenChatbox => json!("openChatbox"),
            Self::CloseChatbox => json!("closeChatbox"),
            Self::WidgetClosed => json!("widgetClosed"),
            Self::Status { status } => Value::String(format!("widget-{}", status.as_str())),
            Self::Resize(resize) => json!({
                "type": RESIZE_TYPE,
                "action": resize.action,
                "width": resize.width,
                "height": resize.height,
            }),
        }
    }

    /// Decode a message in either format.
    ///
    /// # Errors
    /// Returns an error if the message is not a known widget event.
    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        match value {
            Value::String(token) => match token.as_str() {
                "robotClicked" => Ok(Self::RobotClicked),
                "openChatbox" => Ok(Self::OpenChatbox),
                "closeChatbox" => Ok(Self::CloseChatbox),
                "widgetClosed" => Ok(Self::WidgetClosed),
                "widget-ready" => Ok(Self::Status {
                    status: WidgetStatus::Ready,
                }),
                "widget-loading" => Ok(Self::Status {
                    status: WidgetStatus::Loading,
                }),
                "widget-error" => Ok(Self::Status {
                    status: WidgetStatus::Error,
                }),
                other => Err(ProtocolError::UnknownToken(other.to_string())),
            },
            Value::Object(fields)
                if fields.get("type").and_then(Value::as_str) == Some(RESIZE_TYPE) =>
            {
                let mut fields = fields.clone();
                let _ = fields.remove("type");
                serde_json::from_value(Value::Object(fields))
                    .map(Self::Resize)
                    .map_err(|e| ProtocolError::Malformed(e.to_string()))
            }
            Value::Object(fields) => decode_versioned(fields),
            _ => Err(ProtocolError::UnexpectedShape),
        }
    }
}

/// Host to widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostCommand {
    /// Open the chat panel.
    ForceOpenChatbox,
    /// Close the chat panel.
    ForceCloseChatbox,
    /// Open the widget.
    OpenWidget,
    /// Close the widget.
    CloseWidget,
}

impl HostCommand {
    /// Whether the command opens the panel.
    #[must_use]
    pub const fn opens(self) -> bool {
        matches!(self, Self::ForceOpenChatbox | Self::OpenWidget)
    }

    /// Encode for posting from the host side.
    #[must_use]
    pub fn encode(&self, format: WireFormat) -> Value {
        match format {
            WireFormat::Legacy => json!(match self {
                Self::ForceOpenChatbox => "forceOpenChatbox",
                Self::ForceCloseChatbox => "forceCloseChatbox",
                Self::OpenWidget => "openWidget",
                Self::CloseWidget => "closeWidget",
            }),
            WireFormat::Versioned => versioned(self),
        }
    }

    /// Decode a message in either format.
    ///
    /// # Errors
    /// Returns an error if the message is not a known host command.
    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        match value {
            Value::String(token) => match token.as_str() {
                "forceOpenChatbox" => Ok(Self::ForceOpenChatbox),
                "forceCloseChatbox" => Ok(Self::ForceCloseChatbox),
                "openWidget" => Ok(Self::OpenWidget),
                "closeWidget" => Ok(Self::CloseWidget),
                other => Err(ProtocolError::UnknownToken(other.to_string())),
            },
            Value::Object(fields) => decode_versioned(fields),
            _ => Err(ProtocolError::UnexpectedShape),
        }
    }
}

fn versioned<T: Serialize>(message: &T) -> Value {
    let mut value = serde_json::to_value(message).unwrap_or(Value::Null);
    if let Value::Object(fields) = &mut value {
        let _ = fields.insert("v".to_string(), json!(PROTOCOL_VERSION));
    }
    value
}

fn decode_versioned<T: for<'de> Deserialize<'de>>(
    fields: &Map<String, Value>,
) -> Result<T, ProtocolError> {
    let version = fields
        .get("v")
        .and_then(Value::as_u64)
        .ok_or(ProtocolError::UnexpectedShape)?;
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }
    let mut fields = fields.clone();
    let _ = fields.remove("v");
    serde_json::from_value(Value::Object(fields)).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_tokens() {
        assert_eq!(WidgetEvent::OpenChatbox.encode(WireFormat::Legacy), json!("openChatbox"));
        assert_eq!(
            WidgetEvent::Status {
                status: WidgetStatus::Ready
            }
            .encode(WireFormat::Legacy),
            json!("widget-ready")
        );
        assert_eq!(
            HostCommand::decode(&json!("forceCloseChatbox")),
            Ok(HostCommand::ForceCloseChatbox)
        );
    }

    #[test]
    fn legacy_resize_shape() {
        let resize = WidgetEvent::Resize(ResizeRequest {
            action: ResizeAction::Expand,
            width: 400,
            height: 600,
        });
        let encoded = resize.encode(WireFormat::Legacy);
        assert_eq!(
            encoded,
            json!({"type": "SIDREX_RESIZE", "action": "expand", "width": 400, "height": 600})
        );
        assert_eq!(WidgetEvent::decode(&encoded), Ok(resize));
    }

    #[test]
    fn versioned_messages_carry_version() {
        let encoded = HostCommand::OpenWidget.encode(WireFormat::Versioned);
        assert_eq!(encoded, json!({"v": 1, "type": "openWidget"}));
        assert_eq!(HostCommand::decode(&encoded), Ok(HostCommand::OpenWidget));

        let status = WidgetEvent::Status {
            status: WidgetStatus::Error,
        };
        let encoded = status.encode(WireFormat::Versioned);
        assert_eq!(encoded, json!({"v": 1, "type": "status", "status": "error"}));
        assert_eq!(WidgetEvent::decode(&encoded), Ok(status));
    }

    #[test]
    fn rejects_bad_messages() {
        assert_eq!(
            HostCommand::decode(&json!("openChatbox")),
            Err(ProtocolError::UnknownToken("openChatbox".to_string()))
        );
        assert_eq!(
            HostCommand::decode(&json!({"v": 2, "type": "openWidget"})),
            Err(ProtocolError::UnsupportedVersion(2))
        );
        assert!(matches!(
            HostCommand::decode(&json!({"v": 1, "type": "launchRockets"})),
            Err(ProtocolError::Malformed(_))
        ));
        assert_eq!(
            HostCommand::decode(&json!({"type": "openWidget"})),
            Err(ProtocolError::UnexpectedShape)
        );
        assert_eq!(HostCommand::decode(&json!(42)), Err(ProtocolError::UnexpectedShape));
    }

    #[test]
    fn open_commands() {
        assert!(HostCommand::ForceOpenChatbox.opens());
        assert!(HostCommand::OpenWidget.opens());
        assert!(!HostCommand::CloseWidget.opens());
    }
}
