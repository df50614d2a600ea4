//! Fire-and-forget signaling between the widget and its host frame.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::protocol::{
    HostCommand, ResizeRequest, WidgetEvent, WidgetStatus, WireFormat,
};

/// Callback run on open or close.
pub type Handler = Arc<dyn Fn() + Send + Sync>;

/// Failure to post into the parent frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The parent went away.
    #[error("parent frame detached")]
    Detached,
    /// The frame refused the message.
    #[error("post failed: {0}")]
    Post(String),
}

/// The window the widget is embedded in.
pub trait ParentFrame: Send + Sync {
    /// Whether a distinct parent exists.
    fn is_embedded(&self) -> bool;

    /// Post a message to the parent.
    ///
    /// # Errors
    /// Returns an error if the message could not be delivered.
    fn post_message(&self, message: &Value, target_origin: &str) -> Result<(), FrameError>;
}

/// Frame for a widget running top-level: nothing to signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedFrame;

impl ParentFrame for DetachedFrame {
    fn is_embedded(&self) -> bool {
        false
    }

    fn post_message(&self, _message: &Value, _target_origin: &str) -> Result<(), FrameError> {
        Err(FrameError::Detached)
    }
}

/// A posted message as the host sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct PostedMessage {
    /// Encoded message.
    pub message: Value,
    /// Target origin it was posted with.
    pub target_origin: String,
}

/// Frame that forwards posts into a channel read by the host side.
#[derive(Clone, Debug)]
pub struct ForwardingFrame {
    tx: mpsc::UnboundedSender<PostedMessage>,
}

impl ForwardingFrame {
    /// Frame and the receiving end the host reads from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PostedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ParentFrame for ForwardingFrame {
    fn is_embedded(&self) -> bool {
        !self.tx.is_closed()
    }

    fn post_message(&self, message: &Value, target_origin: &str) -> Result<(), FrameError> {
        self.tx
            .send(PostedMessage {
                message: message.clone(),
                target_origin: target_origin.to_string(),
            })
            .map_err(|_| FrameError::Detached)
    }
}

/// Which origins inbound messages may come from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "origins")]
pub enum OriginPolicy {
    /// Accept every origin.
    #[default]
    Any,
    /// Accept only the listed origins, compared exactly.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Whether `origin` passes.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::AllowList(origins) => origins.iter().any(|allowed| allowed == origin),
        }
    }
}

/// Channel settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelOptions {
    /// When false the channel neither posts nor accepts messages.
    pub enabled: bool,
    /// Target origin for outbound posts.
    pub target_origin: String,
    /// Filter for inbound messages.
    pub origin_policy: OriginPolicy,
    /// Outbound encoding.
    pub wire_format: WireFormat,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            target_origin: "*".to_string(),
            origin_policy: OriginPolicy::Any,
            wire_format: WireFormat::Legacy,
        }
    }
}

impl ChannelOptions {
    /// Restrict inbound and outbound traffic to one host origin.
    #[must_use]
    pub fn pinned_to(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            target_origin: origin.clone(),
            origin_policy: OriginPolicy::AllowList(vec![origin]),
            ..Self::default()
        }
    }

    /// Set the outbound wire format.
    #[must_use]
    pub const fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }
}

/// Message received from the host.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    /// Sender origin.
    pub origin: String,
    /// Payload.
    pub data: Value,
}

impl InboundMessage {
    /// New message.
    #[must_use]
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Widget side of the cross-frame channel.
pub struct WidgetChannel {
    frame: Arc<dyn ParentFrame>,
    options: ChannelOptions,
    on_open: Option<Handler>,
    on_close: Option<Handler>,
}

impl fmt::Debug for WidgetChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetChannel")
            .field("options", &self.options)
            .field("embedded", &self.frame.is_embedded())
            .finish_non_exhaustive()
    }
}

impl WidgetChannel {
    /// Channel over `frame`.
    #[must_use]
    pub const fn new(frame: Arc<dyn ParentFrame>, options: ChannelOptions) -> Self {
        Self {
            frame,
            options,
            on_open: None,
            on_close: None,
        }
    }

    /// Run `handler` on open signals and open commands.
    #[must_use]
    pub fn on_open(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(handler));
        self
    }

    /// Run `handler` on close signals and close commands.
    #[must_use]
    pub fn on_close(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(handler));
        self
    }

    /// Active options.
    #[must_use]
    pub const fn options(&self) -> &ChannelOptions {
        &self.options
    }

    /// Whether posts can reach a parent.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        self.options.enabled && self.frame.is_embedded()
    }

    /// Post `event` if embedded. Returns whether it was handed to the parent.
    pub fn send(&self, event: WidgetEvent) -> bool {
        if !self.is_embedded() {
            return false;
        }
        let message = event.encode(self.options.wire_format);
        match self
            .frame
            .post_message(&message, &self.options.target_origin)
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, ?event, "widget signal dropped");
                false
            }
        }
    }

    /// Signal that the user engaged the widget.
    pub fn notify_robot_clicked(&self) -> bool {
        self.send(WidgetEvent::RobotClicked)
    }

    /// Signal that the panel opened and run the open handler.
    pub fn notify_open_chatbox(&self) -> bool {
        let posted = self.send(WidgetEvent::OpenChatbox);
        if let Some(handler) = &self.on_open {
            handler();
        }
        posted
    }

    /// Signal that the panel closed and run the close handler.
    pub fn notify_close_chatbox(&self) -> bool {
        let posted = self.send(WidgetEvent::CloseChatbox);
        if let Some(handler) = &self.on_close {
            handler();
        }
        posted
    }

    /// Signal that the widget was dismissed.
    pub fn notify_widget_closed(&self) -> bool {
        self.send(WidgetEvent::WidgetClosed)
    }

    /// Report lifecycle status.
    pub fn notify_parent(&self, status: WidgetStatus) -> bool {
        self.send(WidgetEvent::Status { status })
    }

    /// Ask the host to resize the iframe.
    pub fn request_resize(&self, request: ResizeRequest) -> bool {
        self.send(WidgetEvent::Resize(request))
    }

    /// Check origin and decode a host message without running handlers.
    #[must_use]
    pub fn accept(&self, message: &InboundMessage) -> Option<HostCommand> {
        if !self.options.enabled {
            return None;
        }
        if !self.options.origin_policy.allows(&message.origin) {
            tracing::debug!(origin = %message.origin, "ignoring message from disallowed origin");
            return None;
        }
        match HostCommand::decode(&message.data) {
            Ok(command) => Some(command),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring unrecognised host message");
                None
            }
        }
    }

    /// Accept a host message and run the matching handler.
    pub fn handle_inbound(&self, message: &InboundMessage) -> Option<HostCommand> {
        let command = self.accept(message)?;
        let handler = if command.opens() {
            &self.on_open
        } else {
            &self.on_close
        };
        if let Some(handler) = handler {
            handler();
        }
        Some(command)
    }

    /// Handle host messages from `rx` until the sender side closes.
    pub fn spawn_listener(self: Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let _ = self.handle_inbound(&message);
            }
            tracing::debug!("widget listener stopped");
        })
    }
}
