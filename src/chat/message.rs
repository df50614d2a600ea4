//! Chat transcript entries.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::models::{ChatReply, Citation};

/// Text shown while a reply is pending.
pub const LOADING_TEXT: &str = "...";

/// Millisecond-timestamp identifier of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Raw value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints strictly increasing ids from the wall clock.
///
/// Two ids requested in the same millisecond still differ.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: AtomicI64,
}

impl MessageIdGenerator {
    /// New generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Next id.
    pub fn next_id(&self) -> MessageId {
        let now = Utc::now().timestamp_millis();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return MessageId(candidate),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Delivery state of a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Reply pending; shown as a placeholder.
    Loading,
    /// Final.
    #[default]
    Ok,
    /// The request failed; text is a user-facing error.
    Error,
}

/// One entry of a widget transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Identifier, stable across placeholder replacement.
    pub id: MessageId,
    /// Text, possibly with `**emphasis**` markers.
    pub text: String,
    /// Whether the user wrote it.
    pub is_user: bool,
    /// Delivery state.
    pub status: MessageStatus,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Citations backing an assistant reply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// Whether retrieved context shaped the reply.
    #[serde(default)]
    pub context_used: bool,
}

impl ChatMessage {
    fn new(id: MessageId, text: impl Into<String>, is_user: bool, status: MessageStatus) -> Self {
        Self {
            id,
            text: text.into(),
            is_user,
            status,
            timestamp: Utc::now(),
            citations: Vec::new(),
            context_used: false,
        }
    }

    /// Message typed by the user.
    #[must_use]
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, true, MessageStatus::Ok)
    }

    /// Assistant greeting shown before any exchange.
    #[must_use]
    pub fn greeting(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, false, MessageStatus::Ok)
    }

    /// Pending assistant reply.
    #[must_use]
    pub fn placeholder(id: MessageId) -> Self {
        Self::new(id, LOADING_TEXT, false, MessageStatus::Loading)
    }

    /// Whether this is an unresolved placeholder.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == MessageStatus::Loading
    }

    /// Resolve a placeholder with a reply, keeping its id.
    pub fn resolve(&mut self, text: impl Into<String>, reply: &ChatReply) {
        self.text = text.into();
        self.status = MessageStatus::Ok;
        self.citations.clone_from(&reply.citations);
        self.context_used = reply.context_used;
        self.timestamp = Utc::now();
    }

    /// Resolve a placeholder with an error text, keeping its id.
    pub fn fail(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.status = MessageStatus::Error;
        self.citations.clear();
        self.context_used = false;
        self.timestamp = Utc::now();
    }
}
