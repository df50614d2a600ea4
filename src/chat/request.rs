//! Single-flight chat request client.
//!
//! Each client owns at most one in-flight request. Sending a new message
//! aborts the previous one before the new request is issued, so the last
//! submission always wins.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{AbortHandle, Abortable, Aborted};
use thiserror::Error;

use crate::api::models::{ChatReply, ChatRequest};
use crate::api::{ApiClient, ApiResult};
use crate::widget::persona::RobotSlug;

/// Boxed future type for chat backends.
pub type ChatFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shown for any failure without a more specific message.
pub const GENERIC_ERROR_TEXT: &str =
    "Üzgünüm, şu anda bir sorun yaşıyorum. Lütfen daha sonra tekrar deneyin.";
/// Shown when the gateway dropped the connection.
pub const CONNECTION_DROPPED_TEXT: &str = "Sunucu yanıt vermedi. Lütfen tekrar deneyin.";
/// Shown when the backend answered without reply text.
pub const EMPTY_REPLY_TEXT: &str = "Yanıt alınamadı, lütfen tekrar deneyin.";

/// Anything that can answer a chat message for a robot.
pub trait ChatBackend: Send + Sync {
    /// Send one message.
    ///
    /// # Errors
    /// Returns an error if the request fails or the server rejects it.
    fn send_message(
        &self,
        slug: &RobotSlug,
        request: ChatRequest,
    ) -> ChatFuture<'_, ApiResult<ChatReply>>;
}

impl ChatBackend for ApiClient {
    fn send_message(
        &self,
        slug: &RobotSlug,
        request: ChatRequest,
    ) -> ChatFuture<'_, ApiResult<ChatReply>> {
        let slug = slug.as_str().to_string();
        Box::pin(async move { self.send_chat(&slug, &request).await })
    }
}

/// Rejected before any request was made.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatValidationError {
    /// Blank after trimming.
    #[error("message is empty")]
    Empty,
    /// Over the character limit.
    #[error("message is {actual} characters, limit is {max}")]
    TooLong {
        /// Limit in characters.
        max: usize,
        /// Length of the rejected message.
        actual: usize,
    },
}

impl ChatValidationError {
    /// Text suitable for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Empty => "Mesaj boş olamaz!".to_string(),
            Self::TooLong { max, .. } => format!("Mesaj en fazla {max} karakter olabilir."),
        }
    }
}

/// Trimmed, non-empty message within the length limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedMessage(String);

impl ValidatedMessage {
    /// Validate raw input.
    ///
    /// # Errors
    /// Returns an error if the text is blank or longer than `max_chars`.
    pub fn parse(text: &str, max_chars: usize) -> Result<Self, ChatValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatValidationError::Empty);
        }
        let actual = trimmed.chars().count();
        if actual > max_chars {
            return Err(ChatValidationError::TooLong {
                max: max_chars,
                actual,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Validated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Why a request produced no reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatFailure {
    /// The gateway dropped the connection (HTTP 504).
    ConnectionDropped,
    /// The backend answered without reply text.
    EmptyReply,
    /// Any other failure.
    Failed {
        /// Raw detail, for logs.
        detail: String,
    },
}

impl ChatFailure {
    /// Text suitable for the user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::ConnectionDropped => CONNECTION_DROPPED_TEXT,
            Self::EmptyReply => EMPTY_REPLY_TEXT,
            Self::Failed { .. } => GENERIC_ERROR_TEXT,
        }
    }
}

/// Result of one send.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatOutcome {
    /// Reply with non-empty text.
    Reply(ChatReply),
    /// A newer send replaced this one.
    Superseded,
    /// [`ChatRequestClient::cancel`] was called.
    Cancelled,
    /// The request failed.
    Failed(ChatFailure),
}

struct InFlight {
    ticket: u64,
    handle: AbortHandle,
    cancelled: Arc<AtomicBool>,
}

/// Frees the in-flight slot when a send completes or its future is dropped.
struct SlotRelease<'a> {
    client: &'a ChatRequestClient,
    ticket: u64,
}

impl SlotRelease<'_> {
    fn release(&self) -> bool {
        self.client.finish(self.ticket)
    }
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        if self.release() {
            tracing::debug!(slug = %self.client.slug, ticket = self.ticket, "chat request abandoned");
        }
    }
}

/// Chat request client for one robot.
pub struct ChatRequestClient {
    backend: Arc<dyn ChatBackend>,
    slug: RobotSlug,
    conversation_id: String,
    in_flight: Mutex<Option<InFlight>>,
    tickets: AtomicU64,
}

impl std::fmt::Debug for ChatRequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRequestClient")
            .field("slug", &self.slug)
            .field("conversation_id", &self.conversation_id)
            .field("sending", &self.is_sending())
            .finish_non_exhaustive()
    }
}

impl ChatRequestClient {
    /// Client using the default `robot_<slug>` conversation.
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, slug: RobotSlug) -> Self {
        let conversation_id = format!("robot_{slug}");
        Self::with_conversation(backend, slug, conversation_id)
    }

    /// Client using an explicit conversation id.
    #[must_use]
    pub fn with_conversation(
        backend: Arc<dyn ChatBackend>,
        slug: RobotSlug,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            slug,
            conversation_id: conversation_id.into(),
            in_flight: Mutex::new(None),
            tickets: AtomicU64::new(0),
        }
    }

    /// Robot this client talks to.
    #[must_use]
    pub const fn slug(&self) -> &RobotSlug {
        &self.slug
    }

    /// Conversation id sent with every message.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.slot().is_some()
    }

    /// Abort the in-flight request, if any. Returns whether one was aborted.
    pub fn cancel(&self) -> bool {
        let Some(current) = self.slot().take() else {
            return false;
        };
        current.cancelled.store(true, Ordering::SeqCst);
        current.handle.abort();
        tracing::debug!(slug = %self.slug, ticket = current.ticket, "chat request cancelled");
        true
    }

    /// Send `message`, aborting any request still in flight.
    pub async fn send(&self, message: ValidatedMessage) -> ChatOutcome {
        let (handle, registration) = AbortHandle::new_pair();
        let cancelled = Arc::new(AtomicBool::new(false));
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = self.slot().replace(InFlight {
            ticket,
            handle,
            cancelled: Arc::clone(&cancelled),
        });
        if let Some(previous) = previous {
            previous.handle.abort();
            tracing::debug!(slug = %self.slug, ticket = previous.ticket, "chat request superseded");
        }
        let guard = SlotRelease {
            client: self,
            ticket,
        };

        let request = ChatRequest {
            message: message.into_inner(),
            conversation_id: self.conversation_id.clone(),
        };
        let result = Abortable::new(self.backend.send_message(&self.slug, request), registration).await;
        let still_current = guard.release();

        if cancelled.load(Ordering::SeqCst) {
            return ChatOutcome::Cancelled;
        }
        match result {
            Err(Aborted) => ChatOutcome::Superseded,
            Ok(_) if !still_current => ChatOutcome::Superseded,
            Ok(Ok(reply)) => self.classify_reply(reply),
            Ok(Err(err)) => {
                tracing::error!(slug = %self.slug, error = %err, "chat request failed");
                if err.status() == Some(504) {
                    ChatOutcome::Failed(ChatFailure::ConnectionDropped)
                } else {
                    ChatOutcome::Failed(ChatFailure::Failed {
                        detail: err.to_string(),
                    })
                }
            }
        }
    }

    /// Release the slot if `ticket` still owns it.
    fn finish(&self, ticket: u64) -> bool {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|current| current.ticket == ticket) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn classify_reply(&self, reply: ChatReply) -> ChatOutcome {
        if reply.reply_text().is_some() {
            return ChatOutcome::Reply(reply);
        }
        if let Some(detail) = reply.error {
            tracing::error!(slug = %self.slug, error = %detail, "chat backend reported an error");
            return ChatOutcome::Failed(ChatFailure::Failed { detail });
        }
        tracing::warn!(slug = %self.slug, "chat reply had no text");
        ChatOutcome::Failed(ChatFailure::EmptyReply)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;
    use crate::api::ApiError;

    /// Backend answering from a script, each step after a delay.
    pub(crate) struct ScriptedBackend {
        steps: Mutex<VecDeque<(Duration, ApiResult<ChatReply>)>>,
        pub(crate) seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(steps: Vec<(Duration, ApiResult<ChatReply>)>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn echo(delay: Duration, count: usize) -> Arc<Self> {
            Self::new(
                (0..count)
                    .map(|_| (delay, Ok(ChatReply::default())))
                    .collect(),
            )
        }
    }

    impl ChatBackend for ScriptedBackend {
        fn send_message(
            &self,
            _slug: &RobotSlug,
            request: ChatRequest,
        ) -> ChatFuture<'_, ApiResult<ChatReply>> {
            let step = self.steps.lock().unwrap().pop_front();
            let text = request.message.clone();
            self.seen.lock().unwrap().push(request);
            Box::pin(async move {
                let (delay, result) =
                    step.unwrap_or((Duration::ZERO, Err(ApiError::Validation("no step".into()))));
                tokio::time::sleep(delay).await;
                result.map(|reply| {
                    if reply == ChatReply::default() {
                        ChatReply::text(format!("yanıt: {text}"))
                    } else {
                        reply
                    }
                })
            })
        }
    }

    fn slug() -> RobotSlug {
        RobotSlug::new("zzen").unwrap()
    }

    fn message(text: &str) -> ValidatedMessage {
        ValidatedMessage::parse(text, 1000).unwrap()
    }

    #[test]
    fn validation_rules() {
        assert_eq!(
            ValidatedMessage::parse("   ", 1000),
            Err(ChatValidationError::Empty)
        );
        assert_eq!(
            ValidatedMessage::parse("çok uzun", 3),
            Err(ChatValidationError::TooLong { max: 3, actual: 8 })
        );
        assert_eq!(message("  selam \n").as_str(), "selam");
        assert!(ValidatedMessage::parse(&"ş".repeat(1000), 1000).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn reply_uses_default_conversation() {
        let backend = ScriptedBackend::echo(Duration::from_millis(10), 1);
        let client = ChatRequestClient::new(backend.clone(), slug());

        let outcome = client.send(message("selam")).await;
        assert_eq!(
            outcome,
            ChatOutcome::Reply(ChatReply::text("yanıt: selam"))
        );
        assert!(!client.is_sending());
        assert_eq!(backend.seen.lock().unwrap()[0].conversation_id, "robot_zzen");
    }

    #[tokio::test(start_paused = true)]
    async fn newer_send_supersedes_older() {
        let backend = ScriptedBackend::echo(Duration::from_millis(100), 2);
        let client = Arc::new(ChatRequestClient::new(backend, slug()));

        let first = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.send(message("selam")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(client.is_sending());
        let second = client.send(message("merhaba")).await;

        assert_eq!(first.await.unwrap(), ChatOutcome::Superseded);
        assert_eq!(second, ChatOutcome::Reply(ChatReply::text("yanıt: merhaba")));
        assert!(!client.is_sending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reports_cancelled() {
        let backend = ScriptedBackend::echo(Duration::from_secs(5), 1);
        let client = Arc::new(ChatRequestClient::new(backend, slug()));

        let pending = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.send(message("selam")).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(client.cancel());
        assert!(!client.cancel());
        assert_eq!(pending.await.unwrap(), ChatOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_send_frees_the_slot() {
        let backend = ScriptedBackend::echo(Duration::from_secs(30), 2);
        let client = ChatRequestClient::new(backend, slug());

        let timed_out =
            tokio::time::timeout(Duration::from_millis(100), client.send(message("selam"))).await;
        assert!(timed_out.is_err());
        assert!(!client.is_sending());
        assert!(!client.cancel());

        let outcome = client.send(message("merhaba")).await;
        assert_eq!(outcome, ChatOutcome::Reply(ChatReply::text("yanıt: merhaba")));
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let backend = ScriptedBackend::new(vec![
            (Duration::ZERO, Err(ApiError::from_status(504, ""))),
            (Duration::ZERO, Err(ApiError::from_status(500, r#"{"error":"boom"}"#))),
            (Duration::ZERO, Ok(ChatReply::text("  "))),
            (
                Duration::ZERO,
                Ok(ChatReply {
                    error: Some("Bu robota erişim yetkiniz yok.".to_string()),
                    ..ChatReply::default()
                }),
            ),
        ]);
        let client = ChatRequestClient::new(backend, slug());

        let dropped = client.send(message("a")).await;
        assert_eq!(dropped, ChatOutcome::Failed(ChatFailure::ConnectionDropped));

        let ChatOutcome::Failed(failure) = client.send(message("b")).await else {
            panic!("expected failure");
        };
        assert_eq!(failure.user_message(), GENERIC_ERROR_TEXT);

        let empty = client.send(message("c")).await;
        assert_eq!(empty, ChatOutcome::Failed(ChatFailure::EmptyReply));

        let reported = client.send(message("d")).await;
        assert_eq!(
            reported,
            ChatOutcome::Failed(ChatFailure::Failed {
                detail: "Bu robota erişim yetkiniz yok.".to_string()
            })
        );
    }
}
