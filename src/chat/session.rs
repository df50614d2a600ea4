//! Per-widget chat transcript driven by a [`ChatRequestClient`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::message::{ChatMessage, MessageId, MessageIdGenerator};
use super::request::{
    ChatBackend, ChatFailure, ChatOutcome, ChatRequestClient, ChatValidationError,
    ValidatedMessage,
};
use crate::widget::persona::RobotPersona;

/// Whether a reply is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing in flight.
    Idle,
    /// A placeholder is waiting for its reply.
    Sending,
}

/// What a call to [`ChatSession::submit`] ended with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The placeholder now holds the reply.
    Replied {
        /// Id of the assistant message.
        id: MessageId,
    },
    /// The placeholder now holds an error text.
    Failed {
        /// Id of the assistant message.
        id: MessageId,
        /// Failure cause.
        failure: ChatFailure,
    },
    /// A newer submission took over the placeholder.
    Superseded,
    /// The session was cancelled or cleared while waiting.
    Cancelled,
    /// The input was rejected; nothing was added or sent.
    Rejected(ChatValidationError),
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<ChatMessage>,
    pending: Option<MessageId>,
    generation: u64,
}

impl SessionState {
    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|message| message.id == id)
    }

    fn remove_pending(&mut self) -> Option<ChatMessage> {
        let id = self.pending.take()?;
        let index = self.position(id)?;
        Some(self.messages.remove(index))
    }
}

/// Drops the loading placeholder of a submission whose future is abandoned.
struct PendingRelease<'a> {
    session: &'a ChatSession,
    generation: u64,
    armed: bool,
}

impl PendingRelease<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingRelease<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.session.state();
        if state.generation == self.generation && state.remove_pending().is_some() {
            tracing::debug!(session = %self.session.id, "abandoned submission dropped its placeholder");
        }
    }
}

/// Transcript and request lifecycle of one widget.
///
/// Every submission appends the user message and moves the single loading
/// placeholder behind it, so a superseded request never leaves a bubble
/// behind. A late result is dropped unless its submission is still the
/// newest one.
#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    persona: RobotPersona,
    client: ChatRequestClient,
    ids: MessageIdGenerator,
    max_chars: usize,
    state: Mutex<SessionState>,
}

/// Session id; time-ordered with feature `uuid_v7`.
fn new_session_id() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

impl ChatSession {
    /// New session seeded with the persona's greetings.
    #[must_use]
    pub fn new(persona: RobotPersona, backend: Arc<dyn ChatBackend>, max_chars: usize) -> Self {
        let client = ChatRequestClient::with_conversation(
            backend,
            persona.slug.clone(),
            persona.conversation_id(),
        );
        let session = Self {
            id: new_session_id(),
            persona,
            client,
            ids: MessageIdGenerator::new(),
            max_chars,
            state: Mutex::new(SessionState::default()),
        };
        session.seed_greetings(&mut session.state());
        tracing::debug!(session = %session.id, robot = %session.persona.slug, "chat session started");
        session
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seed_greetings(&self, state: &mut SessionState) {
        state.messages.extend(
            self.persona
                .greetings
                .iter()
                .map(|text| ChatMessage::greeting(self.ids.next_id(), text.clone())),
        );
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Persona this session talks to.
    #[must_use]
    pub const fn persona(&self) -> &RobotPersona {
        &self.persona
    }

    /// Snapshot of the transcript.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.state().pending.is_some() {
            SessionStatus::Sending
        } else {
            SessionStatus::Idle
        }
    }

    /// Submit user text and wait for its reply.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let message = match ValidatedMessage::parse(text, self.max_chars) {
            Ok(message) => message,
            Err(err) => return SubmitOutcome::Rejected(err),
        };

        let (generation, placeholder_id) = {
            let mut state = self.state();
            state.generation += 1;
            state
                .messages
                .push(ChatMessage::user(self.ids.next_id(), message.as_str()));
            let placeholder = state
                .remove_pending()
                .unwrap_or_else(|| ChatMessage::placeholder(self.ids.next_id()));
            let id = placeholder.id;
            state.messages.push(placeholder);
            state.pending = Some(id);
            (state.generation, id)
        };

        let guard = PendingRelease {
            session: self,
            generation,
            armed: true,
        };
        let outcome = self.client.send(message).await;
        guard.disarm();

        let mut state = self.state();
        if state.generation != generation {
            return match outcome {
                ChatOutcome::Cancelled => SubmitOutcome::Cancelled,
                _ => SubmitOutcome::Superseded,
            };
        }

        match outcome {
            ChatOutcome::Reply(reply) => {
                let text = reply.reply_text().unwrap_or_default().to_string();
                state.pending = None;
                if let Some(index) = state.position(placeholder_id) {
                    state.messages[index].resolve(text, &reply);
                }
                SubmitOutcome::Replied { id: placeholder_id }
            }
            ChatOutcome::Failed(failure) => {
                state.pending = None;
                if let Some(index) = state.position(placeholder_id) {
                    state.messages[index].fail(failure.user_message());
                }
                SubmitOutcome::Failed {
                    id: placeholder_id,
                    failure,
                }
            }
            ChatOutcome::Superseded => SubmitOutcome::Superseded,
            ChatOutcome::Cancelled => SubmitOutcome::Cancelled,
        }
    }

    /// Abort the pending request and drop its placeholder.
    pub fn cancel(&self) -> bool {
        let aborted = self.client.cancel();
        let mut state = self.state();
        state.generation += 1;
        let removed = state.remove_pending().is_some();
        aborted || removed
    }

    /// Cancel any request and reset the transcript to the greetings.
    pub fn clear(&self) {
        let _ = self.client.cancel();
        let mut state = self.state();
        state.generation += 1;
        state.pending = None;
        state.messages.clear();
        self.seed_greetings(&mut state);
        tracing::debug!(session = %self.id, "chat session cleared");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::ApiError;
    use crate::api::models::ChatReply;
    use crate::chat::message::MessageStatus;
    use crate::chat::request::tests::ScriptedBackend;
    use crate::chat::request::{CONNECTION_DROPPED_TEXT, GENERIC_ERROR_TEXT};
    use crate::widget::persona::presets;

    fn session(backend: Arc<ScriptedBackend>) -> Arc<ChatSession> {
        Arc::new(ChatSession::new(presets::zzen(), backend, 1000))
    }

    #[tokio::test(start_paused = true)]
    async fn zzen_selam_then_merhaba() {
        let backend = ScriptedBackend::echo(Duration::from_millis(100), 2);
        let chat = session(backend.clone());
        let greetings = chat.messages().len();

        let selam = tokio::spawn({
            let chat = Arc::clone(&chat);
            async move { chat.submit("selam").await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let placeholder = chat.messages().last().unwrap().clone();
        assert!(placeholder.is_loading());

        let merhaba = chat.submit("merhaba").await;
        assert_eq!(selam.await.unwrap(), SubmitOutcome::Superseded);
        assert_eq!(merhaba, SubmitOutcome::Replied { id: placeholder.id });

        let messages = chat.messages();
        let added = &messages[greetings..];
        let bot: Vec<&ChatMessage> = added.iter().filter(|m| !m.is_user).collect();
        assert_eq!(added.len(), 3);
        assert_eq!(bot.len(), 1);
        assert_eq!(bot[0].id, placeholder.id);
        assert_eq!(bot[0].text, "yanıt: merhaba");
        assert_eq!(bot[0].status, MessageStatus::Ok);
        assert_eq!(added[0].text, "selam");
        assert_eq!(added[1].text, "merhaba");
        assert!(messages.iter().all(|m| !m.text.contains("yanıt: selam")));
        assert_eq!(chat.status(), SessionStatus::Idle);
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn each_submission_adds_at_most_two() {
        let backend = ScriptedBackend::echo(Duration::from_millis(5), 3);
        let chat = session(backend);
        let mut len = chat.messages().len();
        for text in ["bir", "iki", "üç"] {
            let outcome = chat.submit(text).await;
            let SubmitOutcome::Replied { id } = outcome else {
                panic!("unexpected outcome {outcome:?}");
            };
            let messages = chat.messages();
            assert_eq!(messages.len(), len + 2);
            assert_eq!(messages.last().unwrap().id, id);
            len = messages.len();
        }
    }

    #[tokio::test]
    async fn greetings_are_seeded() {
        let chat = session(ScriptedBackend::echo(Duration::ZERO, 0));
        let messages = chat.messages();
        assert_eq!(messages.len(), presets::zzen().greetings.len());
        assert!(messages.iter().all(|m| !m.is_user && m.status == MessageStatus::Ok));
    }

    #[tokio::test]
    async fn errors_replace_placeholder() {
        let backend = ScriptedBackend::new(vec![
            (Duration::ZERO, Err(ApiError::from_status(504, ""))),
            (Duration::ZERO, Err(ApiError::Validation("offline".into()))),
        ]);
        let chat = session(backend);

        let outcome = chat.submit("selam").await;
        let SubmitOutcome::Failed { id, failure } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(failure, ChatFailure::ConnectionDropped);
        let last = chat.messages().last().unwrap().clone();
        assert_eq!(last.id, id);
        assert_eq!(last.status, MessageStatus::Error);
        assert_eq!(last.text, CONNECTION_DROPPED_TEXT);

        let _ = chat.submit("tekrar").await;
        assert_eq!(chat.messages().last().unwrap().text, GENERIC_ERROR_TEXT);
    }

    #[tokio::test]
    async fn rejected_input_changes_nothing() {
        let chat = session(ScriptedBackend::echo(Duration::ZERO, 0));
        let before = chat.messages();
        assert_eq!(
            chat.submit("  ").await,
            SubmitOutcome::Rejected(ChatValidationError::Empty)
        );
        assert_eq!(chat.messages(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_placeholder_silently() {
        let backend = ScriptedBackend::echo(Duration::from_secs(30), 1);
        let chat = session(backend);
        let greetings = chat.messages().len();

        let pending = tokio::spawn({
            let chat = Arc::clone(&chat);
            async move { chat.submit("selam").await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(chat.status(), SessionStatus::Sending);
        assert!(chat.cancel());

        assert_eq!(pending.await.unwrap(), SubmitOutcome::Cancelled);
        let messages = chat.messages();
        assert_eq!(messages.len(), greetings + 1);
        assert!(messages.iter().all(|m| !m.is_loading()));
        assert_eq!(chat.status(), SessionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_submission_returns_to_idle() {
        let backend = ScriptedBackend::echo(Duration::from_secs(30), 2);
        let chat = session(backend);
        let greetings = chat.messages().len();

        let timed_out = tokio::time::timeout(Duration::from_millis(100), chat.submit("selam")).await;
        assert!(timed_out.is_err());
        assert_eq!(chat.status(), SessionStatus::Idle);
        let messages = chat.messages();
        assert_eq!(messages.len(), greetings + 1);
        assert!(messages.iter().all(|m| !m.is_loading()));

        let outcome = chat.submit("merhaba").await;
        assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
        assert_eq!(chat.messages().len(), greetings + 3);
        assert_eq!(chat.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn clear_resets_to_greetings() {
        let backend = ScriptedBackend::new(vec![(Duration::ZERO, Ok(ChatReply::text("Merhaba!")))]);
        let chat = session(backend);
        let _ = chat.submit("selam").await;
        chat.clear();
        assert_eq!(chat.messages().len(), presets::zzen().greetings.len());
    }
}
