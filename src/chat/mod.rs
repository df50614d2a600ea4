//! Chat messages, the single-flight request client and the per-widget session.

pub mod format;
pub mod message;
pub mod request;
pub mod session;

pub use format::{TextSpan, parse_emphasis};
pub use message::{ChatMessage, MessageId, MessageIdGenerator, MessageStatus};
pub use request::{
    ChatBackend, ChatFailure, ChatOutcome, ChatRequestClient, ChatValidationError,
    ValidatedMessage,
};
pub use session::{ChatSession, SessionStatus, SubmitOutcome};
