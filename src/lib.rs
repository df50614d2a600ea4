//! Client SDK for the Sidrex robot chat widgets.
//!
//! The crate covers the parts of the widget stack that carry behaviour:
//! the REST client with CSRF and response caching, the per-widget chat
//! request lifecycle, the cross-frame signaling protocol, and the
//! session-cookie authentication context with derived permissions.

// Strict bans on unsafe or non-idiomatic code
#![deny(warnings)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(dead_code)]
#![deny(non_camel_case_types)]

// Nothing slips through
#![deny(unused_imports)]
#![deny(unused_variables)]
#![deny(unused_must_use)]
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::missing_const_for_fn)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::module_inception)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::shadow_unrelated)]
#![deny(clippy::too_many_arguments)]
#![deny(clippy::cognitive_complexity)]

// Robustness
#![deny(overflowing_literals)]
// Crate-wide relaxations
#![allow(
    clippy::module_name_repetitions,
    clippy::significant_drop_tightening,
    clippy::must_use_candidate,
    clippy::option_if_let_else
)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::shadow_unrelated,
        clippy::too_many_lines,
        clippy::redundant_pub_crate
    )
)]

/// Typed REST client for the robots backend.
#[allow(clippy::missing_errors_doc)]
pub mod api;
/// Authentication context and permission derivation.
#[allow(clippy::missing_errors_doc)]
pub mod auth;
/// Chat messages, request client and per-widget session.
pub mod chat;
/// Time sources used for cache expiry.
pub mod clock;
/// In-memory backend implementing the REST contract for local development.
#[allow(
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::unused_async,
    clippy::needless_pass_by_value
)]
pub mod mock_backend;
/// Entry helpers for the development backend binary.
#[allow(clippy::missing_errors_doc)]
pub mod start_mock_backend;
/// Tracing subscriber setup.
#[allow(clippy::missing_errors_doc)]
pub mod telemetry;
/// Embeddable widget: protocol, channel, personas and sizing.
pub mod widget;

pub use api::{ApiClient, ApiConfig, ApiError, ApiResult};
pub use auth::{AuthContext, Permissions, UserType};
pub use chat::{ChatMessage, ChatOutcome, ChatSession, MessageStatus};
pub use widget::{RobotPersona, RobotSlug, Widget, WidgetChannel};
