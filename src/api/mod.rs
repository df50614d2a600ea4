//! REST client for the robots backend.
//!
//! - Session cookies kept in a shared jar
//! - CSRF token echoed on mutating requests
//! - GET responses cached with a TTL, cleared by any successful write

mod accounts;
mod auth;
pub mod cache;
mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
mod robots;

pub use accounts::ProfileFields;
pub use cache::{CacheStats, ResponseCache};
pub use client::ApiClient;
pub use config::{ApiConfig, CacheConfig};
pub use endpoints::PdfListFilter;
pub use error::{ApiError, ApiResult};
pub use models::{
    Brand, ChatReply, ChatRequest, Citation, Credentials, PdfType, PdfUpdate, PdfUpload, Profile,
    Registration, Robot, RobotMessages, RobotPdf, User,
};
