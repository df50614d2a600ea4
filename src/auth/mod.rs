//! Session authentication and permission derivation.

pub mod context;
pub mod permissions;

pub use context::{
    AuthBackend, AuthContext, LOGIN_PATH, LoginOutcome, Navigator, RecordingNavigator,
};
pub use permissions::{Permissions, UserType};

pub use crate::api::models::{Credentials, Registration, User};
