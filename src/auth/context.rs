//! Application-wide authentication state.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::permissions::{self, Permissions};
use crate::api::models::{Credentials, Registration, User};
use crate::api::{ApiClient, ApiError, ApiResult};

/// Boxed future type for auth backends.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where the app goes after logout.
pub const LOGIN_PATH: &str = "/yonetim";

const CSRF_ERROR: &str = "Güvenlik token hatası. Lütfen sayfayı yenileyin.";
const LOGIN_FALLBACK_ERROR: &str = "Giriş yapılırken bir hata oluştu.";
const MISSING_CREDENTIALS_ERROR: &str = "Kullanıcı adı ve şifre gereklidir.";
const REGISTER_FALLBACK_ERROR: &str = "Kayıt başarısız";
const PASSWORD_MISMATCH_ERROR: &str = "Şifreler eşleşmiyor.";

/// Session endpoints the context needs.
pub trait AuthBackend: Send + Sync {
    /// Obtain a CSRF token.
    fn fetch_csrf_token(&self) -> AuthFuture<'_, ApiResult<Option<String>>>;
    /// Start a session.
    fn login<'a>(&'a self, credentials: &'a Credentials) -> AuthFuture<'a, ApiResult<()>>;
    /// End the session.
    fn logout(&self) -> AuthFuture<'_, ApiResult<()>>;
    /// The session's user.
    fn current_user(&self) -> AuthFuture<'_, ApiResult<User>>;
    /// Create an account.
    fn register<'a>(&'a self, registration: &'a Registration) -> AuthFuture<'a, ApiResult<Value>>;
}

impl AuthBackend for ApiClient {
    fn fetch_csrf_token(&self) -> AuthFuture<'_, ApiResult<Option<String>>> {
        Box::pin(Self::fetch_csrf_token(self))
    }

    fn login<'a>(&'a self, credentials: &'a Credentials) -> AuthFuture<'a, ApiResult<()>> {
        Box::pin(Self::login(self, credentials))
    }

    fn logout(&self) -> AuthFuture<'_, ApiResult<()>> {
        Box::pin(Self::logout(self))
    }

    fn current_user(&self) -> AuthFuture<'_, ApiResult<User>> {
        Box::pin(Self::current_user(self))
    }

    fn register<'a>(&'a self, registration: &'a Registration) -> AuthFuture<'a, ApiResult<Value>> {
        Box::pin(Self::register(self, registration))
    }
}

/// Moves the UI to another route.
pub trait Navigator: Send + Sync {
    /// Go to `path`.
    fn navigate(&self, path: &str);
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Paths navigated to, oldest first.
    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigate");
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}

/// Result of a login or registration attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Whether a session now exists.
    pub success: bool,
    /// User-facing error text.
    pub error: Option<String>,
}

impl LoginOutcome {
    const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Loading,
    Ready,
    TornDown,
}

#[derive(Debug)]
struct AuthState {
    user: Option<User>,
    phase: Phase,
}

/// Who is logged in, and what they may do.
///
/// Construct one per application, call [`init`](Self::init) once at startup
/// and [`teardown`](Self::teardown) on shutdown.
pub struct AuthContext {
    backend: Arc<dyn AuthBackend>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<AuthState>,
    init_started: AtomicBool,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("state", &*self.read())
            .finish_non_exhaustive()
    }
}

impl AuthContext {
    /// New context, not yet initialised.
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            backend,
            navigator,
            state: RwLock::new(AuthState {
                user: None,
                phase: Phase::Loading,
            }),
            init_started: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_user(&self, user: Option<User>) {
        let mut state = self.write();
        if state.phase != Phase::TornDown {
            state.user = user;
            state.phase = Phase::Ready;
        }
    }

    /// Check the session once. Later calls return the current user.
    pub async fn init(&self) -> Option<User> {
        if self.init_started.swap(true, Ordering::SeqCst) {
            return self.user();
        }
        match self.backend.current_user().await {
            Ok(user) => {
                tracing::info!(username = %user.username, "session restored");
                self.set_user(Some(user));
            }
            Err(err) => {
                tracing::debug!(error = %err, "no active session");
                self.set_user(None);
            }
        }
        self.user()
    }

    /// Whether the first session check is still pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read().phase == Phase::Loading
    }

    /// Log in. Never fails; errors come back as text.
    pub async fn login(&self, credentials: &Credentials) -> LoginOutcome {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return LoginOutcome::failed(MISSING_CREDENTIALS_ERROR);
        }

        let result: ApiResult<User> = async {
            let _ = self.backend.fetch_csrf_token().await?;
            self.backend.login(credentials).await?;
            self.backend.current_user().await
        }
        .await;

        match result {
            Ok(user) => {
                tracing::info!(username = %user.username, "login succeeded");
                self.set_user(Some(user));
                LoginOutcome::ok()
            }
            Err(err) => {
                tracing::warn!(username = %credentials.username, error = %err, "login failed");
                LoginOutcome::failed(login_error_message(&err))
            }
        }
    }

    /// Create an account and log into it.
    pub async fn register(&self, registration: &Registration) -> LoginOutcome {
        if registration.username.trim().is_empty() || registration.password1.is_empty() {
            return LoginOutcome::failed(MISSING_CREDENTIALS_ERROR);
        }
        if registration.password1 != registration.password2 {
            return LoginOutcome::failed(PASSWORD_MISMATCH_ERROR);
        }

        let result: ApiResult<User> = async {
            let _ = self.backend.register(registration).await?;
            self.backend.current_user().await
        }
        .await;

        match result {
            Ok(user) => {
                tracing::info!(username = %user.username, "registration succeeded");
                self.set_user(Some(user));
                LoginOutcome::ok()
            }
            Err(err) => {
                tracing::warn!(username = %registration.username, error = %err, "registration failed");
                LoginOutcome::failed(register_error_message(&err))
            }
        }
    }

    /// End the session. Local state is cleared and the login page shown
    /// whether or not the server call succeeds.
    pub async fn logout(&self) {
        if let Err(err) = self.backend.logout().await {
            tracing::error!(error = %err, "logout failed");
        }
        self.set_user(None);
        self.navigator.navigate(LOGIN_PATH);
    }

    /// Drop all state; the context ignores later session updates.
    pub fn teardown(&self) {
        let mut state = self.write();
        state.user = None;
        state.phase = Phase::TornDown;
        tracing::debug!("auth context torn down");
    }

    /// Current user.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().user.is_some()
    }

    /// Whether the user is staff or superuser.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        permissions::check_admin_access(self.read().user.as_ref())
    }

    /// Whether the user may edit robot PDFs.
    #[must_use]
    pub fn can_edit_pdf(&self) -> bool {
        permissions::can_edit_pdf(self.read().user.as_ref())
    }

    /// Whether the user may see brand management.
    #[must_use]
    pub fn can_view_brand_management(&self) -> bool {
        permissions::can_view_brand_management(self.read().user.as_ref())
    }

    /// Whether the user may edit brands.
    #[must_use]
    pub fn can_edit_brand_management(&self) -> bool {
        permissions::can_edit_brand_management(self.read().user.as_ref())
    }

    /// Permission snapshot for the current user.
    #[must_use]
    pub fn permissions(&self) -> Permissions {
        Permissions::for_user(self.read().user.as_ref())
    }
}

/// User-facing text for a failed login.
#[must_use]
pub fn login_error_message(err: &ApiError) -> String {
    let mentions_csrf = matches!(err, ApiError::CsrfMissing)
        || err.to_string().contains("CSRF")
        || err.server_message().is_some_and(|m| m.contains("CSRF"));
    if mentions_csrf {
        return CSRF_ERROR.to_string();
    }

    let body = err.body();
    let first_non_field = body
        .and_then(|b| b.get("non_field_errors"))
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str);
    let detail = body.and_then(|b| b.get("detail")).and_then(Value::as_str);

    first_non_field
        .or(detail)
        .unwrap_or(LOGIN_FALLBACK_ERROR)
        .to_string()
}

/// User-facing text for a failed registration.
#[must_use]
pub fn register_error_message(err: &ApiError) -> String {
    let Some(body) = err.body() else {
        return REGISTER_FALLBACK_ERROR.to_string();
    };
    let errors = body
        .get("non_field_errors")
        .or_else(|| body.get("password1"))
        .and_then(Value::as_array);
    match errors {
        Some(errors) => errors
            .iter()
            .filter_map(Value::as_str)
            .map(translate_password_error)
            .collect::<Vec<_>>()
            .join("\n"),
        None => body.to_string(),
    }
}

fn translate_password_error(message: &str) -> String {
    let translated = if message.contains("too similar to the username") {
        "Şifre kullanıcı adına çok benzer. Daha farklı bir şifre seçin."
    } else if message.contains("too short") {
        "Şifre çok kısa. En az 8 karakter olmalı."
    } else if message.contains("too common") {
        "Bu şifre çok yaygın. Daha güvenli bir şifre seçin."
    } else if message.contains("entirely numeric") {
        "Şifre sadece sayılardan oluşamaz."
    } else {
        message
    };
    translated.to_string()
}
