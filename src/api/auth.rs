//! Session authentication endpoints.

use reqwest::Method;
use reqwest::multipart::Form;

use super::client::ApiClient;
use super::endpoints;
use super::error::ApiResult;
use super::models::{Credentials, Registration, User};

impl ApiClient {
    /// Ask the server to set the CSRF cookie and return the token.
    pub async fn fetch_csrf_token(&self) -> ApiResult<Option<String>> {
        let _: serde_json::Value = self.get_fresh(endpoints::CSRF).await?;
        Ok(self.csrf_token())
    }

    /// Fetch a CSRF token only if the jar has none.
    pub async fn ensure_csrf_token(&self) -> ApiResult<Option<String>> {
        if let Some(token) = self.csrf_token() {
            return Ok(Some(token));
        }
        self.fetch_csrf_token().await
    }

    /// Log in with a multipart form; the session cookie lands in the jar.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<()> {
        self.ensure_csrf_token().await?;
        let form = Form::new()
            .text("username", credentials.username.clone())
            .text("password", credentials.password.clone());
        let _: serde_json::Value = self
            .send_multipart(Method::POST, endpoints::LOGIN, form)
            .await?;
        tracing::info!(username = %credentials.username, "logged in");
        Ok(())
    }

    /// End the server session.
    pub async fn logout(&self) -> ApiResult<()> {
        let result: ApiResult<serde_json::Value> =
            self.send_empty(Method::POST, endpoints::LOGOUT).await;
        self.clear_cache();
        result.map(|_| ())
    }

    /// The user owning the current session.
    pub async fn current_user(&self) -> ApiResult<User> {
        self.get_fresh(endpoints::CURRENT_USER).await
    }

    /// Create an account with a urlencoded form.
    pub async fn register(&self, registration: &Registration) -> ApiResult<serde_json::Value> {
        self.ensure_csrf_token().await?;
        self.send_form(Method::POST, endpoints::REGISTER, registration)
            .await
    }
}
