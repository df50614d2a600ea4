//! Profile and brand administration endpoints.

use std::collections::BTreeMap;

use reqwest::Method;
use reqwest::multipart::Form;

use super::client::ApiClient;
use super::endpoints;
use super::error::ApiResult;
use super::models::{Brand, Profile};

/// Form fields for creating or updating a profile.
///
/// Cleared values are sent as an empty string on create and as `none` on
/// update, which the backend reads as "clear this field". On create a
/// literal `none` is also sent empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileFields(BTreeMap<String, Option<String>>);

impl ProfileFields {
    /// Empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), Some(value.into()));
        self
    }

    /// Mark a field as cleared.
    #[must_use]
    pub fn unset(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), None);
        self
    }

    fn pairs(&self, missing: &str) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(name, value)| {
                let value = match value.as_deref() {
                    None => missing.to_string(),
                    Some("none") if missing.is_empty() => String::new(),
                    Some(text) => text.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }

    fn into_form(self, missing: &str) -> Form {
        self.pairs(missing)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
    }
}

impl ApiClient {
    /// All profiles visible to the session.
    pub async fn list_profiles(&self) -> ApiResult<Vec<Profile>> {
        self.get_json(endpoints::PROFILES, &[]).await
    }

    /// One profile.
    pub async fn profile(&self, id: u64) -> ApiResult<Profile> {
        self.get_json(&endpoints::profile(id), &[]).await
    }

    /// Create a profile.
    pub async fn create_profile(&self, fields: ProfileFields) -> ApiResult<Profile> {
        self.send_multipart(Method::POST, endpoints::PROFILES, fields.into_form(""))
            .await
    }

    /// Update a profile.
    pub async fn update_profile(&self, id: u64, fields: ProfileFields) -> ApiResult<Profile> {
        self.send_multipart(Method::PATCH, &endpoints::profile(id), fields.into_form("none"))
            .await
    }

    /// Delete a profile.
    pub async fn delete_profile(&self, id: u64) -> ApiResult<()> {
        self.send_empty(Method::DELETE, &endpoints::profile(id)).await
    }

    /// Flip a profile's active flag.
    pub async fn toggle_profile_active(&self, id: u64) -> ApiResult<serde_json::Value> {
        let form = Form::new().text("toggle_active", "true");
        self.send_multipart(Method::POST, &endpoints::profile_toggle_active(id), form)
            .await
    }

    /// All brands.
    pub async fn list_brands(&self) -> ApiResult<Vec<Brand>> {
        self.get_json(endpoints::BRANDS, &[]).await
    }

    /// One brand.
    pub async fn brand(&self, id: u64) -> ApiResult<Brand> {
        self.get_json(&endpoints::brand(id), &[]).await
    }

    /// Patch a brand with arbitrary fields.
    pub async fn update_brand(&self, id: u64, patch: &serde_json::Value) -> ApiResult<Brand> {
        self.send_json(Method::PATCH, &endpoints::brand(id), patch)
            .await
    }
}
