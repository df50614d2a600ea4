//! Endpoint paths, relative to the API base URL.

use super::models::PdfType;

/// Sets the `csrftoken` cookie.
pub const CSRF: &str = "/csrf/";
/// Session login.
pub const LOGIN: &str = "/rest-auth/login/";
/// Account registration.
pub const REGISTER: &str = "/rest-auth/registration/";
/// Session logout.
pub const LOGOUT: &str = "/rest-auth/logout/";
/// Current user.
pub const CURRENT_USER: &str = "/rest-auth/user/";

/// Profile collection.
pub const PROFILES: &str = "/profile/profilleri/";
/// Robot collection.
pub const ROBOTS: &str = "/robots/";
/// Robot PDF collection.
pub const ROBOT_PDFS: &str = "/robot-pdfs/";
/// Brand collection.
pub const BRANDS: &str = "/brands/";

/// A single profile.
#[must_use]
pub fn profile(id: u64) -> String {
    format!("{PROFILES}{id}/")
}

/// Flip a profile's active flag.
#[must_use]
pub fn profile_toggle_active(id: u64) -> String {
    format!("{PROFILES}{id}/toggle_active/")
}

/// A single robot by id.
#[must_use]
pub fn robot(id: u64) -> String {
    format!("{ROBOTS}{id}/")
}

/// A single robot by slug.
#[must_use]
pub fn robot_by_slug(slug: &str) -> String {
    format!("{ROBOTS}{slug}/")
}

/// All PDFs of a robot.
#[must_use]
pub fn robot_pdfs(robot_id: u64) -> String {
    format!("{ROBOTS}{robot_id}/pdf_dosyalari/")
}

/// Active PDFs of a robot.
#[must_use]
pub fn robot_active_pdfs(robot_id: u64) -> String {
    format!("{ROBOTS}{robot_id}/aktif_pdf_dosyalari/")
}

/// Custom opening messages of a robot.
#[must_use]
pub fn robot_messages(robot_id: u64) -> String {
    format!("{ROBOTS}{robot_id}/messages/")
}

/// Chat endpoint of a robot.
#[must_use]
pub fn chat(slug: &str) -> String {
    format!("{ROBOTS}{slug}/chat/")
}

/// A single robot PDF.
#[must_use]
pub fn robot_pdf(id: u64) -> String {
    format!("{ROBOT_PDFS}{id}/")
}

/// Flip a robot PDF's active flag.
#[must_use]
pub fn robot_pdf_toggle_active(id: u64) -> String {
    format!("{ROBOT_PDFS}{id}/toggle_active/")
}

/// A single brand.
#[must_use]
pub fn brand(id: u64) -> String {
    format!("{BRANDS}{id}/")
}

/// Filter for the robot PDF listing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PdfListFilter {
    /// Only PDFs of this robot.
    pub robot_id: Option<u64>,
    /// Only active or inactive PDFs.
    pub is_active: Option<bool>,
    /// Only PDFs of this role.
    pub pdf_type: Option<PdfType>,
}

impl PdfListFilter {
    /// Filter by robot.
    #[must_use]
    pub const fn for_robot(robot_id: u64) -> Self {
        Self {
            robot_id: Some(robot_id),
            is_active: None,
            pdf_type: None,
        }
    }

    /// Restrict to active PDFs.
    #[must_use]
    pub const fn active_only(mut self) -> Self {
        self.is_active = Some(true);
        self
    }

    /// Restrict to one role.
    #[must_use]
    pub const fn with_type(mut self, pdf_type: PdfType) -> Self {
        self.pdf_type = Some(pdf_type);
        self
    }

    /// Query pairs for the set fields.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(robot_id) = self.robot_id {
            pairs.push(("robot_id", robot_id.to_string()));
        }
        if let Some(active) = self.is_active {
            pairs.push(("is_active", active.to_string()));
        }
        if let Some(pdf_type) = self.pdf_type {
            pairs.push(("pdf_type", pdf_type.as_str().to_string()));
        }
        pairs
    }
}
