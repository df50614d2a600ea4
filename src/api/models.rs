//! Wire types exchanged with the robots backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The authenticated user as returned by `/rest-auth/user/`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: u64,
    /// Login name.
    pub username: String,
    /// E-mail address.
    #[serde(default)]
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Django staff flag.
    #[serde(default)]
    pub is_staff: bool,
    /// Django superuser flag.
    #[serde(default)]
    pub is_superuser: bool,
    /// Whether the account is enabled.
    #[serde(default)]
    pub is_active: bool,
    /// Brand the user belongs to.
    #[serde(default)]
    pub brand_id: Option<u64>,
    /// Display name of that brand.
    #[serde(default)]
    pub brand_name: Option<String>,
    /// Package of that brand (`normal`, `pro`, `premium`).
    #[serde(default)]
    pub brand_package_type: Option<String>,
}

impl User {
    /// Staff or superuser.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    /// Whether the user is attached to a brand.
    #[must_use]
    pub const fn has_brand(&self) -> bool {
        self.brand_id.is_some()
    }

    /// Whether the brand package unlocks PDF editing.
    #[must_use]
    pub fn has_pro_package(&self) -> bool {
        matches!(
            self.brand_package_type.as_deref(),
            Some("pro" | "premium")
        )
    }
}

/// Role a robot PDF plays in retrieval.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfType {
    /// Product information.
    #[default]
    Bilgi,
    /// Behaviour rules.
    Kural,
    /// Persona definition.
    Rol,
    /// Legal declarations.
    Beyan,
}

impl PdfType {
    /// Stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bilgi => "bilgi",
            Self::Kural => "kural",
            Self::Rol => "rol",
            Self::Beyan => "beyan",
        }
    }
}

impl fmt::Display for PdfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PdfType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bilgi" => Ok(Self::Bilgi),
            "kural" => Ok(Self::Kural),
            "rol" => Ok(Self::Rol),
            "beyan" => Ok(Self::Beyan),
            _ => Err(value.to_string()),
        }
    }
}

/// Document chunk that supported a reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Source file name.
    pub source: String,
    /// Excerpt, truncated by the backend.
    #[serde(default)]
    pub content: String,
    /// Similarity score in `[0, 1]`.
    #[serde(default)]
    pub similarity: f32,
    /// Chunk position inside the source.
    #[serde(default)]
    pub chunk_index: u32,
    /// Role of the source document.
    #[serde(default)]
    pub pdf_type: Option<PdfType>,
}

/// Body of `POST /robots/{slug}/chat/`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User text.
    pub message: String,
    /// Conversation the message belongs to.
    pub conversation_id: String,
}

/// Reply of the chat endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant text.
    #[serde(default, alias = "message")]
    pub robot_response: Option<String>,
    /// Supporting citations.
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Whether retrieved context was used.
    #[serde(default)]
    pub context_used: bool,
    /// Error reported inside a 200 body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    /// Successful reply with plain text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            robot_response: Some(text.into()),
            ..Self::default()
        }
    }

    /// Reply text if present and non-blank.
    #[must_use]
    pub fn reply_text(&self) -> Option<&str> {
        self.robot_response
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// A robot persona record.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    /// Primary key.
    pub id: u64,
    /// Robot name.
    pub name: String,
    /// Product the robot represents.
    #[serde(default)]
    pub product_name: String,
    /// Owning brand.
    #[serde(default)]
    pub brand_id: Option<u64>,
    /// Owning brand name.
    #[serde(default)]
    pub brand_name: Option<String>,
    /// URL slug used by the chat endpoint.
    #[serde(default)]
    pub slug: Option<String>,
    /// Number of PDFs attached.
    #[serde(default, rename = "pdf_sayisi")]
    pub pdf_count: Option<u32>,
    /// Number of active PDFs attached.
    #[serde(default, rename = "aktif_pdf_sayisi")]
    pub active_pdf_count: Option<u32>,
}

/// A PDF attached to a robot.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RobotPdf {
    /// Primary key.
    pub id: u64,
    /// Owning robot.
    #[serde(default)]
    pub robot: Option<u64>,
    /// Display file name.
    #[serde(default, rename = "dosya_adi")]
    pub file_name: String,
    /// Free-text description.
    #[serde(default, rename = "aciklama")]
    pub description: Option<String>,
    /// Whether retrieval uses it.
    #[serde(default)]
    pub is_active: bool,
    /// Role in retrieval.
    #[serde(default)]
    pub pdf_type: PdfType,
    /// Download URL.
    #[serde(default, rename = "pdf_dosyasi")]
    pub file_url: Option<String>,
    /// Size in bytes.
    #[serde(default, rename = "dosya_boyutu")]
    pub file_size: Option<u64>,
    /// Upload timestamp as sent by the server.
    #[serde(default, rename = "yukleme_zamani")]
    pub uploaded_at: Option<String>,
}

/// New PDF for `POST /robot-pdfs/`.
#[derive(Clone, Debug)]
pub struct PdfUpload {
    /// Robot receiving the PDF.
    pub robot_id: u64,
    /// File name sent with the part.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// Role in retrieval.
    pub pdf_type: PdfType,
    /// Optional description.
    pub description: Option<String>,
}

/// Partial update for `PUT /robot-pdfs/{id}/`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PdfUpdate {
    /// New role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_type: Option<PdfType>,
    /// New active flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none", rename = "aciklama")]
    pub description: Option<String>,
}

/// A brand record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    /// Primary key.
    pub id: u64,
    /// Brand name.
    pub name: String,
    /// Package (`normal`, `pro`, `premium`).
    #[serde(default, rename = "paket_turu")]
    pub package_type: Option<String>,
    /// Requests consumed.
    #[serde(default)]
    pub total_api_requests: Option<u64>,
    /// Request allowance.
    #[serde(default)]
    pub request_limit: Option<u64>,
    /// Fields this client does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A user profile record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Primary key.
    pub id: u64,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// E-mail address.
    #[serde(default)]
    pub email: Option<String>,
    /// Short biography.
    #[serde(default)]
    pub bio: Option<String>,
    /// Brand id.
    #[serde(default)]
    pub brand_id: Option<u64>,
    /// Brand name.
    #[serde(default)]
    pub brand_name: Option<String>,
    /// Brand package.
    #[serde(default)]
    pub brand_package_type: Option<String>,
    /// Staff flag.
    #[serde(default)]
    pub is_staff: bool,
    /// Superuser flag.
    #[serde(default)]
    pub is_superuser: bool,
    /// Active flag.
    #[serde(default)]
    pub is_active: bool,
    /// Fields this client does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Custom opening messages of a robot.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RobotMessages {
    /// Messages in display order.
    pub messages: Vec<String>,
}

/// Login credentials.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Build credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form for `/rest-auth/registration/`.
#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct Registration {
    /// Login name.
    pub username: String,
    /// E-mail address.
    pub email: String,
    /// Password.
    pub password1: String,
    /// Password confirmation.
    pub password2: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
