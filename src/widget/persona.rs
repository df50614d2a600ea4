//! Robot personas: slug, display name, greetings and accent colour.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Second greeting every persona shows.
pub const HELP_PROMPT: &str = "Size nasıl yardımcı olabilirim?";

const MAX_SLUG_LEN: usize = 64;

/// Invalid robot slug.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    /// Empty input.
    #[error("robot slug is empty")]
    Empty,
    /// Longer than the allowed length.
    #[error("robot slug is longer than 64 characters")]
    TooLong,
    /// Contains something other than `a-z`, `0-9` or `-`.
    #[error("robot slug contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Identifier selecting the backend persona and chat endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RobotSlug(String);

impl RobotSlug {
    /// Validate a slug.
    ///
    /// # Errors
    /// Returns an error if the slug is empty, too long, or not `[a-z0-9-]+`.
    pub fn new(slug: impl Into<String>) -> Result<Self, SlugError> {
        let slug = slug.into();
        if slug.is_empty() {
            return Err(SlugError::Empty);
        }
        if slug.len() > MAX_SLUG_LEN {
            return Err(SlugError::TooLong);
        }
        if let Some(bad) = slug
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(SlugError::InvalidChar(bad));
        }
        Ok(Self(slug))
    }

    /// Slug text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RobotSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RobotSlug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RobotSlug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RobotSlug> for String {
    fn from(slug: RobotSlug) -> Self {
        slug.0
    }
}

/// Everything that distinguishes one robot widget from another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotPersona {
    /// Backend identifier.
    pub slug: RobotSlug,
    /// Display name.
    pub name: String,
    /// Assistant messages shown when a session starts.
    pub greetings: Vec<String>,
    /// Short teaser lines shown next to the collapsed button.
    #[serde(default)]
    pub bubble_messages: Vec<String>,
    /// Accent colour, `#rrggbb`.
    pub accent_color: String,
}

impl RobotPersona {
    /// Persona with the standard two greetings.
    #[must_use]
    pub fn new(slug: RobotSlug, name: impl Into<String>, intro: impl Into<String>) -> Self {
        Self {
            slug,
            name: name.into(),
            greetings: vec![intro.into(), HELP_PROMPT.to_string()],
            bubble_messages: Vec::new(),
            accent_color: "#3592E5".to_string(),
        }
    }

    /// Set the accent colour.
    #[must_use]
    pub fn with_accent(mut self, color: impl Into<String>) -> Self {
        self.accent_color = color.into();
        self
    }

    /// Set the teaser lines.
    #[must_use]
    pub fn with_bubble_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bubble_messages = messages.into_iter().map(Into::into).collect();
        self
    }

    /// Default conversation id for this robot.
    #[must_use]
    pub fn conversation_id(&self) -> String {
        format!("robot_{}", self.slug)
    }
}

/// Built-in personas.
pub mod presets {
    use super::{RobotPersona, RobotSlug};

    fn persona(slug: &'static str, name: &str, intro: &str, accent: &str) -> RobotPersona {
        // Preset slugs are literals that satisfy the slug rules.
        let slug = RobotSlug(slug.to_string());
        RobotPersona::new(slug, name, intro).with_accent(accent)
    }

    /// Brand-wide assistant.
    #[must_use]
    pub fn ana_robot() -> RobotPersona {
        persona(
            "ana-robot",
            "SidrexGPT",
            "Merhaba, ben **SidrexGPT**. **Sidrex** markasının sizler için geliştirdiği özel bir **yapay zekâ** asistanıyım.",
            "#1D4ED8",
        )
    }

    /// Magnesium product assistant.
    #[must_use]
    pub fn sidrexgpt_mag() -> RobotPersona {
        persona(
            "sidrexgpt-mag",
            "Yorgun SidrexGPT",
            "Merhaba, ben **yorgun** **SidrexGPT**. Kaslarımı destekleyip **enerjimi** geri kazanmamı sağlayan **magnezyum** desteğiyle **yorgunluğu** geride bırakıyorum!",
            "#6D71B6",
        )
    }

    /// Children's immunity product assistant.
    #[must_use]
    pub fn sidrexgpt_kids() -> RobotPersona {
        persona(
            "sidrexgpt-kids",
            "Çocuk SidrexGPT",
            "Merhaba, ben **çocuk SidrexGPT**. Bağışıklığımı güçlendiren desteğimle hasta olma ihtimalimi azaltıyor, kendimi hep koruma altında hissediyorum!",
            "#FFC429",
        )
    }

    /// Sleep product assistant.
    #[must_use]
    pub fn zzen() -> RobotPersona {
        persona(
            "zzen",
            "Zzen SidrexGPT",
            "Merhaba, ben **Zzen SidrexGPT**. **Zzen** ürününün özel asistanıyım!",
            "#3594E7",
        )
        .with_bubble_messages([
            "Zzen sayesinde mutlu bir uykuyu yaşıyorum.",
            "Zzen var, uykular artık daha derin, daha dingin.",
            "Şuanda uyuyorum!!!",
            "Zzen sayesinde huzurlu bir uyku artık benimle.",
        ])
    }

    /// Liver support product assistant.
    #[must_use]
    pub fn milk_thistle() -> RobotPersona {
        persona(
            "milk-thistle",
            "Milk Thistle Complex SidrexGPT",
            "Merhaba, ben **Milk Thistle Complex SidrexGPT**. Karaciğer sağlığınızı desteklemek için **deve dikeni**, **enginar**, **kolin** ve **karahindiba** ekstraktlarıyla güçlendirilmiş formülümle hizmetinizdeyim!",
            "#61C2C5",
        )
    }

    /// Women's health product assistant.
    #[must_use]
    pub fn repro_womens() -> RobotPersona {
        persona(
            "repro-womens",
            "Repro Women's Once Daily SidrexGPT",
            "Merhaba, ben **Repro Women's Once Daily SidrexGPT**. Kadın sağlığınızı desteklemek için **folat**, **demir**, **kalsiyum** ve **D vitamini** ile güçlendirilmiş formülümle **reproduktif sağlığınızı** destekliyorum!",
            "#E78EEB",
        )
    }

    /// Olive leaf product assistant.
    #[must_use]
    pub fn olivia() -> RobotPersona {
        persona(
            "olivia",
            "Olivia SidrexGPT",
            "Merhaba, ben **Olivia SidrexGPT**. **Olivia** ürününün özel asistanıyım!",
            "#FEDD08",
        )
    }

    /// Protection product assistant.
    #[must_use]
    pub fn kalkan() -> RobotPersona {
        persona(
            "kalkan",
            "Kalkan SidrexGPT",
            "Merhaba, ben **Kalkan SidrexGPT**. **Kalkan** ürününün özel asistanıyım! Koruma ve destek konusunda size yardımcı oluyorum!",
            "#9C27B0",
        )
    }

    /// Every built-in persona.
    #[must_use]
    pub fn all() -> Vec<RobotPersona> {
        vec![
            ana_robot(),
            sidrexgpt_mag(),
            sidrexgpt_kids(),
            zzen(),
            milk_thistle(),
            repro_womens(),
            olivia(),
            kalkan(),
        ]
    }

    /// Built-in persona for `slug`.
    #[must_use]
    pub fn by_slug(slug: &str) -> Option<RobotPersona> {
        all().into_iter().find(|persona| persona.slug.as_str() == slug)
    }
}

/// Persona the embed loader shows on a host page, chosen from its URL.
#[must_use]
pub fn select_for_url(url: &str) -> Option<RobotPersona> {
    if url.contains("imuntus-kids") || url.contains("cocuklar-icin") {
        Some(presets::sidrexgpt_kids())
    } else if url.contains("mag4ever") {
        Some(presets::sidrexgpt_mag())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        assert!(RobotSlug::new("sidrexgpt-kids").is_ok());
        assert_eq!(RobotSlug::new(""), Err(SlugError::Empty));
        assert_eq!(RobotSlug::new("Zzen"), Err(SlugError::InvalidChar('Z')));
        assert_eq!(RobotSlug::new("a/b"), Err(SlugError::InvalidChar('/')));
        assert_eq!(RobotSlug::new("a".repeat(65)), Err(SlugError::TooLong));
    }

    #[test]
    fn slug_deserialization_validates() {
        let slug: RobotSlug = serde_json::from_str(r#""olivia""#).unwrap();
        assert_eq!(slug.as_str(), "olivia");
        assert!(serde_json::from_str::<RobotSlug>(r#""../etc""#).is_err());
    }

    #[test]
    fn presets_are_valid_and_unique() {
        let all = presets::all();
        for persona in &all {
            assert!(RobotSlug::new(persona.slug.as_str()).is_ok());
            assert_eq!(persona.greetings.len(), 2);
            assert_eq!(persona.greetings[1], HELP_PROMPT);
        }
        let mut slugs: Vec<&str> = all.iter().map(|p| p.slug.as_str()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), all.len());
    }

    #[test]
    fn conversation_id_defaults_to_slug() {
        assert_eq!(presets::zzen().conversation_id(), "robot_zzen");
    }

    #[test]
    fn url_selection() {
        let kids = select_for_url("https://shop.example/product/imuntus-kids?ref=1").unwrap();
        assert_eq!(kids.slug.as_str(), "sidrexgpt-kids");
        let kids = select_for_url("https://shop.example/cocuklar-icin/").unwrap();
        assert_eq!(kids.slug.as_str(), "sidrexgpt-kids");
        let mag = select_for_url("https://shop.example/product/mag4ever").unwrap();
        assert_eq!(mag.slug.as_str(), "sidrexgpt-mag");
        assert!(select_for_url("https://shop.example/").is_none());
    }

    #[test]
    fn lookup_by_slug() {
        assert_eq!(presets::by_slug("kalkan").unwrap().name, "Kalkan SidrexGPT");
        assert!(presets::by_slug("unknown").is_none());
    }
}
