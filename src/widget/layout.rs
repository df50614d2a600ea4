//! Widget sizing for the host iframe.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::protocol::{ResizeAction, ResizeRequest};

/// Smallest touch target, in pixels.
pub const MIN_TOUCH_SIZE: u32 = 44;

static MOBILE_UA: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini").ok()
});

/// Rough device class used for sizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Phones and tablets.
    Mobile,
    /// Everything else.
    #[default]
    Desktop,
}

impl DeviceClass {
    /// Classify a user agent string.
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        let mobile = MOBILE_UA
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(user_agent));
        if mobile { Self::Mobile } else { Self::Desktop }
    }
}

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSize {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl WidgetSize {
    /// New size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Size table for collapsed and expanded states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeTable {
    /// Collapsed button on mobile.
    pub mobile: WidgetSize,
    /// Collapsed button on desktop.
    pub desktop: WidgetSize,
    /// Open panel on desktop. Mobile panels fill the viewport.
    pub expanded: WidgetSize,
}

impl Default for SizeTable {
    fn default() -> Self {
        Self {
            mobile: WidgetSize::new(50, 50),
            desktop: WidgetSize::new(60, 60),
            expanded: WidgetSize::new(400, 600),
        }
    }
}

impl SizeTable {
    /// Size for a device class and panel state. `viewport` is used for the
    /// open panel on mobile.
    #[must_use]
    pub const fn size_for(
        &self,
        device: DeviceClass,
        expanded: bool,
        viewport: WidgetSize,
    ) -> WidgetSize {
        match (device, expanded) {
            (DeviceClass::Mobile, true) => viewport,
            (DeviceClass::Desktop, true) => self.expanded,
            (DeviceClass::Mobile, false) => self.mobile,
            (DeviceClass::Desktop, false) => self.desktop,
        }
    }

    /// Resize message for a panel state.
    #[must_use]
    pub fn resize_request(
        &self,
        action: ResizeAction,
        device: DeviceClass,
        viewport: WidgetSize,
    ) -> ResizeRequest {
        let expanded = action == ResizeAction::Expand;
        let size = self.size_for(device, expanded, viewport);
        ResizeRequest {
            action,
            width: ensure_touch_friendly(size.width),
            height: ensure_touch_friendly(size.height),
        }
    }
}

/// Clamp a dimension to the touch minimum.
#[must_use]
pub fn ensure_touch_friendly(size: u32) -> u32 {
    size.max(MIN_TOUCH_SIZE)
}

/// Stacking priority of the widget iframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZPriority {
    /// Below most overlays.
    Low,
    /// Above ordinary page content.
    #[default]
    Medium,
    /// Above everything.
    High,
}

impl ZPriority {
    /// CSS z-index.
    #[must_use]
    pub const fn z_index(self) -> u32 {
        match self {
            Self::Low => 9_999,
            Self::Medium => 99_999,
            Self::High => 999_999,
        }
    }
}
