//! Permission snapshot derived from the current user.

use serde::{Deserialize, Serialize};

use crate::api::models::User;

/// Shown to branded users whose package does not allow PDF editing.
pub const PACKAGE_TOO_LOW_WARNING: &str = "Markanızın paketi PDF düzenleme için yeterli değil";
/// Shown to users without a brand.
pub const NO_BRAND_WARNING: &str = "Marka ile bir bağınız bulunmamaktadır";

/// Coarse user category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Staff or superuser.
    Admin,
    /// Brand member on a pro or premium package.
    BrandedPro,
    /// Brand member on another package.
    BrandedNormal,
    /// No brand, or nobody logged in.
    Unbranded,
}

impl UserType {
    /// Category of `user`.
    #[must_use]
    pub fn of(user: Option<&User>) -> Self {
        match user {
            Some(user) if user.is_admin() => Self::Admin,
            Some(user) if user.has_brand() && user.has_pro_package() => Self::BrandedPro,
            Some(user) if user.has_brand() => Self::BrandedNormal,
            _ => Self::Unbranded,
        }
    }
}

/// What the user may do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Use chat widgets.
    pub can_chat: bool,
    /// See robots.
    pub can_view_robots: bool,
    /// Upload or edit robot PDFs.
    pub can_edit_pdf: bool,
    /// See brand management.
    pub can_view_brands: bool,
    /// Edit brands.
    pub can_edit_brands: bool,
    /// Reach the admin area.
    pub can_access_admin: bool,
    /// Category.
    pub user_type: UserType,
    /// Why something is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_message: Option<String>,
}

impl Permissions {
    /// Snapshot for `user`.
    #[must_use]
    pub fn for_user(user: Option<&User>) -> Self {
        let user_type = UserType::of(user);
        let (can_edit_pdf, can_view_brands, warning_message) = match user_type {
            UserType::Admin | UserType::BrandedPro => (true, true, None),
            UserType::BrandedNormal => (false, true, Some(PACKAGE_TOO_LOW_WARNING)),
            UserType::Unbranded => (false, false, Some(NO_BRAND_WARNING)),
        };
        let admin = user_type == UserType::Admin;
        Self {
            can_chat: true,
            can_view_robots: true,
            can_edit_pdf,
            can_view_brands,
            can_edit_brands: admin,
            can_access_admin: admin,
            user_type,
            warning_message: warning_message.map(str::to_string),
        }
    }
}

/// Staff or superuser.
#[must_use]
pub fn check_admin_access(user: Option<&User>) -> bool {
    user.is_some_and(User::is_admin)
}

/// Admins, and brand members on a pro or premium package.
#[must_use]
pub fn can_edit_pdf(user: Option<&User>) -> bool {
    match user {
        Some(user) if user.is_admin() => true,
        Some(user) => user.has_brand() && user.has_pro_package(),
        None => false,
    }
}

/// Admins and brand members.
#[must_use]
pub fn can_view_brand_management(user: Option<&User>) -> bool {
    user.is_some_and(|user| user.is_admin() || user.has_brand())
}

/// Admins only.
#[must_use]
pub fn can_edit_brand_management(user: Option<&User>) -> bool {
    check_admin_access(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(staff: bool, brand: Option<u64>, package: Option<&str>) -> User {
        User {
            id: 1,
            username: "kullanici".to_string(),
            is_staff: staff,
            is_active: true,
            brand_id: brand,
            brand_name: brand.map(|_| "Sidrex".to_string()),
            brand_package_type: package.map(str::to_string),
            ..User::default()
        }
    }

    #[test]
    fn unbranded_user_is_stable() {
        let plain = user(false, None, None);
        let first = Permissions::for_user(Some(&plain));
        let second = Permissions::for_user(Some(&plain));
        assert_eq!(first, second);
        assert_eq!(first.user_type, UserType::Unbranded);
        assert!(!first.can_edit_pdf);
        assert!(!first.can_view_brands);
        assert!(first.can_chat && first.can_view_robots);
        assert_eq!(first.warning_message.as_deref(), Some(NO_BRAND_WARNING));
    }

    #[test]
    fn admin_gets_everything() {
        let mut admin = user(false, None, None);
        admin.is_superuser = true;
        let perms = Permissions::for_user(Some(&admin));
        assert_eq!(perms.user_type, UserType::Admin);
        assert!(perms.can_edit_pdf && perms.can_edit_brands && perms.can_access_admin);
        assert!(perms.warning_message.is_none());
        assert!(check_admin_access(Some(&admin)));
    }

    #[test]
    fn branded_packages() {
        let pro = Permissions::for_user(Some(&user(false, Some(3), Some("premium"))));
        assert_eq!(pro.user_type, UserType::BrandedPro);
        assert!(pro.can_edit_pdf);
        assert!(!pro.can_edit_brands);
        assert!(!pro.can_access_admin);

        let normal = Permissions::for_user(Some(&user(false, Some(3), Some("normal"))));
        assert_eq!(normal.user_type, UserType::BrandedNormal);
        assert!(!normal.can_edit_pdf);
        assert!(normal.can_view_brands);
        assert_eq!(normal.warning_message.as_deref(), Some(PACKAGE_TOO_LOW_WARNING));
    }

    #[test]
    fn package_without_brand_does_not_count() {
        let stray = user(false, None, Some("pro"));
        assert_eq!(UserType::of(Some(&stray)), UserType::Unbranded);
        assert!(!can_edit_pdf(Some(&stray)));
    }

    #[test]
    fn anonymous_predicates() {
        assert!(!check_admin_access(None));
        assert!(!can_edit_pdf(None));
        assert!(!can_view_brand_management(None));
        assert!(!can_edit_brand_management(None));
        assert_eq!(Permissions::for_user(None).user_type, UserType::Unbranded);
    }

    #[test]
    fn user_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(UserType::BrandedPro).unwrap(),
            serde_json::json!("branded_pro")
        );
    }
}
