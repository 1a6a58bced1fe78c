//! Account roles and admin permissions.

use serde::{Deserialize, Serialize};

/// A string did not name any known value of an enumerated type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownValueError {
    /// The type being parsed (e.g. `role`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// The four mutually exclusive account roles.
///
/// The role is the discriminant of a user profile: it decides which
/// role-specific fields exist on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A customer ordering food.
    #[default]
    Client,
    /// A restaurant partner.
    Restaurant,
    /// A delivery courier.
    Courier,
    /// Platform staff.
    Admin,
}

impl Role {
    /// Every role, in display order.
    pub const ALL: [Self; 4] = [Self::Client, Self::Restaurant, Self::Courier, Self::Admin];

    /// Resolve a stored role tag, falling back to [`Role::Client`] for a
    /// missing or unrecognized tag.
    ///
    /// ```
    /// use amber_eats_core::Role;
    ///
    /// assert_eq!(Role::from_tag(Some("courier")), Role::Courier);
    /// assert_eq!(Role::from_tag(Some("Courier ")), Role::Courier);
    /// assert_eq!(Role::from_tag(Some("superuser")), Role::Client);
    /// assert_eq!(Role::from_tag(None), Role::Client);
    /// ```
    #[must_use]
    pub fn from_tag(tag: Option<&str>) -> Self {
        tag.and_then(|t| t.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or_default()
    }

    /// The wire tag for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Restaurant => "restaurant",
            Self::Courier => "courier",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "restaurant" => Ok(Self::Restaurant),
            "courier" => Ok(Self::Courier),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownValueError::new("role", s)),
        }
    }
}

/// Capabilities granted to an admin profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPermission {
    ManageUsers,
    ManageRestaurants,
    ManageCouriers,
    ManageOrders,
    ManagePayouts,
    ViewAnalytics,
}

impl AdminPermission {
    /// Every permission; granted to the demo admin.
    pub const ALL: [Self; 6] = [
        Self::ManageUsers,
        Self::ManageRestaurants,
        Self::ManageCouriers,
        Self::ManageOrders,
        Self::ManagePayouts,
        Self::ViewAnalytics,
    ];

    /// The wire tag for this permission.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageRestaurants => "manage_restaurants",
            Self::ManageCouriers => "manage_couriers",
            Self::ManageOrders => "manage_orders",
            Self::ManagePayouts => "manage_payouts",
            Self::ViewAnalytics => "view_analytics",
        }
    }
}

impl std::fmt::Display for AdminPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminPermission {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownValueError::new("admin permission", s))
    }
}
