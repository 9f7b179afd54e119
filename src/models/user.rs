//! User model, roles and badges.

use serde::{Deserialize, Serialize};

use super::{strip_reserved, Extra};

/// Roles a user can hold. Users without a role are regular members.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role. Unknown strings grant nothing.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Cosmetic status granted after a payment lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Badge {
    Gold,
}

impl Badge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Badge::Gold => "Gold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Gold" => Some(Badge::Gold),
            _ => None,
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_badge: Option<Badge>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl User {
    /// Single authorization check for role-gated operations.
    pub fn has_role(&self, required: Role) -> bool {
        self.role == Some(required)
    }
}

/// Request body for registering a user.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl RegisterUserRequest {
    /// Profile fields to persist. Role and badge can never be self-assigned.
    pub fn sanitized_extra(&self) -> Extra {
        let mut extra = self.extra.clone();
        strip_reserved(&mut extra, &["_id", "role", "userBadge"]);
        extra
    }
}
