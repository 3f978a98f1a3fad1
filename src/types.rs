//! Wire data model for the catalog API.
//!
//! Field names follow the server's JSON exactly (`_id`, `rol`, `createdAt`),
//! mapped to Rust names through serde renames. The server is the source of
//! truth for every record; these types are client-side snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. Closed set: an unrecognized wire value is a decode error,
/// never a silent fall-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "superadmin" | "super-admin" | "super_admin" => Some(Self::Superadmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    /// Roles allowed into the administrative surface.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "rol")]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    /// Category id this post is filed under.
    pub category: String,
}

/// List-page metadata, taken verbatim from each list response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub pages: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total: 0,
            page: 1,
            pages: 1,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial profile update; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostRequest {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub price: f64,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub rol: Role,
}

/// `POST /auth/login` and `POST /auth/register` both answer with this
/// (plus a message field the client has no use for).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

/// The admin users list reuses the `posts` key for its user array.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPage {
    #[serde(rename = "posts")]
    pub users: Vec<User>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for (s, role) in [
            ("user", Role::User),
            ("admin", Role::Admin),
            ("superadmin", Role::Superadmin),
        ] {
            assert_eq!(Role::from_str(s), Some(role));
            assert_eq!(role.as_str(), s);
        }
        assert_eq!(Role::from_str("root"), None);
    }

    #[test]
    fn test_role_wire_format() {
        let role: Role = serde_json::from_str("\"superadmin\"").unwrap();
        assert_eq!(role, Role::Superadmin);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_unknown_role_is_a_decode_error() {
        let raw = r#"{"_id":"u1","email":"a@b.co","name":"A","rol":"owner"}"#;
        assert!(serde_json::from_str::<User>(raw).is_err());
    }

    #[test]
    fn test_user_wire_renames() {
        let raw = r#"{"_id":"u1","email":"a@b.co","name":"Ana","rol":"user"}"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.role, Role::User);

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["_id"], "u1");
        assert_eq!(back["rol"], "user");
    }

    #[test]
    fn test_user_page_reuses_posts_key() {
        let raw = r#"{
            "posts": [{"_id":"u1","email":"a@b.co","name":"Ana","rol":"admin"}],
            "pagination": {"total":1,"page":1,"pages":1,"limit":10}
        }"#;
        let page: UserPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.pagination.total, 1);
    }

    #[test]
    fn test_edit_profile_skips_absent_fields() {
        let req = EditProfileRequest {
            name: Some("Ana".to_string()),
            email: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, serde_json::json!({"name": "Ana"}));
    }

    #[test]
    fn test_change_password_is_camel_case() {
        let req = ChangePasswordRequest {
            current_password: "old".to_string(),
            new_password: "new".to_string(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("currentPassword").is_some());
        assert!(value.get("newPassword").is_some());
    }
}
