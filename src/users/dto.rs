use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::policy::Role;
use crate::users::repo::User;

/// Request body for public registration.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub age: Option<i32>,
}

/// Request body for super-admin account creation; role defaults to admin.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Self-service profile patch. Unknown or immutable fields in the body are
/// dropped during deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
}

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub age: Option<i32>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response returned after signup, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub changed: bool,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub changed: bool,
    pub items_deactivated: u64,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `GET /users` query: role filter, name search, pagination.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub items: Vec<PublicUser>,
    pub pagination: crate::pagination::PageMeta,
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn public_user_hides_nothing_it_should_show() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: Role::User,
            age: Some(36),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(json.contains(r#""role":"user""#));
        assert!(!json.contains("password"));
    }

    #[test]
    fn role_deserializes_from_snake_case() {
        let role: Role = serde_json::from_str(r#""super_admin""#).unwrap();
        assert_eq!(role, Role::SuperAdmin);
    }

    #[test]
    fn profile_patch_ignores_immutable_fields() {
        let patch: UpdateProfileRequest =
            serde_json::from_str(r#"{"name":"Ada","email":"new@example.com","role":"admin"}"#)
                .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Ada"));
        assert!(patch.password.is_none());
        assert!(patch.age.is_none());
    }
}
