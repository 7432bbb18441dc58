use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role, granting access to the user-management endpoints.
/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account.
    User,
    /// May list, update and delete any account.
    Admin,
}

/// A user account as returned by the API.
///
/// The password hash is deliberately not part of this struct; it is read
/// only inside the authentication path and never serialized.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Merge-patch payload for the admin user update endpoint.
///
/// Absent and empty-string fields leave the stored value unchanged; a
/// supplied `password` is re-hashed before storage.
#[derive(Debug, Deserialize, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
}
