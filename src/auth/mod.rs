pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::User;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    #[validate(email)]
    pub email: String,
    /// User's password. Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Must be between 3 and 32 characters, alphanumeric, and can include
    /// underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Email address for the new account.
    #[validate(email)]
    pub email: String,
    /// Password for the new account. Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    /// Requested role. Only the exact value "admin" is ever honored, and
    /// only when open admin signup is enabled; anything else yields a
    /// regular account.
    pub role: Option<String>,
}

/// Response structure after successful authentication (login or
/// registration): the JWT access token plus the account's public profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The JWT (JSON Web Token) for session authentication.
    pub token: String,
    #[serde(flatten)]
    pub user: User,
}
