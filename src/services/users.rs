//! Identity store: registration, authentication and the admin-only account
//! management operations.

use sqlx::{FromRow, PgPool};

use crate::auth::{hash_password, verify_password, RegisterRequest};
use crate::error::AppError;
use crate::models::{User, UserPatch, UserRole};

use super::{merge_text, non_empty};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role, created_at";

#[derive(FromRow)]
struct CredentialRow {
    id: i32,
    password_hash: String,
}

#[derive(FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: UserRole,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Creates a new account. Fails with 400 when the email or username is
/// already taken (case-sensitive exact match).
///
/// A requested "admin" role is honored only when `open_admin_signup` is
/// enabled; any other requested value silently yields a regular account.
pub async fn register(
    pool: &PgPool,
    input: RegisterRequest,
    open_admin_signup: bool,
) -> Result<User, AppError> {
    let existing =
        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE email = $1 OR username = $2")
            .bind(&input.email)
            .bind(&input.username)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::BadRequest(
            "Email or username already registered".into(),
        ));
    }

    let role = match input.role.as_deref() {
        Some("admin") if open_admin_signup => UserRole::Admin,
        _ => UserRole::User,
    };

    let password_hash = hash_password(&input.password)?;

    let sql = format!(
        "INSERT INTO users (username, email, password_hash, first_name, last_name, role) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(role)
        .fetch_one(pool)
        .await?;

    Ok(user)
}

/// Verifies an email/password pair. Unknown email and wrong password are
/// deliberately indistinguishable to the caller.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<User, AppError> {
    let credentials =
        sqlx::query_as::<_, CredentialRow>("SELECT id, password_hash FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

    match credentials {
        Some(row) => {
            if verify_password(password, &row.password_hash)? {
                find_by_id(pool, row.id).await
            } else {
                Err(AppError::Unauthorized("Invalid credentials".into()))
            }
        }
        None => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<User, AppError> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn list(pool: &PgPool) -> Result<Vec<User>, AppError> {
    let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
    let users = sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?;
    Ok(users)
}

/// Merge-patch update: only present, non-empty fields overwrite. Runs as a
/// single-row transaction so concurrent updates cannot interleave.
pub async fn update(pool: &PgPool, id: i32, patch: UserPatch) -> Result<User, AppError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash, first_name, last_name, role, created_at \
         FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let mut row = row.ok_or_else(|| AppError::NotFound("User not found".into()))?;

    merge_text(&mut row.username, patch.username);
    merge_text(&mut row.email, patch.email);
    merge_text(&mut row.first_name, patch.first_name);
    merge_text(&mut row.last_name, patch.last_name);
    if let Some(password) = non_empty(patch.password) {
        row.password_hash = hash_password(&password)?;
    }
    if let Some(role) = patch.role {
        row.role = role;
    }

    sqlx::query(
        "UPDATE users SET username = $1, email = $2, password_hash = $3, first_name = $4, \
         last_name = $5, role = $6 WHERE id = $7",
    )
    .bind(&row.username)
    .bind(&row.email)
    .bind(&row.password_hash)
    .bind(&row.first_name)
    .bind(&row.last_name)
    .bind(row.role)
    .bind(row.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(row.into_user())
}

/// Hard delete. Referential cleanup is handled by the schema: owned
/// projects and authored tasks go with the account, memberships are
/// removed, task assignments are nulled.
pub async fn delete(pool: &PgPool, id: i32) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    Ok(())
}

/// Gate for the user-management endpoints: the acting account must exist
/// and hold the admin role.
pub async fn ensure_admin(pool: &PgPool, user_id: i32) -> Result<(), AppError> {
    let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match role {
        Some(UserRole::Admin) => Ok(()),
        Some(_) => Err(AppError::Forbidden("Admin access required".into())),
        None => Err(AppError::Unauthorized("Account no longer exists".into())),
    }
}
