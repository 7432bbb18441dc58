use crate::{auth::AuthenticatedUser, error::AppError, models::UserPatch, services};
use actix_web::{delete, get, put, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Returns the authenticated user's own profile.
#[get("/profile")]
pub async fn profile(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = services::users::find_by_id(&pool, auth.0).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Lists all user accounts. Admin only.
#[get("")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    services::users::ensure_admin(&pool, auth.0).await?;
    let users = services::users::list(&pool).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Fetches a single account by id. Admin only.
#[get("/{id}")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    services::users::ensure_admin(&pool, auth.0).await?;
    let user = services::users::find_by_id(&pool, user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Merge-patch update of an account, including role promotion. Admin only.
#[put("/{id}")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    patch: web::Json<UserPatch>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    services::users::ensure_admin(&pool, auth.0).await?;
    let user = services::users::update(&pool, user_id.into_inner(), patch.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Hard-deletes an account and everything it owns. Admin only.
#[delete("/{id}")]
pub async fn delete_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    services::users::ensure_admin(&pool, auth.0).await?;
    services::users::delete(&pool, user_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
