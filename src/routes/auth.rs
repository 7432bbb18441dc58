use crate::{
    auth::{generate_token, AuthResponse, LoginRequest, RegisterRequest},
    config::Config,
    error::AppError,
    services,
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates a new user account and returns an authentication token alongside
/// the new profile.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let user = services::users::register(
        &pool,
        register_data.into_inner(),
        config.open_admin_signup,
    )
    .await?;

    let token = generate_token(user.id)?;

    Ok(HttpResponse::Created().json(AuthResponse { token, user }))
}

/// Login user
///
/// Authenticates a user and returns an authentication token.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = services::users::authenticate(&pool, &login_data.email, &login_data.password).await?;
    let token = generate_token(user.id)?;

    Ok(HttpResponse::Ok().json(AuthResponse { token, user }))
}
