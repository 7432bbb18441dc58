use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// Extracts the authenticated user's ID from request extensions.
///
/// This extractor is intended to be used on routes protected by
/// `AuthMiddleware`, which validates the JWT and inserts the decoded
/// `Claims` into request extensions.
///
/// If no claims are present (e.g. `AuthMiddleware` did not run), the
/// extractor fails with `AppError::Unauthorized`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub i32);

impl FromRequest for AuthenticatedUser {
    type Error = ActixError; // AppError converts into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) => ready(Ok(AuthenticatedUser(claims.sub))),
            None => {
                let err = AppError::Unauthorized(
                    "Authentication required. Ensure AuthMiddleware is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}
