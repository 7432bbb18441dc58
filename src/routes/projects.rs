use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{AddMemberRequest, ProjectInput, ProjectPatch},
    services,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Lists every project the authenticated user owns or is a member of,
/// newest first.
#[get("")]
pub async fn list_projects(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let projects = services::projects::list_accessible(&pool, auth.0).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Creates a project; the authenticated user becomes its owner.
#[post("")]
pub async fn create_project(
    pool: web::Data<PgPool>,
    project_data: web::Json<ProjectInput>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;
    let project = services::projects::create(&pool, auth.0, project_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(project))
}

/// Fetches a project. Owner or member only; 404 before 403.
#[get("/{id}")]
pub async fn get_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project = services::projects::get(&pool, project_id.into_inner(), auth.0).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Merge-patch update. Owner only; a supplied member list replaces the
/// member set.
#[put("/{id}")]
pub async fn update_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    patch: web::Json<ProjectPatch>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project =
        services::projects::update(&pool, project_id.into_inner(), auth.0, patch.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Deletes a project and its tasks. Owner only.
#[delete("/{id}")]
pub async fn delete_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    services::projects::delete(&pool, project_id.into_inner(), auth.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Adds a member to the project. Owner only; adding an existing member
/// fails with 400.
#[post("/{id}/members")]
pub async fn add_member(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    member: web::Json<AddMemberRequest>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project =
        services::projects::add_member(&pool, project_id.into_inner(), auth.0, member.user_id)
            .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Removes a member from the project. Owner only; removing a non-member is
/// a no-op success.
#[delete("/{id}/members/{user_id}")]
pub async fn remove_member(
    pool: web::Data<PgPool>,
    path: web::Path<(Uuid, i32)>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let (project_id, user_id) = path.into_inner();
    let project = services::projects::remove_member(&pool, project_id, auth.0, user_id).await?;
    Ok(HttpResponse::Ok().json(project))
}
