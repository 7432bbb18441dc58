use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CommentInput, TaskInput, TaskPatch},
    services,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Lists all tasks of a project, newest first. Requires owner or member
/// access on the project.
#[get("/project/{project_id}")]
pub async fn list_project_tasks(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = services::tasks::list_for_project(&pool, project_id.into_inner(), auth.0).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Lists tasks assigned to the authenticated user, newest first.
#[get("/my-tasks")]
pub async fn my_tasks(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = services::tasks::list_for_user(&pool, auth.0).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task in a project the authenticated user participates in.
/// Status starts as pending; priority defaults to medium.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task = services::tasks::create(&pool, auth.0, task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Fetches a task. Requires access to the parent project; 404 before 403.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = services::tasks::get(&pool, task_id.into_inner(), auth.0).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Merge-patch update by any project participant.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    patch: web::Json<TaskPatch>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task =
        services::tasks::update(&pool, task_id.into_inner(), auth.0, patch.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task. Project owner only, regardless of who created it.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    services::tasks::delete(&pool, task_id.into_inner(), auth.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Appends a comment to a task and returns the updated task.
#[post("/{id}/comments")]
pub async fn add_comment(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    comment: web::Json<CommentInput>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    comment.validate()?;
    let task = services::tasks::add_comment(
        &pool,
        task_id.into_inner(),
        auth.0,
        comment.into_inner().text,
    )
    .await?;
    Ok(HttpResponse::Created().json(task))
}
