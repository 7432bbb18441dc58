pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(users::profile)
        .service(
            web::scope("/auth")
                .service(auth::login)
                .service(auth::register),
        )
        .service(
            web::scope("/users")
                .service(users::list_users)
                .service(users::get_user)
                .service(users::update_user)
                .service(users::delete_user),
        )
        .service(
            web::scope("/projects")
                .service(projects::list_projects)
                .service(projects::create_project)
                .service(projects::add_member)
                .service(projects::remove_member)
                .service(projects::get_project)
                .service(projects::update_project)
                .service(projects::delete_project),
        )
        .service(
            // The literal segments must be registered ahead of the `{id}`
            // matchers.
            web::scope("/tasks")
                .service(tasks::list_project_tasks)
                .service(tasks::my_tasks)
                .service(tasks::create_task)
                .service(tasks::add_comment)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
