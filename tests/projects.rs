use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use dotenv::dotenv;
use serde_json::json;
use sqlx::PgPool;
use taskhub::config::Config;
use taskhub::models::{Project, ProjectStatus};
use taskhub::routes::{self, health};
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "taskhub-integration-secret");
    }
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping integration test");
            return None;
        }
    };
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

fn test_config() -> Config {
    Config {
        database_url: std::env::var("DATABASE_URL").unwrap_or_default(),
        server_port: 8080,
        server_host: "127.0.0.1".to_string(),
        open_admin_signup: false,
    }
}

async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

macro_rules! test_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new(test_config()))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(Logger::default())
                .service(health::health)
                .service(
                    web::scope("/api")
                        .wrap(taskhub::auth::AuthMiddleware)
                        .configure(routes::config),
                ),
        )
        .await
    };
}

/// Registers an account and returns (id, token).
macro_rules! register_user {
    ($app:expr, $username:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&json!({
                "username": $username,
                "email": $email,
                "password": "Password123!",
                "first_name": "Project",
                "last_name": "Tester"
            }))
            .to_request();
        let resp = test::call_service($app, req).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        assert_eq!(
            status,
            actix_web::http::StatusCode::CREATED,
            "Registration failed. Body: {:?}",
            String::from_utf8_lossy(&body)
        );
        let auth: taskhub::auth::AuthResponse = serde_json::from_slice(&body).unwrap();
        (auth.user.id, auth.token)
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

#[actix_rt::test]
async fn test_project_authorization_matrix() {
    let Some(pool) = test_pool().await else { return };
    for email in [
        "proj_matrix_owner@example.com",
        "proj_matrix_member@example.com",
        "proj_matrix_outsider@example.com",
    ] {
        cleanup_user(&pool, email).await;
    }

    let app = test_app!(pool);
    let (owner_id, owner_token) =
        register_user!(&app, "proj_matrix_owner", "proj_matrix_owner@example.com");
    let (member_id, member_token) =
        register_user!(&app, "proj_matrix_member", "proj_matrix_member@example.com");
    let (outsider_id, outsider_token) = register_user!(
        &app,
        "proj_matrix_outsider",
        "proj_matrix_outsider@example.com"
    );

    // Owner creates the project
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&owner_token))
        .set_json(&json!({ "name": "Matrix", "description": "access matrix" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let project: Project = test::read_body_json(resp).await;
    assert_eq!(project.owner_id, owner_id);
    assert!(project.members.is_empty());
    assert_eq!(project.status, ProjectStatus::Active);

    let project_uri = format!("/api/projects/{}", project.id);

    // Owner reads it; a stranger gets 403; a random id gets 404
    let req = test::TestRequest::get()
        .uri(&project_uri)
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::OK
    );

    let req = test::TestRequest::get()
        .uri(&project_uri)
        .insert_header(bearer(&member_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/projects/{}", Uuid::new_v4()))
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::NOT_FOUND
    );

    // Non-owners cannot update, delete, or manage members
    let req = test::TestRequest::put()
        .uri(&project_uri)
        .insert_header(bearer(&member_token))
        .set_json(&json!({ "name": "Hijacked" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&project_uri)
        .insert_header(bearer(&member_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::post()
        .uri(&format!("{}/members", project_uri))
        .insert_header(bearer(&member_token))
        .set_json(&json!({ "user_id": member_id }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::FORBIDDEN
    );

    // Owner adds the member
    let req = test::TestRequest::post()
        .uri(&format!("{}/members", project_uri))
        .insert_header(bearer(&owner_token))
        .set_json(&json!({ "user_id": member_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let project: Project = test::read_body_json(resp).await;
    assert_eq!(project.members, vec![member_id]);

    // Adding the same member twice is refused
    let req = test::TestRequest::post()
        .uri(&format!("{}/members", project_uri))
        .insert_header(bearer(&owner_token))
        .set_json(&json!({ "user_id": member_id }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::BAD_REQUEST
    );

    // Adding a user that does not exist is a 404
    let req = test::TestRequest::post()
        .uri(&format!("{}/members", project_uri))
        .insert_header(bearer(&owner_token))
        .set_json(&json!({ "user_id": -1 }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::NOT_FOUND
    );

    // Members can now read, but still not manage
    let req = test::TestRequest::get()
        .uri(&project_uri)
        .insert_header(bearer(&member_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::OK
    );

    let req = test::TestRequest::post()
        .uri(&format!("{}/members", project_uri))
        .insert_header(bearer(&member_token))
        .set_json(&json!({ "user_id": outsider_id }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::FORBIDDEN
    );

    // Owner removes the member; removing again is a silent no-op
    let req = test::TestRequest::delete()
        .uri(&format!("{}/members/{}", project_uri, member_id))
        .insert_header(bearer(&owner_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let project: Project = test::read_body_json(resp).await;
    assert!(project.members.is_empty());

    let req = test::TestRequest::delete()
        .uri(&format!("{}/members/{}", project_uri, member_id))
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::OK
    );

    // Access is revoked with the membership
    let req = test::TestRequest::get()
        .uri(&project_uri)
        .insert_header(bearer(&member_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::FORBIDDEN
    );

    // Only the owner deletes; afterwards the project is gone
    let req = test::TestRequest::delete()
        .uri(&project_uri)
        .insert_header(bearer(&outsider_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&project_uri)
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::get()
        .uri(&project_uri)
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::NOT_FOUND
    );

    for email in [
        "proj_matrix_owner@example.com",
        "proj_matrix_member@example.com",
        "proj_matrix_outsider@example.com",
    ] {
        cleanup_user(&pool, email).await;
    }
}

#[actix_rt::test]
async fn test_project_merge_patch_and_member_replacement() {
    let Some(pool) = test_pool().await else { return };
    for email in [
        "proj_patch_owner@example.com",
        "proj_patch_b@example.com",
        "proj_patch_c@example.com",
    ] {
        cleanup_user(&pool, email).await;
    }

    let app = test_app!(pool);
    let (_owner_id, owner_token) =
        register_user!(&app, "proj_patch_owner", "proj_patch_owner@example.com");
    let (b_id, _) = register_user!(&app, "proj_patch_b", "proj_patch_b@example.com");
    let (c_id, _) = register_user!(&app, "proj_patch_c", "proj_patch_c@example.com");

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&owner_token))
        .set_json(&json!({
            "name": "Patchable",
            "description": "before",
            "members": [b_id, b_id]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let project: Project = test::read_body_json(resp).await;
    // Duplicate ids in the initial member list are collapsed
    assert_eq!(project.members, vec![b_id]);

    // Empty strings are ignored; present fields overwrite
    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", project.id))
        .insert_header(bearer(&owner_token))
        .set_json(&json!({
            "name": "",
            "description": "after",
            "status": "completed"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let patched: Project = test::read_body_json(resp).await;
    assert_eq!(patched.name, "Patchable");
    assert_eq!(patched.description.as_deref(), Some("after"));
    assert_eq!(patched.status, ProjectStatus::Completed);
    // Members untouched when the patch does not mention them
    assert_eq!(patched.members, vec![b_id]);

    // A present members list fully replaces the set
    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", project.id))
        .insert_header(bearer(&owner_token))
        .set_json(&json!({ "members": [c_id, c_id] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let replaced: Project = test::read_body_json(resp).await;
    assert_eq!(replaced.members, vec![c_id]);

    for email in [
        "proj_patch_owner@example.com",
        "proj_patch_b@example.com",
        "proj_patch_c@example.com",
    ] {
        cleanup_user(&pool, email).await;
    }
}

#[actix_rt::test]
async fn test_list_accessible_projects() {
    let Some(pool) = test_pool().await else { return };
    for email in [
        "proj_list_a@example.com",
        "proj_list_b@example.com",
        "proj_list_c@example.com",
    ] {
        cleanup_user(&pool, email).await;
    }

    let app = test_app!(pool);
    let (a_id, a_token) = register_user!(&app, "proj_list_a", "proj_list_a@example.com");
    let (_b_id, b_token) = register_user!(&app, "proj_list_b", "proj_list_b@example.com");
    let (_c_id, c_token) = register_user!(&app, "proj_list_c", "proj_list_c@example.com");

    // A owns one project; B owns another and invites A
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&a_token))
        .set_json(&json!({ "name": "Owned by A" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let owned: Project = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&b_token))
        .set_json(&json!({ "name": "Owned by B", "members": [a_id] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let joined: Project = test::read_body_json(resp).await;

    let req = test::TestRequest::get()
        .uri("/api/projects")
        .insert_header(bearer(&a_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let projects: Vec<Project> = test::read_body_json(resp).await;
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    // Both the owned and the joined project, newest first
    assert_eq!(ids, vec![joined.id, owned.id]);

    // A user with no projects sees an empty list
    let req = test::TestRequest::get()
        .uri("/api/projects")
        .insert_header(bearer(&c_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let projects: Vec<Project> = test::read_body_json(resp).await;
    assert!(projects.is_empty());

    for email in [
        "proj_list_a@example.com",
        "proj_list_b@example.com",
        "proj_list_c@example.com",
    ] {
        cleanup_user(&pool, email).await;
    }
}

#[actix_rt::test]
async fn test_user_delete_cascade() {
    let Some(pool) = test_pool().await else { return };
    for email in [
        "proj_cascade_admin@example.com",
        "proj_cascade_owner@example.com",
        "proj_cascade_member@example.com",
    ] {
        cleanup_user(&pool, email).await;
    }

    let app = test_app!(pool);
    let (admin_id, admin_token) =
        register_user!(&app, "proj_cascade_admin", "proj_cascade_admin@example.com");
    let (owner_id, owner_token) =
        register_user!(&app, "proj_cascade_owner", "proj_cascade_owner@example.com");
    let (member_id, _member_token) =
        register_user!(&app, "proj_cascade_member", "proj_cascade_member@example.com");

    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(admin_id)
        .execute(&pool)
        .await
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&owner_token))
        .set_json(&json!({ "name": "Doomed", "members": [member_id] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let project: Project = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(&owner_token))
        .set_json(&json!({
            "title": "Assigned work",
            "project_id": project.id,
            "assigned_to": member_id
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let task: taskhub::models::Task = test::read_body_json(resp).await;
    assert_eq!(task.assigned_to, Some(member_id));

    // Deleting the member drops their membership and nulls the assignment
    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", member_id))
        .insert_header(bearer(&admin_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::NO_CONTENT
    );

    let member_rows = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM project_members WHERE project_id = $1",
    )
    .bind(project.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(member_rows, 0);

    let assigned_to = sqlx::query_scalar::<_, Option<i32>>(
        "SELECT assigned_to FROM tasks WHERE id = $1",
    )
    .bind(task.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(assigned_to, None);

    // Deleting the owner takes the project and its tasks with it
    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", owner_id))
        .insert_header(bearer(&admin_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        actix_web::http::StatusCode::NO_CONTENT
    );

    let project_rows =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE id = $1")
            .bind(project.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(project_rows, 0);

    let task_rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE id = $1")
        .bind(task.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(task_rows, 0);

    cleanup_user(&pool, "proj_cascade_admin@example.com").await;
}
