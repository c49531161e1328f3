use axum::{
    middleware::from_fn,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use flowboard_api::database::manager::DatabaseManager;
use flowboard_api::handlers::{protected, public};
use flowboard_api::middleware::auth::auth_middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = flowboard_api::config::config();
    tracing::info!("starting flowboard API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("FLOWBOARD_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("flowboard API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API (identity middleware applied per sub-router)
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn protected_routes() -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(project_routes())
        .merge(workflow_routes())
        .merge(team_routes())
        .merge(area_routes())
        .merge(notification_routes())
        .route_layer(from_fn(auth_middleware))
}

fn auth_routes() -> Router {
    use protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/refresh", post(auth::refresh))
}

fn project_routes() -> Router {
    use protected::{attachments, comments, impediments, projects, risks, stages, tasks};

    Router::new()
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:project_id",
            get(projects::show)
                .put(projects::update)
                .delete(projects::delete),
        )
        // Stages
        .route(
            "/api/projects/:project_id/stages",
            get(stages::list_project_stages).post(stages::create_project_stage),
        )
        .route(
            "/api/projects/:project_id/stages/:stage_id",
            put(stages::update_project_stage).delete(stages::delete_project_stage),
        )
        // Tasks within a stage
        .route(
            "/api/projects/:project_id/stages/:stage_id/tasks",
            get(tasks::list_project_tasks).post(tasks::create_project_task),
        )
        .route(
            "/api/projects/:project_id/stages/:stage_id/tasks/:task_id",
            get(tasks::show_project_task)
                .put(tasks::update_project_task)
                .delete(tasks::delete_project_task),
        )
        // Risks within a stage
        .route(
            "/api/projects/:project_id/stages/:stage_id/risks",
            get(risks::list_project_risks).post(risks::create_project_risk),
        )
        .route(
            "/api/projects/:project_id/stages/:stage_id/risks/:risk_id",
            put(risks::update_project_risk).delete(risks::delete_project_risk),
        )
        // Impediments within a stage
        .route(
            "/api/projects/:project_id/stages/:stage_id/impediments",
            get(impediments::list_project_impediments)
                .post(impediments::create_project_impediment),
        )
        .route(
            "/api/projects/:project_id/stages/:stage_id/impediments/:impediment_id",
            put(impediments::update_project_impediment)
                .delete(impediments::delete_project_impediment),
        )
        // Comments and attachments
        .route(
            "/api/projects/:project_id/comments",
            get(comments::list_project_comments).post(comments::create_project_comment),
        )
        .route(
            "/api/projects/:project_id/comments/:comment_id",
            put(comments::update_project_comment).delete(comments::delete_project_comment),
        )
        .route(
            "/api/projects/:project_id/attachments",
            get(attachments::list_project_attachments)
                .post(attachments::create_project_attachment),
        )
        .route(
            "/api/projects/:project_id/attachments/:attachment_id",
            delete(attachments::delete_project_attachment),
        )
        // Area associations
        .route(
            "/api/projects/:project_id/areas",
            get(projects::list_areas).post(projects::attach_area),
        )
        .route(
            "/api/projects/:project_id/areas/:area_id",
            delete(projects::detach_area),
        )
}

fn workflow_routes() -> Router {
    use protected::{attachments, comments, impediments, risks, stages, tasks, workflows};

    Router::new()
        .route("/api/workflows", get(workflows::list).post(workflows::create))
        .route(
            "/api/workflows/:workflow_id",
            get(workflows::show)
                .put(workflows::update)
                .delete(workflows::delete),
        )
        .route(
            "/api/workflows/:workflow_id/stages",
            get(stages::list_workflow_stages).post(stages::create_workflow_stage),
        )
        .route(
            "/api/workflows/:workflow_id/stages/:stage_id",
            put(stages::update_workflow_stage).delete(stages::delete_workflow_stage),
        )
        .route(
            "/api/workflows/:workflow_id/stages/:stage_id/tasks",
            get(tasks::list_workflow_tasks).post(tasks::create_workflow_task),
        )
        .route(
            "/api/workflows/:workflow_id/stages/:stage_id/tasks/:task_id",
            get(tasks::show_workflow_task)
                .put(tasks::update_workflow_task)
                .delete(tasks::delete_workflow_task),
        )
        .route(
            "/api/workflows/:workflow_id/stages/:stage_id/risks",
            get(risks::list_workflow_risks).post(risks::create_workflow_risk),
        )
        .route(
            "/api/workflows/:workflow_id/stages/:stage_id/risks/:risk_id",
            put(risks::update_workflow_risk).delete(risks::delete_workflow_risk),
        )
        .route(
            "/api/workflows/:workflow_id/stages/:stage_id/impediments",
            get(impediments::list_workflow_impediments)
                .post(impediments::create_workflow_impediment),
        )
        .route(
            "/api/workflows/:workflow_id/stages/:stage_id/impediments/:impediment_id",
            put(impediments::update_workflow_impediment)
                .delete(impediments::delete_workflow_impediment),
        )
        .route(
            "/api/workflows/:workflow_id/comments",
            get(comments::list_workflow_comments).post(comments::create_workflow_comment),
        )
        .route(
            "/api/workflows/:workflow_id/comments/:comment_id",
            put(comments::update_workflow_comment).delete(comments::delete_workflow_comment),
        )
        .route(
            "/api/workflows/:workflow_id/attachments",
            get(attachments::list_workflow_attachments)
                .post(attachments::create_workflow_attachment),
        )
        .route(
            "/api/workflows/:workflow_id/attachments/:attachment_id",
            delete(attachments::delete_workflow_attachment),
        )
}

fn team_routes() -> Router {
    use protected::teams;

    Router::new()
        .route("/api/teams", get(teams::list).post(teams::create))
        .route(
            "/api/teams/:team_id",
            get(teams::show).put(teams::update).delete(teams::delete),
        )
        .route(
            "/api/teams/:team_id/members",
            get(teams::list_members).post(teams::add_member),
        )
        .route(
            "/api/teams/:team_id/members/:principal_id",
            put(teams::update_member).delete(teams::remove_member),
        )
}

fn area_routes() -> Router {
    use protected::areas;

    Router::new()
        .route("/api/areas", get(areas::list).post(areas::create))
        .route("/api/areas/:area_id", delete(areas::delete))
}

fn notification_routes() -> Router {
    use protected::notifications;

    Router::new()
        .route("/api/notifications", get(notifications::list))
        .route(
            "/api/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_read),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Flowboard API",
            "version": version,
            "description": "Project and workflow management backend API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/register, /auth/login (public - token acquisition)",
                "auth": "/api/auth/* (protected)",
                "projects": "/api/projects[/:id]/... (protected)",
                "workflows": "/api/workflows[/:id]/... (protected)",
                "teams": "/api/teams[/:id]/members (protected)",
                "areas": "/api/areas (protected)",
                "notifications": "/api/notifications (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "UNAVAILABLE",
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
