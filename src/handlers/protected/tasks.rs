// Task routes under project/workflow stages. Every mutation runs through the
// container guard plus the stage scope check, then recomputes the container
// counters from the surviving task rows.

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::access::counters::recompute_after_mutation;
use crate::access::guard::{invalid_on_fk, require_access, Operation};
use crate::access::{load_container, scope, ContainerRef, ParentKind};
use crate::database::manager::DatabaseManager;
use crate::database::models::project::PRIORITIES;
use crate::database::models::task::{Task, TASK_STATUSES};
use crate::handlers::validate;
use crate::middleware::auth::AuthPrincipal;
use crate::middleware::response::{ApiResponse, ApiResult};

use super::notifications;

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub position: Option<i32>,
}

/// Guard entry shared by every task operation: container access first, then
/// the one-hop stage scope check.
async fn guarded_stage(
    pool: &PgPool,
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    operation: Operation,
) -> Result<ContainerRef, crate::error::ApiError> {
    let container = load_container(pool, kind, parent_id).await?;
    require_access(pool, principal.id, &container, operation).await?;
    scope::stage_in_container(pool, stage_id, &container).await?;
    Ok(container)
}

async fn list(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
) -> ApiResult<Vec<Task>> {
    let pool = DatabaseManager::pool().await?;
    guarded_stage(&pool, kind, principal, parent_id, stage_id, Operation::View).await?;

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE stage_id = $1 ORDER BY position, created_at",
    )
    .bind(stage_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(tasks))
}

async fn show(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    task_id: Uuid,
) -> ApiResult<Task> {
    let pool = DatabaseManager::pool().await?;
    guarded_stage(&pool, kind, principal, parent_id, stage_id, Operation::View).await?;
    let task = scope::task_in_stage(&pool, task_id, stage_id).await?;
    Ok(ApiResponse::success(task))
}

async fn create(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    body: CreateTask,
) -> ApiResult<Task> {
    let title = validate::non_empty("title", &body.title)?;
    validate::max_len("title", &title, 300)?;
    let status = validate::optional_one_of("status", body.status.as_deref(), TASK_STATUSES)?
        .unwrap_or_else(|| "todo".to_string());
    let priority = validate::optional_one_of("priority", body.priority.as_deref(), PRIORITIES)?
        .unwrap_or_else(|| "medium".to_string());

    let pool = DatabaseManager::pool().await?;
    guarded_stage(&pool, kind, principal, parent_id, stage_id, Operation::Modify).await?;

    let position = match body.position {
        Some(p) => p,
        None => sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(position) + 1, 1) FROM tasks WHERE stage_id = $1",
        )
        .bind(stage_id)
        .fetch_one(&pool)
        .await?,
    };

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (stage_id, title, description, status, priority, assignee_id, position) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(stage_id)
    .bind(&title)
    .bind(&body.description)
    .bind(&status)
    .bind(&priority)
    .bind(body.assignee_id)
    .bind(position)
    .fetch_one(&pool)
    .await
    .map_err(|e| invalid_on_fk(e, "assignee_id"))?;

    recompute_after_mutation(&pool, kind, parent_id).await;

    if let Some(assignee) = task.assignee_id {
        notifications::push(
            &pool,
            assignee,
            "task_assigned",
            &format!("You were assigned: {}", task.title),
            None,
        )
        .await;
    }

    Ok(ApiResponse::created(task))
}

async fn update(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    task_id: Uuid,
    body: UpdateTask,
) -> ApiResult<Task> {
    let title = match body.title.as_deref() {
        Some(t) => {
            let t = validate::non_empty("title", t)?;
            validate::max_len("title", &t, 300)?;
            Some(t)
        }
        None => None,
    };
    let status = validate::optional_one_of("status", body.status.as_deref(), TASK_STATUSES)?;
    let priority = validate::optional_one_of("priority", body.priority.as_deref(), PRIORITIES)?;

    let pool = DatabaseManager::pool().await?;
    guarded_stage(&pool, kind, principal, parent_id, stage_id, Operation::Modify).await?;
    let before = scope::task_in_stage(&pool, task_id, stage_id).await?;

    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks SET \
            title = COALESCE($2, title), \
            description = COALESCE($3, description), \
            status = COALESCE($4, status), \
            priority = COALESCE($5, priority), \
            assignee_id = COALESCE($6, assignee_id), \
            position = COALESCE($7, position), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(task_id)
    .bind(&title)
    .bind(&body.description)
    .bind(&status)
    .bind(&priority)
    .bind(body.assignee_id)
    .bind(body.position)
    .fetch_one(&pool)
    .await
    .map_err(|e| invalid_on_fk(e, "assignee_id"))?;

    // Status changes move the denormalized counters
    if task.status != before.status {
        recompute_after_mutation(&pool, kind, parent_id).await;
    }

    if task.assignee_id.is_some() && task.assignee_id != before.assignee_id {
        if let Some(assignee) = task.assignee_id {
            notifications::push(
                &pool,
                assignee,
                "task_assigned",
                &format!("You were assigned: {}", task.title),
                None,
            )
            .await;
        }
    }

    Ok(ApiResponse::success(task))
}

async fn delete(
    kind: ParentKind,
    principal: &AuthPrincipal,
    parent_id: Uuid,
    stage_id: Uuid,
    task_id: Uuid,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    guarded_stage(&pool, kind, principal, parent_id, stage_id, Operation::Modify).await?;
    scope::task_in_stage(&pool, task_id, stage_id).await?;

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&pool)
        .await?;

    recompute_after_mutation(&pool, kind, parent_id).await;
    Ok(ApiResponse::success(json!({ "deleted_id": task_id })))
}

// Project-scoped routes

pub async fn list_project_tasks(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Task>> {
    list(ParentKind::Project, &principal, project_id, stage_id).await
}

pub async fn show_project_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Task> {
    show(ParentKind::Project, &principal, project_id, stage_id, task_id).await
}

pub async fn create_project_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateTask>,
) -> ApiResult<Task> {
    create(ParentKind::Project, &principal, project_id, stage_id, body).await
}

pub async fn update_project_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateTask>,
) -> ApiResult<Task> {
    update(ParentKind::Project, &principal, project_id, stage_id, task_id, body).await
}

pub async fn delete_project_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((project_id, stage_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Project, &principal, project_id, stage_id, task_id).await
}

// Workflow-scoped routes

pub async fn list_workflow_tasks(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Task>> {
    list(ParentKind::Workflow, &principal, workflow_id, stage_id).await
}

pub async fn show_workflow_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Task> {
    show(ParentKind::Workflow, &principal, workflow_id, stage_id, task_id).await
}

pub async fn create_workflow_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateTask>,
) -> ApiResult<Task> {
    create(ParentKind::Workflow, &principal, workflow_id, stage_id, body).await
}

pub async fn update_workflow_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateTask>,
) -> ApiResult<Task> {
    update(ParentKind::Workflow, &principal, workflow_id, stage_id, task_id, body).await
}

pub async fn delete_workflow_task(
    Extension(principal): Extension<AuthPrincipal>,
    Path((workflow_id, stage_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Value> {
    delete(ParentKind::Workflow, &principal, workflow_id, stage_id, task_id).await
}
