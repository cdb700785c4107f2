use crate::auth::{safe_next, CurrentUser};
use crate::calendar::build_month;
use crate::errors::AppError;
use crate::locale::due_display;
use crate::models::{
    AddProjectForm, AddTaskForm, CalendarQuery, DeleteProjectRequest, DeleteProjectResponse,
    DeleteTaskResponse, IdValue, NewTask, NextQuery, Priority, ReportsResponse, TaskIdRequest,
    ToggleResponse, UpcomingResponse, UpcomingTask, DEFAULT_PROJECT,
};
use crate::state::AppState;
use crate::stats::{build_reports, project_summaries};
use crate::ui::{
    render_calendar, render_dashboard, render_projects, render_reports, render_tasks, STYLESHEET,
};
use axum::{
    async_trait,
    extract::{FromRequest, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use chrono::{Duration, Local};
use serde::de::DeserializeOwned;
use tracing::info;

/// Accepts a body sent either as JSON or as an urlencoded form.
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let Json(payload) = Json::<T>::from_request(req, state)
                .await
                .map_err(|err| AppError::bad_request(err.body_text()))?;
            Ok(Self(payload))
        } else {
            let Form(payload) = Form::<T>::from_request(req, state)
                .await
                .map_err(|err| AppError::bad_request(err.body_text()))?;
            Ok(Self(payload))
        }
    }
}

fn require_id(id: Option<IdValue>) -> Result<i64, AppError> {
    let id = id.ok_or_else(|| AppError::bad_request("missing id"))?;
    id.parse().ok_or_else(|| AppError::bad_request("invalid id"))
}

fn trimmed(value: Option<String>) -> String {
    value.map(|value| value.trim().to_string()).unwrap_or_default()
}

pub async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, AppError> {
    let counts = state.with_store(|store| store.status_counts()).await?;
    Ok(Html(render_dashboard(&user, &counts)))
}

pub async fn tasks(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, AppError> {
    let tasks = state.with_store(|store| store.list_tasks()).await?;
    Ok(Html(render_tasks(&user, &tasks)))
}

pub async fn add_task(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    Form(form): Form<AddTaskForm>,
) -> Result<Redirect, AppError> {
    let title = trimmed(form.title);
    if title.is_empty() {
        return Err(AppError::bad_request("missing title"));
    }

    let project = trimmed(form.project);
    let due_sort = trimmed(form.due_sort);
    let task = NewTask {
        project: if project.is_empty() {
            DEFAULT_PROJECT.to_string()
        } else {
            project
        },
        title,
        description: trimmed(form.description),
        priority: Priority::parse(form.priority.as_deref().unwrap_or_default()),
        due: due_display(&due_sort),
        due_sort,
    };

    let created = state.with_store(move |store| store.insert_task(&task)).await?;
    info!(id = created.id, project = %created.project, "task added");

    let next = form.next.or(query.next).filter(|next| !next.trim().is_empty());
    match next {
        Some(next) => Ok(Redirect::to(&safe_next(Some(&next)))),
        None => Ok(Redirect::to("/tasks")),
    }
}

pub async fn toggle_task(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<TaskIdRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    let id = require_id(payload.id)?;
    let today = Local::now().date_naive();
    let task = state
        .with_store(move |store| store.toggle_task_status(id, today))
        .await?
        .ok_or_else(|| AppError::not_found("not found"))?;

    info!(id, status = %task.status, "task toggled");
    Ok(Json(ToggleResponse {
        id,
        status: task.status,
    }))
}

pub async fn delete_task(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<TaskIdRequest>,
) -> Result<Json<DeleteTaskResponse>, AppError> {
    let id = require_id(payload.id)?;
    let deleted = state.with_store(move |store| store.delete_task(id)).await?;
    if !deleted {
        return Err(AppError::not_found("not found"));
    }

    info!(id, "task deleted");
    Ok(Json(DeleteTaskResponse { ok: true, id }))
}

pub async fn projects(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, AppError> {
    let (tasks, projects) = state
        .with_store(|store| Ok((store.list_tasks()?, store.list_projects()?)))
        .await?;
    Ok(Html(render_projects(&user, &project_summaries(&tasks, &projects))))
}

pub async fn add_project(
    State(state): State<AppState>,
    Form(form): Form<AddProjectForm>,
) -> Result<Redirect, AppError> {
    let name = trimmed(form.name);
    if !name.is_empty() {
        let description = trimmed(form.description);
        let inserted = state
            .with_store(move |store| store.insert_project(&name, &description))
            .await?;
        info!(inserted, "project add requested");
    }
    Ok(Redirect::to("/projects"))
}

pub async fn delete_project(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<DeleteProjectRequest>,
) -> Result<Json<DeleteProjectResponse>, AppError> {
    let name = trimmed(payload.name);
    let deletion = match payload.id {
        Some(id) => {
            let id = id.parse().ok_or_else(|| AppError::bad_request("invalid id"))?;
            state
                .with_store(move |store| store.delete_project_by_id(id))
                .await?
        }
        None if !name.is_empty() => {
            let deletion = state
                .with_store(move |store| store.delete_project_by_name(&name))
                .await?;
            (deletion.removed_project || deletion.deleted_tasks > 0).then_some(deletion)
        }
        None => return Err(AppError::bad_request("missing id or name")),
    };

    let deletion = deletion.ok_or_else(|| AppError::not_found("not found"))?;
    info!(
        name = %deletion.name,
        deleted_tasks = deletion.deleted_tasks,
        "project deleted"
    );
    Ok(Json(DeleteProjectResponse {
        ok: true,
        name: deletion.name,
        deleted_tasks: deletion.deleted_tasks,
    }))
}

async fn load_reports(state: &AppState) -> Result<ReportsResponse, AppError> {
    let tasks = state.with_store(|store| store.list_tasks()).await?;
    Ok(build_reports(&tasks))
}

pub async fn reports(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, AppError> {
    let reports = load_reports(&state).await?;
    Ok(Html(render_reports(&user, &reports)))
}

pub async fn get_reports(State(state): State<AppState>) -> Result<Json<ReportsResponse>, AppError> {
    Ok(Json(load_reports(&state).await?))
}

pub async fn calendar(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<CalendarQuery>,
) -> Result<Html<String>, AppError> {
    let tasks = state.with_store(|store| store.list_tasks()).await?;
    let month = build_month(query.year.as_deref(), query.month.as_deref(), &tasks);
    Ok(Html(render_calendar(&user, &month)))
}

pub async fn upcoming(State(state): State<AppState>) -> Result<Json<UpcomingResponse>, AppError> {
    let tomorrow = Local::now().date_naive() + Duration::days(1);
    let tasks = state
        .with_store(move |store| store.tasks_due_on(tomorrow))
        .await?;

    let tasks: Vec<UpcomingTask> = tasks
        .into_iter()
        .map(|task| UpcomingTask {
            id: task.id,
            title: task.title,
            project: task.project,
            due: task.due,
            due_sort: task.due_sort,
            priority: task.priority,
            status: task.status,
        })
        .collect();
    Ok(Json(UpcomingResponse {
        count: tasks.len(),
        tasks,
    }))
}

pub async fn stylesheet() -> Response {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("text/css; charset=utf-8"))],
        STYLESHEET,
    )
        .into_response()
}
