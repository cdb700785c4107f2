use crate::auth;
use crate::handlers;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/tasks", get(handlers::tasks))
        .route("/add_task", post(handlers::add_task))
        .route("/toggle_task", post(handlers::toggle_task))
        .route("/delete_task", post(handlers::delete_task))
        .route("/projects", get(handlers::projects))
        .route("/add_project", post(handlers::add_project))
        .route("/delete_project", post(handlers::delete_project))
        .route("/reports", get(handlers::reports))
        .route("/api/reports", get(handlers::get_reports))
        .route("/calendar", get(handlers::calendar))
        .route("/api/upcoming", get(handlers::upcoming))
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/register", get(auth::register_page).post(auth::register_submit))
        .route("/logout", get(auth::logout))
        .route("/static/app.css", get(handlers::stylesheet))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_login))
        .with_state(state)
}
