use axum::Router;
use axum::extract::State;
use axum::routing::get;

use super::response::{ApiResult, AppPath, ok};
use crate::identity::Viewer;
use crate::models::*;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sections/{id}/content", get(section_content))
        .route("/courses/{id}/content", get(course_outline))
        .route("/quizzes/{id}", get(quiz))
}

async fn section_content(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    AppPath(id): AppPath<String>,
) -> ApiResult<ContentDescriptor> {
    ok(state.content().resolve_section_content(viewer.as_ref(), &id).await?)
}

async fn course_outline(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    AppPath(id): AppPath<String>,
) -> ApiResult<CourseOutline> {
    ok(state.content().course_outline(viewer.as_ref(), &id).await?)
}

async fn quiz(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    AppPath(id): AppPath<String>,
) -> ApiResult<QuizView> {
    ok(state.content().quiz_for_learner(viewer.as_ref(), &id).await?)
}
