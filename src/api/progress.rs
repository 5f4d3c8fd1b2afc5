use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};

use super::response::{ApiResult, AppJson, AppPath, ok};
use crate::models::*;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lessons/{id}/complete", post(complete_lesson))
        .route("/lessons/{id}/activity", post(record_activity))
        .route("/sections/{id}/complete", post(complete_section))
        .route("/quizzes/{id}/submit", post(submit_quiz))
        .route("/courses/{id}/progress", get(course_progress))
}

async fn complete_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<LessonCompletion> {
    ok(state.progress().mark_lesson_complete(&user, &id).await?)
}

async fn record_activity(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<ActivityRequest>,
) -> ApiResult<Progress> {
    ok(state.progress().record_time_spent(&user, &id, req).await?)
}

async fn complete_section(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<SectionCompletion> {
    ok(state.progress().mark_section_complete(&user, &id).await?)
}

async fn submit_quiz(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(submission): AppJson<QuizSubmission>,
) -> ApiResult<QuizResult> {
    ok(state.progress().record_quiz_result(&user, &id, submission).await?)
}

async fn course_progress(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<ProgressReport> {
    ok(state.progress().course_progress(&user, &id).await?)
}
