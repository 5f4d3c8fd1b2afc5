use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};

use super::response::{ApiResult, AppJson, AppPath, Created, created, ok};
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/courses/{id}/reviews", get(list_reviews).post(add_review))
        .route("/courses/{id}/rating", get(course_rating))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
}

async fn list_reviews(State(state): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Vec<Review>> {
    ok(state.reviews().list_reviews(&id).await?)
}

async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<NewReviewRequest>,
) -> Created<Review> {
    created(state.reviews().add_review(&user, &id, req).await?)
}

async fn course_rating(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> ApiResult<RatingSummary> {
    ok(state.reviews().average_rating(&id).await?)
}

async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<UpdateReviewRequest>,
) -> ApiResult<Review> {
    ok(state.reviews().update_review(&user, &id, req).await?)
}

async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    state.reviews().delete_review(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
