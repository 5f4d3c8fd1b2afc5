use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, post};

use super::response::{ApiResult, AppPath, AppQuery, Created, created, ok};
use crate::models::*;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/courses/{id}/enroll", post(enroll))
        .route("/courses/{id}/unenroll", post(unenroll))
        .route("/courses/{id}/enrollment", get(enrollment_status))
        .route("/courses/{id}/enrollments", get(course_enrollments))
        .route("/enrollments", get(my_enrollments))
        .route("/instructor/students", get(instructor_students))
        .route("/instructor/students/{id}", delete(remove_student))
}

async fn enroll(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Created<EnrollOutcome> {
    created(state.enrollments().enroll(&user, &id).await?)
}

async fn unenroll(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<Enrollment> {
    ok(state.enrollments().unenroll(&user, &id).await?)
}

async fn enrollment_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<EnrollmentCheck> {
    ok(state.enrollments().enrollment_status(&user, &id).await?)
}

async fn course_enrollments(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<Vec<EnrollmentSummary>> {
    ok(state.enrollments().list_for_course(&user, &id).await?)
}

async fn my_enrollments(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(query): AppQuery<EnrollmentListQuery>,
) -> ApiResult<Vec<EnrollmentSummary>> {
    ok(state.enrollments().list_for_user(&user, query.all).await?)
}

async fn instructor_students(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<EnrolledStudent>> {
    ok(state.enrollments().students_of_instructor(&user).await?)
}

async fn remove_student(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<RemovedStudent> {
    ok(state.enrollments().remove_student(&user, &id).await?)
}
