use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::routing::{get, patch, post, put};
use serde::Deserialize;

use super::response::{ApiResult, AppJson, AppPath, AppQuery, Created, created, ok};
use crate::error::AppError;
use crate::identity::Viewer;
use crate::models::*;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/mine", get(list_my_courses))
        .route(
            "/courses/{id}",
            get(course_detail).patch(update_course).delete(delete_course),
        )
        .route("/courses/{id}/publish", post(publish_course))
        .route("/courses/{id}/status", patch(set_course_status))
        .route("/courses/{id}/modules", get(list_modules).post(create_module))
        .route("/courses/{id}/modules/order", put(reorder_modules))
        .route("/modules/{id}", patch(update_module).delete(delete_module))
        .route("/modules/{id}/sections", get(list_sections).post(create_section))
        .route("/modules/{id}/sections/order", put(reorder_sections))
        .route("/sections/{id}", patch(update_section).delete(delete_section))
        .route("/sections/{id}/document", put(upload_document))
        .route("/sections/{id}/lessons", get(list_lessons).post(create_lesson))
        .route("/sections/{id}/lessons/order", put(reorder_lessons))
        .route("/lessons/{id}", patch(update_lesson).delete(delete_lesson))
        .route("/lessons/{id}/quiz", post(create_quiz))
        .route("/lessons/{id}/assignment", post(create_assignment))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    ok(state.catalog().list_categories().await?)
}

async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<NewCategoryRequest>,
) -> Created<Category> {
    let category = state.catalog().create_category(&user, req).await?;
    created(category)
}

async fn list_courses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CourseListQuery>,
) -> ApiResult<Vec<Course>> {
    ok(state.catalog().list_published(&query).await?)
}

async fn create_course(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<NewCourseRequest>,
) -> Created<Course> {
    let course = state.catalog().create_course(&user, req).await?;
    created(course)
}

async fn list_my_courses(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<Course>> {
    ok(state.catalog().list_mine(&user).await?)
}

async fn course_detail(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    AppPath(id): AppPath<String>,
) -> ApiResult<CourseDetail> {
    ok(state.catalog().course_detail(viewer.as_ref(), &id).await?)
}

async fn update_course(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> ApiResult<Course> {
    ok(state.catalog().update_course(&user, &id, req).await?)
}

async fn delete_course(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_course(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_course(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<Course> {
    ok(state.catalog().publish(&user, &id).await?)
}

async fn set_course_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<StatusUpdateRequest>,
) -> ApiResult<Course> {
    ok(state.catalog().set_status(&user, &id, req.status).await?)
}

async fn list_modules(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    AppPath(id): AppPath<String>,
) -> ApiResult<Vec<Module>> {
    // Visibility follows the course detail rules.
    state.catalog().course_detail(viewer.as_ref(), &id).await?;
    ok(state.catalog().list_modules(&id).await?)
}

async fn create_module(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<NewModuleRequest>,
) -> Created<Module> {
    let module = state.catalog().create_module(&user, &id, req).await?;
    created(module)
}

async fn reorder_modules(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<ReorderRequest>,
) -> ApiResult<Vec<Module>> {
    ok(state.catalog().reorder_modules(&user, &id, req.ids).await?)
}

async fn update_module(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<UpdateModuleRequest>,
) -> ApiResult<Module> {
    ok(state.catalog().update_module(&user, &id, req).await?)
}

async fn delete_module(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_module(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_sections(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    AppPath(id): AppPath<String>,
) -> ApiResult<Vec<Section>> {
    ok(state.catalog().list_sections(viewer.as_ref(), &id).await?)
}

async fn create_section(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<NewSectionRequest>,
) -> Created<Section> {
    let section = state.catalog().create_section(&user, &id, req).await?;
    created(section)
}

async fn reorder_sections(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<ReorderRequest>,
) -> ApiResult<Vec<Section>> {
    ok(state.catalog().reorder_sections(&user, &id, req.ids).await?)
}

async fn update_section(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<UpdateSectionRequest>,
) -> ApiResult<Section> {
    ok(state.catalog().update_section(&user, &id, req).await?)
}

async fn delete_section(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_section(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppQuery(params): AppQuery<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Section> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let filename = params.filename.as_deref().unwrap_or("document.pdf");

    ok(state
        .catalog()
        .attach_document(&user, &id, filename, content_type, body.to_vec())
        .await?)
}

async fn list_lessons(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    AppPath(id): AppPath<String>,
) -> ApiResult<Vec<Lesson>> {
    ok(state.catalog().list_lessons(viewer.as_ref(), &id).await?)
}

async fn create_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<NewLessonRequest>,
) -> Created<Lesson> {
    let lesson = state.catalog().create_lesson(&user, &id, req).await?;
    created(lesson)
}

async fn reorder_lessons(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<ReorderRequest>,
) -> ApiResult<Vec<Lesson>> {
    ok(state.catalog().reorder_lessons(&user, &id, req.ids).await?)
}

async fn update_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<UpdateLessonRequest>,
) -> ApiResult<Lesson> {
    ok(state.catalog().update_lesson(&user, &id, req).await?)
}

async fn delete_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_lesson(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_quiz(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<NewQuizRequest>,
) -> Created<Quiz> {
    let quiz = state.catalog().create_quiz(&user, &id, req).await?;
    created(quiz)
}

async fn create_assignment(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(req): AppJson<NewAssignmentRequest>,
) -> Created<Assignment> {
    let assignment = state.catalog().create_assignment(&user, &id, req).await?;
    created(assignment)
}
