use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LessonContentType {
    Video,
    Text,
    Quiz,
    Assignment,
    File,
    Audio,
    Interactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub description: String,
    pub content_type: LessonContentType,
    pub content: Json<Value>,
    #[serde(rename = "order")]
    pub position: i64,
    pub duration_minutes: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content_type: LessonContentType,
    #[serde(default)]
    pub content: Option<Value>,
    #[validate(range(min = 0, max = 10_000))]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_type: Option<LessonContentType>,
    pub content: Option<Value>,
    #[validate(range(min = 0, max = 10_000))]
    pub duration_minutes: Option<i64>,
}
