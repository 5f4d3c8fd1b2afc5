use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    Review,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EnrollmentType {
    SelfService,
    Manual,
    Group,
}

/// `is_published` is not stored; the repository selects it as `status = 'published'`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub instructor_id: String,
    pub difficulty: Difficulty,
    pub price: f64,
    pub status: CourseStatus,
    pub is_published: bool,
    pub enrollment_type: EnrollmentType,
    pub max_students: Option<i64>,
    pub language: String,
    pub duration_in_weeks: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub enrollment_type: Option<EnrollmentType>,
    #[validate(range(min = 1, message = "max_students must be positive"))]
    pub max_students: Option<i64>,
    #[validate(length(min = 2, max = 10))]
    pub language: Option<String>,
    #[validate(range(min = 1, max = 520))]
    pub duration_in_weeks: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub enrollment_type: Option<EnrollmentType>,
    /// Absent keeps the current limit, `null` removes it.
    #[serde(default, deserialize_with = "present")]
    pub max_students: Option<Option<i64>>,
    #[validate(length(min = 2, max = 10))]
    pub language: Option<String>,
    #[validate(range(min = 1, max = 520))]
    pub duration_in_weeks: Option<i64>,
}

/// Marks a field that was sent, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: CourseStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub average_rating: f64,
    pub review_count: i64,
    pub total_lessons: i64,
    pub active_students: i64,
}
