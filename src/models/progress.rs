use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::enrollment::EnrollmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Progress {
    pub enrollment_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub score: Option<f64>,
    pub attempts: i64,
    pub time_spent: i64,
    pub notes: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percentage: f64,
}

impl CourseProgress {
    pub fn new(total_lessons: i64, completed_lessons: i64) -> Self {
        Self {
            total_lessons,
            completed_lessons,
            percentage: percentage(completed_lessons, total_lessons),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons >= self.total_lessons
    }
}

/// completed / total * 100 rounded to two decimals; zero when there is nothing to complete.
pub fn percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    super::assessment::round2(completed as f64 / total as f64 * 100.0)
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SectionProgress {
    pub section_id: String,
    pub title: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    #[sqlx(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub enrollment_id: String,
    pub status: EnrollmentStatus,
    pub overall: CourseProgress,
    pub sections: Vec<SectionProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonCompletion {
    pub lesson_id: String,
    pub progress: CourseProgress,
    pub enrollment_status: EnrollmentStatus,
    pub course_completed: bool,
    pub next_lesson_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionCompletion {
    pub section_id: String,
    pub section_completed: bool,
    pub progress: CourseProgress,
    pub enrollment_status: EnrollmentStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ActivityRequest {
    #[validate(range(min = 0, max = 1440))]
    pub minutes: i64,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}
