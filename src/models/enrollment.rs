use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
    Pending,
}

impl EnrollmentStatus {
    /// Statuses under which progress may still be recorded.
    pub fn can_record_progress(self) -> bool {
        matches!(self, EnrollmentStatus::Active | EnrollmentStatus::Completed)
    }
}

/// Which enrollments count when asking "is this user enrolled".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentScope {
    /// status = active
    Active,
    /// any status except dropped
    Standing,
    /// any row, dropped included
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub progress_percentage: f64,
    pub enrolled_at: String,
    pub completed_at: Option<String>,
    pub last_accessed_at: String,
}

/// Enrollment joined with the course title, for listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrollmentSummary {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub course_title: String,
    pub status: EnrollmentStatus,
    pub progress_percentage: f64,
    pub enrolled_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledStudent {
    pub user_id: String,
    pub courses: Vec<EnrolledCourseRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledCourseRef {
    pub course_id: String,
    pub course_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentCheck {
    pub enrolled: bool,
    pub has_ever_enrolled: bool,
    pub enrollment: Option<Enrollment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollOutcome {
    pub enrollment: Enrollment,
    pub reactivated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedStudent {
    pub user_id: String,
    pub enrollments_dropped: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentListQuery {
    #[serde(default)]
    pub all: bool,
}
