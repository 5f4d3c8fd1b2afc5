use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{catalog, enrollments, progress};
use crate::error::{AppError, map_unique_violation};
use crate::models::{
    AuthUser, CourseProgress, EnrolledStudent, EnrollmentCheck, EnrollmentScope, EnrollmentStatus,
    EnrollmentSummary, EnrollmentType, EnrollOutcome, Enrollment, RemovedStudent,
};
use crate::models::enrollment::EnrolledCourseRef;

pub struct EnrollmentService {
    db: SqlitePool,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Enrolls `user` in a published self-service course.
    ///
    /// A dropped enrollment is reactivated in place, so a (user, course) pair
    /// never has more than one row. Progress rows are seeded for every lesson
    /// the course has right now.
    pub async fn enroll(&self, user: &AuthUser, course_id: &str) -> Result<EnrollOutcome, AppError> {
        let mut tx = self.db.begin().await?;

        let course = catalog::find_course(&mut *tx, course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))?;
        if !course.is_published {
            return Err(AppError::NotPublished);
        }
        if course.enrollment_type != EnrollmentType::SelfService {
            return Err(AppError::EnrollmentType);
        }

        let existing = enrollments::find_enrollment(&mut *tx, &user.id, course_id).await?;
        let (enrollment, reactivated) = match existing {
            Some(e) if matches!(e.status, EnrollmentStatus::Active | EnrollmentStatus::Pending) => {
                return Err(AppError::Conflict("already enrolled in this course".to_string()));
            }
            Some(e) if e.status == EnrollmentStatus::Completed => {
                return Err(AppError::Conflict("course already completed".to_string()));
            }
            Some(e) => {
                let enrollment =
                    enrollments::reactivate(&mut tx, &e.id, course_id, course.max_students)
                        .await?
                        .ok_or(AppError::Capacity)?;
                (enrollment, true)
            }
            None => {
                let enrollment =
                    enrollments::insert_active(&mut tx, &user.id, course_id, course.max_students)
                        .await
                        .map_err(|e| {
                            map_unique_violation(
                                e,
                                AppError::Conflict("already enrolled in this course".to_string()),
                            )
                        })?
                        .ok_or(AppError::Capacity)?;
                (enrollment, false)
            }
        };

        let seeded = progress::seed_for_course(&mut *tx, &enrollment.id, course_id).await?;
        if reactivated {
            let (total, completed) =
                progress::course_counts(&mut *tx, &enrollment.id, course_id).await?;
            let aggregate = CourseProgress::new(total, completed);
            enrollments::store_progress(
                &mut *tx,
                &enrollment.id,
                aggregate.percentage,
                aggregate.is_complete(),
            )
            .await?;
        }
        let enrollment = enrollments::find_enrollment_by_id(&mut *tx, &enrollment.id)
            .await?
            .ok_or_else(|| AppError::not_found("Enrollment"))?;
        tx.commit().await?;

        info!(
            "User {} enrolled in course {} (reactivated: {}, {} progress rows seeded)",
            user.id, course_id, reactivated, seeded
        );
        Ok(EnrollOutcome {
            enrollment,
            reactivated,
        })
    }

    /// Marks the enrollment dropped. Dropping twice is a no-op.
    pub async fn unenroll(&self, user: &AuthUser, course_id: &str) -> Result<Enrollment, AppError> {
        let enrollment = enrollments::find_enrollment(&self.db, &user.id, course_id)
            .await?
            .ok_or(AppError::NotEnrolled)?;
        if enrollment.status == EnrollmentStatus::Dropped {
            return Ok(enrollment);
        }

        enrollments::set_status(&self.db, &enrollment.id, EnrollmentStatus::Dropped).await?;
        info!("User {} dropped course {}", user.id, course_id);

        enrollments::find_enrollment_by_id(&self.db, &enrollment.id)
            .await?
            .ok_or_else(|| AppError::not_found("Enrollment"))
    }

    pub async fn is_actively_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool, AppError> {
        Ok(enrollments::exists(&self.db, user_id, course_id, EnrollmentScope::Active).await?)
    }

    /// Any enrollment that has not been dropped.
    pub async fn is_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool, AppError> {
        Ok(enrollments::exists(&self.db, user_id, course_id, EnrollmentScope::Standing).await?)
    }

    /// True once an enrollment row exists, dropped ones included.
    pub async fn has_ever_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool, AppError> {
        Ok(enrollments::exists(&self.db, user_id, course_id, EnrollmentScope::Any).await?)
    }

    pub async fn enrollment_status(
        &self,
        user: &AuthUser,
        course_id: &str,
    ) -> Result<EnrollmentCheck, AppError> {
        let enrollment = enrollments::find_enrollment(&self.db, &user.id, course_id).await?;
        Ok(EnrollmentCheck {
            enrolled: enrollment
                .as_ref()
                .is_some_and(|e| e.status == EnrollmentStatus::Active),
            has_ever_enrolled: enrollment.is_some(),
            enrollment,
        })
    }

    pub async fn list_for_user(
        &self,
        user: &AuthUser,
        include_all: bool,
    ) -> Result<Vec<EnrollmentSummary>, AppError> {
        Ok(enrollments::fetch_for_user(&self.db, &user.id, include_all).await?)
    }

    pub async fn list_for_course(
        &self,
        user: &AuthUser,
        course_id: &str,
    ) -> Result<Vec<EnrollmentSummary>, AppError> {
        let course = catalog::find_course(&self.db, course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))?;
        if !user.can_manage(&course.instructor_id) {
            return Err(AppError::Permission(
                "only the course instructor or an admin can list enrollments".to_string(),
            ));
        }
        Ok(enrollments::fetch_for_course(&self.db, course_id).await?)
    }

    /// Students with an active enrollment in any of the caller's courses.
    pub async fn students_of_instructor(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<EnrolledStudent>, AppError> {
        if !user.can_author() {
            return Err(AppError::Permission("instructors only".to_string()));
        }

        let rows = enrollments::fetch_students_of_instructor(&self.db, &user.id).await?;
        let mut students: Vec<EnrolledStudent> = Vec::new();
        for row in rows {
            let course = EnrolledCourseRef {
                course_id: row.course_id,
                course_title: row.course_title,
            };
            match students.last_mut() {
                Some(last) if last.user_id == row.user_id => last.courses.push(course),
                _ => students.push(EnrolledStudent {
                    user_id: row.user_id,
                    courses: vec![course],
                }),
            }
        }
        Ok(students)
    }

    pub async fn remove_student(
        &self,
        user: &AuthUser,
        student_id: &str,
    ) -> Result<RemovedStudent, AppError> {
        if !user.can_author() {
            return Err(AppError::Permission("instructors only".to_string()));
        }

        let dropped =
            enrollments::drop_student_from_instructor(&self.db, &user.id, student_id).await?;
        if dropped == 0 {
            warn!("Instructor {} has no active student {}", user.id, student_id);
            return Err(AppError::not_found("Student"));
        }

        info!(
            "Instructor {} removed student {} from {} course(s)",
            user.id, student_id, dropped
        );
        Ok(RemovedStudent {
            user_id: student_id.to_string(),
            enrollments_dropped: dropped,
        })
    }
}
