use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::db::{catalog, enrollments, progress};
use crate::error::AppError;
use crate::models::progress::percentage;
use crate::models::{
    ActivityRequest, AuthUser, CourseProgress, Enrollment, EnrollmentStatus, LessonCompletion,
    Progress, ProgressReport, QuizResult, QuizSubmission, SectionCompletion, SectionProgress,
};

pub struct ProgressService {
    db: SqlitePool,
}

impl ProgressService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Marks one lesson completed and recomputes the course aggregate. The
    /// enrollment flips to completed once every lesson is done.
    pub async fn mark_lesson_complete(
        &self,
        user: &AuthUser,
        lesson_id: &str,
    ) -> Result<LessonCompletion, AppError> {
        let mut tx = self.db.begin().await?;
        let course_id = catalog::course_id_for_lesson(&mut *tx, lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lesson"))?;
        let enrollment = writable_enrollment(&mut tx, &user.id, &course_id).await?;

        progress::upsert_completed(&mut *tx, &enrollment.id, lesson_id).await?;
        let (progress, status) = refresh(&mut tx, &enrollment.id, &course_id).await?;

        let ordered = catalog::fetch_lessons_for_course(&mut *tx, &course_id).await?;
        let next_lesson_id = ordered
            .iter()
            .position(|l| l.id == lesson_id)
            .and_then(|i| ordered.get(i + 1))
            .map(|l| l.id.clone());
        tx.commit().await?;

        debug!(
            "User {} completed lesson {} ({}%)",
            user.id, lesson_id, progress.percentage
        );
        let course_completed = status == EnrollmentStatus::Completed;
        if course_completed && enrollment.status != EnrollmentStatus::Completed {
            info!("User {} completed course {}", user.id, course_id);
        }

        Ok(LessonCompletion {
            lesson_id: lesson_id.to_string(),
            progress,
            enrollment_status: status,
            course_completed,
            next_lesson_id,
        })
    }

    /// Applies lesson completion to every lesson of the section in one write.
    pub async fn mark_section_complete(
        &self,
        user: &AuthUser,
        section_id: &str,
    ) -> Result<SectionCompletion, AppError> {
        let mut tx = self.db.begin().await?;
        let course_id = catalog::course_id_for_section(&mut *tx, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))?;
        let enrollment = writable_enrollment(&mut tx, &user.id, &course_id).await?;

        let lessons = catalog::fetch_lessons(&mut *tx, section_id).await?;
        for lesson in &lessons {
            progress::upsert_completed(&mut *tx, &enrollment.id, &lesson.id).await?;
        }
        let (progress, status) = refresh(&mut tx, &enrollment.id, &course_id).await?;
        let (total, completed) = progress::section_counts(&mut *tx, &enrollment.id, section_id).await?;
        tx.commit().await?;

        info!(
            "User {} completed section {} ({} lessons)",
            user.id,
            section_id,
            lessons.len()
        );
        Ok(SectionCompletion {
            section_id: section_id.to_string(),
            section_completed: total > 0 && completed >= total,
            progress,
            enrollment_status: status,
        })
    }

    /// Records a quiz attempt graded against the stored answers. Any recorded
    /// attempt completes the lesson; `passed` only reports the threshold.
    pub async fn record_quiz_result(
        &self,
        user: &AuthUser,
        quiz_id: &str,
        submission: QuizSubmission,
    ) -> Result<QuizResult, AppError> {
        let mut tx = self.db.begin().await?;
        let quiz = catalog::find_quiz(&mut *tx, quiz_id)
            .await?
            .ok_or_else(|| AppError::not_found("Quiz"))?;
        let course_id = catalog::course_id_for_lesson(&mut *tx, &quiz.lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lesson"))?;
        let enrollment = writable_enrollment(&mut tx, &user.id, &course_id).await?;

        let score = quiz.grade(&submission.answers);
        let passed = quiz.passed(score);

        let recorded = progress::upsert_quiz_attempt(
            &mut *tx,
            &enrollment.id,
            &quiz.lesson_id,
            score,
            true,
            quiz.max_attempts,
        )
        .await?;
        if !recorded {
            warn!("User {} exhausted attempts on quiz {}", user.id, quiz_id);
            return Err(AppError::Conflict("maximum quiz attempts reached".to_string()));
        }

        let attempts = progress::find_progress(&mut *tx, &enrollment.id, &quiz.lesson_id)
            .await?
            .map(|p| p.attempts)
            .unwrap_or(1);
        let (progress, _) = refresh(&mut tx, &enrollment.id, &course_id).await?;
        tx.commit().await?;

        info!(
            "User {} scored {} on quiz {} (passed: {}, attempt {})",
            user.id, score, quiz_id, passed, attempts
        );
        Ok(QuizResult {
            quiz_id: quiz.id,
            score,
            passed,
            attempts,
            progress,
        })
    }

    pub async fn record_time_spent(
        &self,
        user: &AuthUser,
        lesson_id: &str,
        req: ActivityRequest,
    ) -> Result<Progress, AppError> {
        req.validate()?;

        let mut tx = self.db.begin().await?;
        let course_id = catalog::course_id_for_lesson(&mut *tx, lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lesson"))?;
        let enrollment = writable_enrollment(&mut tx, &user.id, &course_id).await?;

        progress::record_activity(
            &mut *tx,
            &enrollment.id,
            lesson_id,
            req.minutes,
            req.notes.as_deref(),
        )
        .await?;
        enrollments::touch(&mut *tx, &enrollment.id).await?;
        let row = progress::find_progress(&mut *tx, &enrollment.id, lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Progress"))?;
        tx.commit().await?;

        Ok(row)
    }

    /// Live aggregate for the caller's enrollment in the course.
    pub async fn course_progress(
        &self,
        user: &AuthUser,
        course_id: &str,
    ) -> Result<ProgressReport, AppError> {
        let enrollment = enrollments::find_enrollment(&self.db, &user.id, course_id)
            .await?
            .ok_or(AppError::NotEnrolled)?;

        let (total, completed) =
            progress::course_counts(&self.db, &enrollment.id, course_id).await?;
        let sections = self.section_progress_for(&enrollment.id, course_id).await?;

        Ok(ProgressReport {
            enrollment_id: enrollment.id,
            status: enrollment.status,
            overall: CourseProgress::new(total, completed),
            sections,
        })
    }

    pub async fn section_progress(
        &self,
        user: &AuthUser,
        course_id: &str,
    ) -> Result<Vec<SectionProgress>, AppError> {
        let enrollment = enrollments::find_enrollment(&self.db, &user.id, course_id)
            .await?
            .ok_or(AppError::NotEnrolled)?;
        self.section_progress_for(&enrollment.id, course_id).await
    }

    /// True iff the section has lessons and every one of them is completed.
    pub async fn section_completion(
        &self,
        user: &AuthUser,
        section_id: &str,
    ) -> Result<bool, AppError> {
        let course_id = catalog::course_id_for_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))?;
        let enrollment = enrollments::find_enrollment(&self.db, &user.id, &course_id)
            .await?
            .ok_or(AppError::NotEnrolled)?;

        let (total, completed) =
            progress::section_counts(&self.db, &enrollment.id, section_id).await?;
        Ok(total > 0 && completed >= total)
    }

    async fn section_progress_for(
        &self,
        enrollment_id: &str,
        course_id: &str,
    ) -> Result<Vec<SectionProgress>, AppError> {
        let mut sections =
            progress::section_progress_for_course(&self.db, enrollment_id, course_id).await?;
        for section in &mut sections {
            section.percentage = percentage(section.completed_lessons, section.total_lessons);
        }
        Ok(sections)
    }
}

/// Progress can only be written under an active or completed enrollment.
async fn writable_enrollment(
    conn: &mut SqliteConnection,
    user_id: &str,
    course_id: &str,
) -> Result<Enrollment, AppError> {
    let enrollment = enrollments::find_enrollment(&mut *conn, user_id, course_id)
        .await?
        .ok_or(AppError::NotEnrolled)?;
    if !enrollment.status.can_record_progress() {
        warn!(
            "User {} tried to record progress on a {:?} enrollment",
            user_id, enrollment.status
        );
        return Err(AppError::NotEnrolled);
    }
    Ok(enrollment)
}

/// Recomputes and caches the percentage; returns it with the resulting status.
async fn refresh(
    conn: &mut SqliteConnection,
    enrollment_id: &str,
    course_id: &str,
) -> Result<(CourseProgress, EnrollmentStatus), AppError> {
    let (total, completed) = progress::course_counts(&mut *conn, enrollment_id, course_id).await?;
    let aggregate = CourseProgress::new(total, completed);
    enrollments::store_progress(
        &mut *conn,
        enrollment_id,
        aggregate.percentage,
        aggregate.is_complete(),
    )
    .await?;

    let status = enrollments::find_enrollment_by_id(&mut *conn, enrollment_id)
        .await?
        .map(|e| e.status)
        .ok_or_else(|| AppError::not_found("Enrollment"))?;
    Ok((aggregate, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_test_db;
    use crate::models::{LessonContentType, QuizQuestion};
    use crate::services::EnrollmentService;
    use crate::services::testing::{self, Fixture, student};
    use serde_json::json;

    async fn enrolled(pool: &SqlitePool, lessons: &[usize]) -> Fixture {
        let fixture = testing::course_with_lessons(pool, lessons).await;
        testing::publish(pool, &fixture.course_id).await;
        EnrollmentService::new(pool.clone())
            .enroll(&student("alice"), &fixture.course_id)
            .await
            .expect("Failed to enroll");
        fixture
    }

    #[tokio::test]
    async fn test_three_lesson_course_completes_on_last_lesson() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[2, 1]).await;
        let alice = student("alice");

        let first = svc.mark_lesson_complete(&alice, &fixture.lesson_ids[0]).await.unwrap();
        assert_eq!(first.next_lesson_id.as_deref(), Some(fixture.lesson_ids[1].as_str()));

        let second = svc.mark_lesson_complete(&alice, &fixture.lesson_ids[1]).await.unwrap();
        assert_eq!(second.progress.percentage, 66.67);
        assert_eq!(second.enrollment_status, EnrollmentStatus::Active);
        assert_eq!(second.next_lesson_id.as_deref(), Some(fixture.lesson_ids[2].as_str()));

        let third = svc.mark_lesson_complete(&alice, &fixture.lesson_ids[2]).await.unwrap();
        assert_eq!(third.progress.percentage, 100.0);
        assert_eq!(third.enrollment_status, EnrollmentStatus::Completed);
        assert!(third.course_completed);
        assert!(third.next_lesson_id.is_none());

        let enrollment = enrollments::find_enrollment(&pool, "alice", &fixture.course_id)
            .await
            .unwrap()
            .unwrap();
        assert!(enrollment.completed_at.is_some());
        assert_eq!(enrollment.progress_percentage, 100.0);
    }

    #[tokio::test]
    async fn test_marking_twice_does_not_double_count() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[3]).await;
        let alice = student("alice");

        svc.mark_lesson_complete(&alice, &fixture.lesson_ids[0]).await.unwrap();
        let again = svc.mark_lesson_complete(&alice, &fixture.lesson_ids[0]).await.unwrap();
        assert_eq!(again.progress.completed_lessons, 1);
        assert_eq!(again.progress.percentage, 33.33);
    }

    #[tokio::test]
    async fn test_empty_course_reports_zero() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[]).await;

        let report = svc.course_progress(&student("alice"), &fixture.course_id).await.unwrap();
        assert_eq!(report.overall.total_lessons, 0);
        assert_eq!(report.overall.percentage, 0.0);
        assert_eq!(report.status, EnrollmentStatus::Active);
    }

    #[tokio::test]
    async fn test_late_lesson_counts_as_not_started() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[1]).await;
        let alice = student("alice");

        svc.mark_lesson_complete(&alice, &fixture.lesson_ids[0]).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let content = json!({});
        catalog::insert_lesson(
            &mut conn,
            &fixture.section_ids[0],
            catalog::LessonRow {
                title: "Bonus",
                description: "",
                content_type: LessonContentType::Text,
                content: &content,
                duration_minutes: 5,
            },
        )
        .await
        .unwrap();
        drop(conn);

        let report = svc.course_progress(&alice, &fixture.course_id).await.unwrap();
        assert_eq!(report.overall.total_lessons, 2);
        assert_eq!(report.overall.percentage, 50.0);
        assert_eq!(report.sections[0].percentage, 50.0);
    }

    #[tokio::test]
    async fn test_section_completion_marks_every_lesson() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[2, 2]).await;
        let alice = student("alice");

        assert!(!svc.section_completion(&alice, &fixture.section_ids[0]).await.unwrap());
        let result = svc.mark_section_complete(&alice, &fixture.section_ids[0]).await.unwrap();
        assert!(result.section_completed);
        assert_eq!(result.progress.percentage, 50.0);
        assert!(svc.section_completion(&alice, &fixture.section_ids[0]).await.unwrap());
        assert!(!svc.section_completion(&alice, &fixture.section_ids[1]).await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_enrollment_cannot_record_progress() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[1]).await;
        let alice = student("alice");
        EnrollmentService::new(pool.clone())
            .unenroll(&alice, &fixture.course_id)
            .await
            .unwrap();

        let err = svc.mark_lesson_complete(&alice, &fixture.lesson_ids[0]).await.unwrap_err();
        assert!(matches!(err, AppError::NotEnrolled));
        let err = svc
            .mark_lesson_complete(&student("bob"), &fixture.lesson_ids[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotEnrolled));
    }

    #[tokio::test]
    async fn test_quiz_grading_and_attempt_limit() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[2]).await;
        let alice = student("alice");

        let questions = vec![
            QuizQuestion {
                prompt: "2 + 2".to_string(),
                options: vec!["3".to_string(), "4".to_string()],
                answer: json!("4"),
                points: 1.0,
            },
            QuizQuestion {
                prompt: "Borrow checker?".to_string(),
                options: vec![],
                answer: json!(true),
                points: 1.0,
            },
        ];
        let quiz = catalog::insert_quiz(&pool, &fixture.lesson_ids[1], "Check", 70.0, Some(2), &questions)
            .await
            .unwrap();

        let failed = svc
            .record_quiz_result(
                &alice,
                &quiz.id,
                QuizSubmission {
                    answers: vec![json!("4"), json!(false)],
                },
            )
            .await
            .unwrap();
        assert_eq!(failed.score, 50.0);
        assert!(!failed.passed);
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.progress.completed_lessons, 1);

        let passed = svc
            .record_quiz_result(
                &alice,
                &quiz.id,
                QuizSubmission {
                    answers: vec![json!("4"), json!(true)],
                },
            )
            .await
            .unwrap();
        assert_eq!(passed.score, 100.0);
        assert!(passed.passed);
        assert_eq!(passed.attempts, 2);

        let err = svc
            .record_quiz_result(
                &alice,
                &quiz.id,
                QuizSubmission {
                    answers: vec![json!("4"), json!(true)],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_client_supplied_score_is_ignored() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[1]).await;

        let questions = vec![QuizQuestion {
            prompt: "2 + 2".to_string(),
            options: vec![],
            answer: json!("4"),
            points: 1.0,
        }];
        let quiz = catalog::insert_quiz(&pool, &fixture.lesson_ids[0], "Check", 70.0, None, &questions)
            .await
            .unwrap();

        let submission: QuizSubmission =
            serde_json::from_value(json!({ "score": 100, "answers": ["5"] })).unwrap();
        let result = svc
            .record_quiz_result(&student("alice"), &quiz.id, submission)
            .await
            .unwrap();
        assert_eq!(result.score, 0.0);
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_time_spent_accumulates() {
        let pool = setup_test_db().await;
        let svc = ProgressService::new(pool.clone());
        let fixture = enrolled(&pool, &[1]).await;
        let alice = student("alice");

        let req = |minutes| ActivityRequest {
            minutes,
            notes: None,
        };
        svc.record_time_spent(&alice, &fixture.lesson_ids[0], req(20)).await.unwrap();
        let row = svc.record_time_spent(&alice, &fixture.lesson_ids[0], req(15)).await.unwrap();
        assert_eq!(row.time_spent, 35);
        assert!(!row.completed);
    }
}
