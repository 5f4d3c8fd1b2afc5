use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::{catalog, enrollments, progress};
use crate::error::AppError;
use crate::models::content::{OutlineLesson, OutlineModule, OutlineSection};
use crate::models::{
    AuthUser, ContentDescriptor, Course, CourseOutline, DocumentPointer, Enrollment,
    QuizView, SectionContentType, VideoPointer,
};
use crate::storage::BlobStore;

/// Read-only access to course content. Every call takes the viewer
/// explicitly; nothing here writes.
pub struct ContentService {
    db: SqlitePool,
    storage: Arc<dyn BlobStore>,
}

impl ContentService {
    pub fn new(db: SqlitePool, storage: Arc<dyn BlobStore>) -> Self {
        Self { db, storage }
    }

    pub async fn resolve_section_content(
        &self,
        viewer: Option<&AuthUser>,
        section_id: &str,
    ) -> Result<ContentDescriptor, AppError> {
        let section = catalog::find_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))?;
        let course_id = catalog::course_id_for_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))?;
        self.authorize(viewer, &course_id).await?;

        let video = section.video_ref.as_deref().map(VideoPointer::from_ref);
        let document = section.document_ref.as_deref().map(|handle| DocumentPointer {
            handle: handle.to_string(),
            url: self.storage.resolve(handle),
        });
        let text = (section.content_type == SectionContentType::Text)
            .then(|| section.description.clone());

        debug!("Resolved {:?} content for section {}", section.content_type, section_id);
        Ok(ContentDescriptor {
            section_id: section.id,
            kind: section.content_type,
            video,
            document,
            text,
        })
    }

    /// Ordered module/section/lesson tree with the viewer's completion flags.
    pub async fn course_outline(
        &self,
        viewer: Option<&AuthUser>,
        course_id: &str,
    ) -> Result<CourseOutline, AppError> {
        let (course, enrollment) = self.authorize(viewer, course_id).await?;

        let completed: HashSet<String> = match &enrollment {
            Some(e) => progress::completed_lesson_ids(&self.db, &e.id)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        let modules = catalog::fetch_modules(&self.db, course_id).await?;
        let sections = catalog::fetch_sections_for_course(&self.db, course_id).await?;
        let lessons = catalog::fetch_lessons_for_course(&self.db, course_id).await?;

        let mut lessons_by_section: HashMap<String, Vec<OutlineLesson>> = HashMap::new();
        for lesson in lessons {
            lessons_by_section
                .entry(lesson.section_id.clone())
                .or_default()
                .push(OutlineLesson {
                    completed: completed.contains(&lesson.id),
                    id: lesson.id,
                    title: lesson.title,
                    order: lesson.position,
                    content_type: lesson.content_type,
                    duration_minutes: lesson.duration_minutes,
                });
        }

        let mut sections_by_module: HashMap<String, Vec<OutlineSection>> = HashMap::new();
        for section in sections {
            let lessons = lessons_by_section.remove(&section.id).unwrap_or_default();
            let section_done = !lessons.is_empty() && lessons.iter().all(|l| l.completed);
            sections_by_module
                .entry(section.module_id.clone())
                .or_default()
                .push(OutlineSection {
                    id: section.id,
                    title: section.title,
                    order: section.position,
                    content_type: section.content_type,
                    completed: section_done,
                    lessons,
                });
        }

        let modules = modules
            .into_iter()
            .map(|module| OutlineModule {
                sections: sections_by_module.remove(&module.id).unwrap_or_default(),
                id: module.id,
                title: module.title,
                order: module.position,
            })
            .collect();

        Ok(CourseOutline {
            course_id: course.id,
            title: course.title,
            modules,
        })
    }

    /// Quiz without its answers, for learners taking it.
    pub async fn quiz_for_learner(
        &self,
        viewer: Option<&AuthUser>,
        quiz_id: &str,
    ) -> Result<QuizView, AppError> {
        let quiz = catalog::find_quiz(&self.db, quiz_id)
            .await?
            .ok_or_else(|| AppError::not_found("Quiz"))?;
        let course_id = catalog::course_id_for_lesson(&self.db, &quiz.lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Quiz"))?;
        self.authorize(viewer, &course_id).await?;
        Ok(QuizView::from(quiz))
    }

    async fn authorize(
        &self,
        viewer: Option<&AuthUser>,
        course_id: &str,
    ) -> Result<(Course, Option<Enrollment>), AppError> {
        authorize_viewer(&self.db, viewer, course_id).await
    }
}

/// Owners and admins always pass. Everyone else needs a published course
/// and an active or completed enrollment. Only reads.
pub(crate) async fn authorize_viewer(
    db: &SqlitePool,
    viewer: Option<&AuthUser>,
    course_id: &str,
) -> Result<(Course, Option<Enrollment>), AppError> {
    let viewer = viewer.ok_or(AppError::Unauthenticated)?;
    let course = catalog::find_course(db, course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Course"))?;

    let enrollment = enrollments::find_enrollment(db, &viewer.id, course_id).await?;
    if viewer.can_manage(&course.instructor_id) {
        return Ok((course, enrollment));
    }
    if !course.is_published {
        return Err(AppError::not_found("Course"));
    }

    match enrollment {
        Some(e) if e.status.can_record_progress() => Ok((course, Some(e))),
        _ => {
            warn!("User {} denied content of course {}", viewer.id, course_id);
            Err(AppError::NotEnrolled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_test_db;
    use crate::models::{NewSectionRequest, Role};
    use crate::services::testing::{self, instructor, student};
    use crate::services::{CatalogService, EnrollmentService, ProgressService};
    use crate::storage::MemoryBlobStore;

    fn service(pool: &SqlitePool) -> ContentService {
        ContentService::new(pool.clone(), Arc::new(MemoryBlobStore::new()))
    }

    #[tokio::test]
    async fn test_anonymous_and_unenrolled_viewers_are_refused() {
        let pool = setup_test_db().await;
        let svc = service(&pool);
        let fixture = testing::course_with_lessons(&pool, &[1]).await;
        testing::publish(&pool, &fixture.course_id).await;

        let err = svc
            .resolve_section_content(None, &fixture.section_ids[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));

        let err = svc
            .resolve_section_content(Some(&student("alice")), &fixture.section_ids[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotEnrolled));
    }

    #[tokio::test]
    async fn test_unpublished_content_is_hidden() {
        let pool = setup_test_db().await;
        let svc = service(&pool);
        let fixture = testing::course_with_lessons(&pool, &[1]).await;

        let err = svc
            .course_outline(Some(&student("alice")), &fixture.course_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let outline = svc
            .course_outline(Some(&instructor()), &fixture.course_id)
            .await
            .unwrap();
        assert_eq!(outline.modules.len(), 1);
    }

    #[tokio::test]
    async fn test_enrolled_student_sees_video_and_text() {
        let pool = setup_test_db().await;
        let storage = Arc::new(MemoryBlobStore::new());
        let catalog_svc = CatalogService::new(pool.clone(), storage.clone());
        let svc = ContentService::new(pool.clone(), storage);
        let fixture = testing::course_with_lessons(&pool, &[1]).await;
        testing::publish(&pool, &fixture.course_id).await;

        let video_section = catalog_svc
            .create_section(
                &instructor(),
                &fixture.module_id,
                NewSectionRequest {
                    title: "Watch".to_string(),
                    description: String::new(),
                    content_type: None,
                    video: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
                    document_ref: None,
                },
            )
            .await
            .unwrap();
        EnrollmentService::new(pool.clone())
            .enroll(&student("alice"), &fixture.course_id)
            .await
            .unwrap();

        let content = svc
            .resolve_section_content(Some(&student("alice")), &video_section.id)
            .await
            .unwrap();
        assert_eq!(content.kind, SectionContentType::Video);
        assert_eq!(content.video.unwrap().id.as_deref(), Some("dQw4w9WgXcQ"));
        assert!(content.document.is_none());

        let text = svc
            .resolve_section_content(Some(&student("alice")), &fixture.section_ids[0])
            .await
            .unwrap();
        assert_eq!(text.kind, SectionContentType::Text);
        assert!(text.text.is_some());
    }

    #[tokio::test]
    async fn test_outline_carries_completion_flags() {
        let pool = setup_test_db().await;
        let svc = service(&pool);
        let fixture = testing::course_with_lessons(&pool, &[1, 2]).await;
        testing::publish(&pool, &fixture.course_id).await;
        let alice = student("alice");
        EnrollmentService::new(pool.clone())
            .enroll(&alice, &fixture.course_id)
            .await
            .unwrap();
        ProgressService::new(pool.clone())
            .mark_lesson_complete(&alice, &fixture.lesson_ids[0])
            .await
            .unwrap();

        let outline = svc.course_outline(Some(&alice), &fixture.course_id).await.unwrap();
        let sections = &outline.modules[0].sections;
        assert_eq!(sections.len(), 2);
        assert!(sections[0].completed);
        assert!(sections[0].lessons[0].completed);
        assert!(!sections[1].completed);
        assert_eq!(sections[1].lessons.len(), 2);
        assert_eq!(sections[1].lessons[1].order, 2);
    }

    #[tokio::test]
    async fn test_admin_reads_quiz_without_answers() {
        let pool = setup_test_db().await;
        let svc = service(&pool);
        let fixture = testing::course_with_lessons(&pool, &[1]).await;
        let quiz = catalog::insert_quiz(&pool, &fixture.lesson_ids[0], "Check", 70.0, None, &[])
            .await
            .unwrap();

        let admin = AuthUser::new("root", Role::Admin);
        let view = svc.quiz_for_learner(Some(&admin), &quiz.id).await.unwrap();
        assert_eq!(view.title, "Check");
    }

    #[tokio::test]
    async fn test_reading_content_leaves_enrollment_untouched() {
        let pool = setup_test_db().await;
        let svc = service(&pool);
        let fixture = testing::course_with_lessons(&pool, &[1]).await;
        testing::publish(&pool, &fixture.course_id).await;
        let alice = student("alice");
        let before = EnrollmentService::new(pool.clone())
            .enroll(&alice, &fixture.course_id)
            .await
            .unwrap()
            .enrollment;

        svc.resolve_section_content(Some(&alice), &fixture.section_ids[0])
            .await
            .unwrap();
        svc.course_outline(Some(&alice), &fixture.course_id).await.unwrap();

        let after = enrollments::find_enrollment_by_id(&pool, &before.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.last_accessed_at, before.last_accessed_at);
    }
}
