use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::catalog::{self, ChildKind, CourseRow, LessonRow, SectionRow};
use crate::db::{enrollments, reviews};
use crate::error::{AppError, map_unique_violation};
use crate::models::assessment::round2;
use crate::models::category::DEFAULT_CATEGORIES;
use crate::models::section::{non_empty, normalize_video_ref};
use crate::models::{
    Assignment, AuthUser, Category, Course, CourseDetail, CourseListQuery, CourseStatus,
    Difficulty, EnrollmentType, Lesson, LessonContentType, Module, NewAssignmentRequest,
    NewCategoryRequest, NewCourseRequest, NewLessonRequest, NewModuleRequest, NewQuizRequest,
    NewSectionRequest, Quiz, Section, SectionContentType, UpdateCourseRequest,
    UpdateLessonRequest, UpdateModuleRequest, UpdateSectionRequest,
};
use crate::services::content_service::authorize_viewer;
use crate::storage::BlobStore;

const DEFAULT_PASSING_SCORE: f64 = 70.0;
const DEFAULT_MAX_SCORE: i64 = 100;
const DEFAULT_LESSON_MINUTES: i64 = 30;

pub struct CatalogService {
    db: SqlitePool,
    storage: Arc<dyn BlobStore>,
}

impl CatalogService {
    pub fn new(db: SqlitePool, storage: Arc<dyn BlobStore>) -> Self {
        Self { db, storage }
    }

    // -----------------------------------------------------------------------
    // categories

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(catalog::fetch_categories(&self.db).await?)
    }

    pub async fn create_category(
        &self,
        user: &AuthUser,
        req: NewCategoryRequest,
    ) -> Result<Category, AppError> {
        if !user.is_admin() {
            return Err(AppError::Permission("only admins can create categories".to_string()));
        }
        req.validate()?;

        let category = catalog::insert_category(&self.db, req.name.trim(), &req.description).await?;
        info!("Created category {} ({})", category.name, category.id);
        Ok(category)
    }

    /// Inserts the default category set when the table is empty.
    pub async fn seed_default_categories(&self) -> Result<usize, AppError> {
        let mut tx = self.db.begin().await?;
        if catalog::count_categories(&mut *tx).await? > 0 {
            return Ok(0);
        }
        for (name, description) in DEFAULT_CATEGORIES {
            catalog::insert_category(&mut *tx, name, description).await?;
        }
        tx.commit().await?;

        info!("Seeded {} default categories", DEFAULT_CATEGORIES.len());
        Ok(DEFAULT_CATEGORIES.len())
    }

    // -----------------------------------------------------------------------
    // courses

    pub async fn create_course(
        &self,
        user: &AuthUser,
        req: NewCourseRequest,
    ) -> Result<Course, AppError> {
        if !user.can_author() {
            return Err(AppError::Permission(
                "only instructors can create courses".to_string(),
            ));
        }
        req.validate()?;
        self.require_category(&req.category_id).await?;

        let language = req.language.unwrap_or_else(|| "en".to_string());
        let row = CourseRow {
            title: req.title.trim(),
            description: &req.description,
            category_id: &req.category_id,
            difficulty: req.difficulty.unwrap_or(Difficulty::Beginner),
            price: req.price.unwrap_or(0.0),
            enrollment_type: req.enrollment_type.unwrap_or(EnrollmentType::SelfService),
            max_students: req.max_students,
            language: &language,
            duration_in_weeks: req.duration_in_weeks.unwrap_or(1),
        };

        let mut conn = self.db.acquire().await?;
        let course = catalog::insert_course(&mut conn, &user.id, row).await?;
        info!("Instructor {} created course {}", user.id, course.id);
        Ok(course)
    }

    pub async fn update_course(
        &self,
        user: &AuthUser,
        course_id: &str,
        req: UpdateCourseRequest,
    ) -> Result<Course, AppError> {
        req.validate()?;
        if matches!(req.max_students, Some(Some(limit)) if limit < 1) {
            return Err(AppError::Validation("max_students must be positive".to_string()));
        }
        let course = self.managed_course(user, course_id).await?;

        let category_id = req.category_id.unwrap_or(course.category_id);
        self.require_category(&category_id).await?;

        let title = req.title.unwrap_or(course.title);
        let description = req.description.unwrap_or(course.description);
        let language = req.language.unwrap_or(course.language);
        let row = CourseRow {
            title: title.trim(),
            description: &description,
            category_id: &category_id,
            difficulty: req.difficulty.unwrap_or(course.difficulty),
            price: req.price.unwrap_or(course.price),
            enrollment_type: req.enrollment_type.unwrap_or(course.enrollment_type),
            max_students: req.max_students.unwrap_or(course.max_students),
            language: &language,
            duration_in_weeks: req.duration_in_weeks.unwrap_or(course.duration_in_weeks),
        };

        let mut conn = self.db.acquire().await?;
        catalog::update_course(&mut conn, course_id, row)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))
    }

    pub async fn delete_course(&self, user: &AuthUser, course_id: &str) -> Result<(), AppError> {
        self.managed_course(user, course_id).await?;
        catalog::delete_course(&self.db, course_id).await?;
        info!("Course {} deleted by {}", course_id, user.id);
        Ok(())
    }

    pub async fn set_status(
        &self,
        user: &AuthUser,
        course_id: &str,
        status: CourseStatus,
    ) -> Result<Course, AppError> {
        self.managed_course(user, course_id).await?;
        catalog::set_course_status(&self.db, course_id, status).await?;
        info!("Course {} moved to {:?} by {}", course_id, status, user.id);

        catalog::find_course(&self.db, course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))
    }

    pub async fn publish(&self, user: &AuthUser, course_id: &str) -> Result<Course, AppError> {
        self.set_status(user, course_id, CourseStatus::Published).await
    }

    pub async fn list_published(&self, query: &CourseListQuery) -> Result<Vec<Course>, AppError> {
        Ok(catalog::fetch_published_courses(&self.db, query).await?)
    }

    pub async fn list_mine(&self, user: &AuthUser) -> Result<Vec<Course>, AppError> {
        Ok(catalog::fetch_courses_by_instructor(&self.db, &user.id).await?)
    }

    /// Unpublished courses only exist for their owner and admins.
    pub async fn course_detail(
        &self,
        viewer: Option<&AuthUser>,
        course_id: &str,
    ) -> Result<CourseDetail, AppError> {
        let course = catalog::find_course(&self.db, course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))?;

        let can_manage = viewer.is_some_and(|v| v.can_manage(&course.instructor_id));
        if !course.is_published && !can_manage {
            return Err(AppError::not_found("Course"));
        }

        let rating = reviews::rating_summary(&self.db, course_id).await?;
        let total_lessons = catalog::count_lessons_in_course(&self.db, course_id).await?;
        let active_students = enrollments::count_active(&self.db, course_id).await?;

        Ok(CourseDetail {
            course,
            average_rating: round2(rating.average_rating),
            review_count: rating.review_count,
            total_lessons,
            active_students,
        })
    }

    // -----------------------------------------------------------------------
    // modules

    pub async fn list_modules(&self, course_id: &str) -> Result<Vec<Module>, AppError> {
        Ok(catalog::fetch_modules(&self.db, course_id).await?)
    }

    pub async fn create_module(
        &self,
        user: &AuthUser,
        course_id: &str,
        req: NewModuleRequest,
    ) -> Result<Module, AppError> {
        req.validate()?;
        self.managed_course(user, course_id).await?;

        let mut conn = self.db.acquire().await?;
        Ok(catalog::insert_module(&mut conn, course_id, req.title.trim(), &req.description).await?)
    }

    pub async fn update_module(
        &self,
        user: &AuthUser,
        module_id: &str,
        req: UpdateModuleRequest,
    ) -> Result<Module, AppError> {
        req.validate()?;
        let module = catalog::find_module(&self.db, module_id)
            .await?
            .ok_or_else(|| AppError::not_found("Module"))?;
        self.managed_course(user, &module.course_id).await?;

        let title = req.title.unwrap_or(module.title);
        let description = req.description.unwrap_or(module.description);
        catalog::update_module(&self.db, module_id, title.trim(), &description).await?;

        catalog::find_module(&self.db, module_id)
            .await?
            .ok_or_else(|| AppError::not_found("Module"))
    }

    pub async fn delete_module(&self, user: &AuthUser, module_id: &str) -> Result<(), AppError> {
        let module = catalog::find_module(&self.db, module_id)
            .await?
            .ok_or_else(|| AppError::not_found("Module"))?;
        self.managed_course(user, &module.course_id).await?;
        self.delete_child(ChildKind::Module, &module.course_id, module_id)
            .await
    }

    /// Full replacement ordering: modules missing from `ids` are deleted.
    pub async fn reorder_modules(
        &self,
        user: &AuthUser,
        course_id: &str,
        ids: Vec<String>,
    ) -> Result<Vec<Module>, AppError> {
        self.managed_course(user, course_id).await?;
        self.reorder_children(ChildKind::Module, course_id, &ids).await?;
        Ok(catalog::fetch_modules(&self.db, course_id).await?)
    }

    // -----------------------------------------------------------------------
    // sections

    /// Sections carry media references, so listing them needs content access.
    pub async fn list_sections(
        &self,
        viewer: Option<&AuthUser>,
        module_id: &str,
    ) -> Result<Vec<Section>, AppError> {
        let course_id = catalog::course_id_for_module(&self.db, module_id)
            .await?
            .ok_or_else(|| AppError::not_found("Module"))?;
        authorize_viewer(&self.db, viewer, &course_id).await?;
        Ok(catalog::fetch_sections(&self.db, module_id).await?)
    }

    pub async fn create_section(
        &self,
        user: &AuthUser,
        module_id: &str,
        req: NewSectionRequest,
    ) -> Result<Section, AppError> {
        req.validate()?;
        let course_id = catalog::course_id_for_module(&self.db, module_id)
            .await?
            .ok_or_else(|| AppError::not_found("Module"))?;
        self.managed_course(user, &course_id).await?;

        let video_ref = non_empty(req.video)
            .map(|v| normalize_video_ref(&v))
            .transpose()?;
        let document_ref = non_empty(req.document_ref);
        let content_type = SectionContentType::derive(
            video_ref.is_some(),
            document_ref.is_some(),
            req.content_type,
        )?;

        let row = SectionRow {
            title: req.title.trim(),
            description: &req.description,
            content_type,
            video_ref: video_ref.as_deref(),
            document_ref: document_ref.as_deref(),
        };
        let mut conn = self.db.acquire().await?;
        Ok(catalog::insert_section(&mut conn, module_id, row).await?)
    }

    pub async fn update_section(
        &self,
        user: &AuthUser,
        section_id: &str,
        req: UpdateSectionRequest,
    ) -> Result<Section, AppError> {
        req.validate()?;
        let section = self.managed_section(user, section_id).await?;

        let video_ref = match req.video {
            None => section.video_ref.clone(),
            Some(raw) => non_empty(Some(raw))
                .map(|v| normalize_video_ref(&v))
                .transpose()?,
        };
        let document_ref = match req.document_ref {
            None => section.document_ref.clone(),
            Some(raw) => non_empty(Some(raw)),
        };

        let requested = req.content_type.or_else(|| {
            let keeps_own_kind = matches!(
                section.content_type,
                SectionContentType::Text | SectionContentType::Quiz
            );
            (keeps_own_kind && video_ref.is_none() && document_ref.is_none())
                .then_some(section.content_type)
        });
        let content_type =
            SectionContentType::derive(video_ref.is_some(), document_ref.is_some(), requested)?;

        let title = req.title.unwrap_or(section.title);
        let description = req.description.unwrap_or(section.description);
        let row = SectionRow {
            title: title.trim(),
            description: &description,
            content_type,
            video_ref: video_ref.as_deref(),
            document_ref: document_ref.as_deref(),
        };
        catalog::update_section(&self.db, section_id, row).await?;

        catalog::find_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))
    }

    /// Uploads a PDF through the blob store and stores only its handle.
    pub async fn attach_document(
        &self,
        user: &AuthUser,
        section_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Section, AppError> {
        let section = self.managed_section(user, section_id).await?;
        if bytes.is_empty() {
            return Err(AppError::Validation("document is empty".to_string()));
        }
        if !content_type.starts_with("application/pdf") {
            return Err(AppError::Validation(format!(
                "unsupported document type: {}",
                content_type
            )));
        }

        let filename = sanitize_filename(filename);
        let key = format!("sections/{}/{}-{}", section_id, Uuid::new_v4(), filename);
        let handle = self.storage.put(&key, "application/pdf", bytes).await?;

        let kind = SectionContentType::derive(section.video_ref.is_some(), true, None)?;
        let row = SectionRow {
            title: &section.title,
            description: &section.description,
            content_type: kind,
            video_ref: section.video_ref.as_deref(),
            document_ref: Some(&handle),
        };
        catalog::update_section(&self.db, section_id, row).await?;
        info!("Attached document {} to section {}", handle, section_id);

        catalog::find_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))
    }

    pub async fn delete_section(&self, user: &AuthUser, section_id: &str) -> Result<(), AppError> {
        let section = self.managed_section(user, section_id).await?;
        self.delete_child(ChildKind::Section, &section.module_id, section_id)
            .await
    }

    pub async fn reorder_sections(
        &self,
        user: &AuthUser,
        module_id: &str,
        ids: Vec<String>,
    ) -> Result<Vec<Section>, AppError> {
        let course_id = catalog::course_id_for_module(&self.db, module_id)
            .await?
            .ok_or_else(|| AppError::not_found("Module"))?;
        self.managed_course(user, &course_id).await?;
        self.reorder_children(ChildKind::Section, module_id, &ids).await?;
        Ok(catalog::fetch_sections(&self.db, module_id).await?)
    }

    // -----------------------------------------------------------------------
    // lessons

    /// Lessons carry their content payload; same access rule as sections.
    pub async fn list_lessons(
        &self,
        viewer: Option<&AuthUser>,
        section_id: &str,
    ) -> Result<Vec<Lesson>, AppError> {
        let course_id = catalog::course_id_for_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))?;
        authorize_viewer(&self.db, viewer, &course_id).await?;
        Ok(catalog::fetch_lessons(&self.db, section_id).await?)
    }

    pub async fn create_lesson(
        &self,
        user: &AuthUser,
        section_id: &str,
        req: NewLessonRequest,
    ) -> Result<Lesson, AppError> {
        req.validate()?;
        self.managed_section(user, section_id).await?;

        let content = req.content.unwrap_or_else(|| json!({}));
        let row = LessonRow {
            title: req.title.trim(),
            description: &req.description,
            content_type: req.content_type,
            content: &content,
            duration_minutes: req.duration_minutes.unwrap_or(DEFAULT_LESSON_MINUTES),
        };
        let mut conn = self.db.acquire().await?;
        Ok(catalog::insert_lesson(&mut conn, section_id, row).await?)
    }

    pub async fn update_lesson(
        &self,
        user: &AuthUser,
        lesson_id: &str,
        req: UpdateLessonRequest,
    ) -> Result<Lesson, AppError> {
        req.validate()?;
        let lesson = self.managed_lesson(user, lesson_id).await?;

        let content_type = req.content_type.unwrap_or(lesson.content_type);
        if content_type != lesson.content_type
            && catalog::lesson_has_assessment(&self.db, lesson_id).await?
        {
            return Err(AppError::Validation(format!(
                "lesson {} has an attached {:?} and cannot change its content type",
                lesson_id, lesson.content_type
            )));
        }

        let title = req.title.unwrap_or(lesson.title);
        let description = req.description.unwrap_or(lesson.description);
        let content = req.content.unwrap_or(lesson.content.0);
        let row = LessonRow {
            title: title.trim(),
            description: &description,
            content_type,
            content: &content,
            duration_minutes: req.duration_minutes.unwrap_or(lesson.duration_minutes),
        };
        catalog::update_lesson(&self.db, lesson_id, row).await?;

        catalog::find_lesson(&self.db, lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lesson"))
    }

    pub async fn delete_lesson(&self, user: &AuthUser, lesson_id: &str) -> Result<(), AppError> {
        let lesson = self.managed_lesson(user, lesson_id).await?;
        self.delete_child(ChildKind::Lesson, &lesson.section_id, lesson_id)
            .await
    }

    pub async fn reorder_lessons(
        &self,
        user: &AuthUser,
        section_id: &str,
        ids: Vec<String>,
    ) -> Result<Vec<Lesson>, AppError> {
        self.managed_section(user, section_id).await?;
        self.reorder_children(ChildKind::Lesson, section_id, &ids).await?;
        Ok(catalog::fetch_lessons(&self.db, section_id).await?)
    }

    // -----------------------------------------------------------------------
    // quizzes and assignments

    pub async fn create_quiz(
        &self,
        user: &AuthUser,
        lesson_id: &str,
        req: NewQuizRequest,
    ) -> Result<Quiz, AppError> {
        req.validate()?;
        let lesson = self.managed_lesson(user, lesson_id).await?;
        if lesson.content_type != LessonContentType::Quiz {
            return Err(AppError::Validation(
                "quizzes can only be attached to quiz lessons".to_string(),
            ));
        }
        if req.questions.iter().any(|q| q.points < 0.0) {
            return Err(AppError::Validation("question points cannot be negative".to_string()));
        }

        catalog::insert_quiz(
            &self.db,
            lesson_id,
            req.title.trim(),
            req.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
            req.max_attempts,
            &req.questions,
        )
        .await
        .map_err(|e| {
            map_unique_violation(e, AppError::Conflict("lesson already has a quiz".to_string()))
        })
    }

    pub async fn create_assignment(
        &self,
        user: &AuthUser,
        lesson_id: &str,
        req: NewAssignmentRequest,
    ) -> Result<Assignment, AppError> {
        req.validate()?;
        let lesson = self.managed_lesson(user, lesson_id).await?;
        if lesson.content_type != LessonContentType::Assignment {
            return Err(AppError::Validation(
                "assignments can only be attached to assignment lessons".to_string(),
            ));
        }

        catalog::insert_assignment(
            &self.db,
            lesson_id,
            req.title.trim(),
            &req.instructions,
            req.max_score.unwrap_or(DEFAULT_MAX_SCORE),
            req.due_at.map(|d| d.to_rfc3339()),
        )
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                AppError::Conflict("lesson already has an assignment".to_string()),
            )
        })
    }

    // -----------------------------------------------------------------------
    // helpers

    async fn require_category(&self, category_id: &str) -> Result<(), AppError> {
        if catalog::find_category(&self.db, category_id).await?.is_none() {
            return Err(AppError::Validation(format!(
                "category {} does not exist",
                category_id
            )));
        }
        Ok(())
    }

    async fn managed_course(&self, user: &AuthUser, course_id: &str) -> Result<Course, AppError> {
        let course = catalog::find_course(&self.db, course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))?;
        if !user.can_manage(&course.instructor_id) {
            warn!("User {} tried to modify course {}", user.id, course_id);
            return Err(AppError::Permission(
                "only the course instructor or an admin can do this".to_string(),
            ));
        }
        Ok(course)
    }

    async fn managed_section(&self, user: &AuthUser, section_id: &str) -> Result<Section, AppError> {
        let section = catalog::find_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))?;
        let course_id = catalog::course_id_for_section(&self.db, section_id)
            .await?
            .ok_or_else(|| AppError::not_found("Section"))?;
        self.managed_course(user, &course_id).await?;
        Ok(section)
    }

    async fn managed_lesson(&self, user: &AuthUser, lesson_id: &str) -> Result<Lesson, AppError> {
        let lesson = catalog::find_lesson(&self.db, lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lesson"))?;
        let course_id = catalog::course_id_for_lesson(&self.db, lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lesson"))?;
        self.managed_course(user, &course_id).await?;
        Ok(lesson)
    }

    async fn delete_child(
        &self,
        kind: ChildKind,
        parent_id: &str,
        id: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        if !catalog::delete_child(&mut tx, kind, id).await? {
            return Err(AppError::not_found(kind.label()));
        }
        let remaining = catalog::child_ids(&mut tx, kind, parent_id).await?;
        catalog::renumber(&mut tx, kind, parent_id, &remaining).await?;
        tx.commit().await?;

        info!("Deleted {} {}", kind.label(), id);
        Ok(())
    }

    async fn reorder_children(
        &self,
        kind: ChildKind,
        parent_id: &str,
        ids: &[String],
    ) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let existing = catalog::child_ids(&mut tx, kind, parent_id).await?;
        let existing_set: HashSet<&str> = existing.iter().map(String::as_str).collect();

        let mut seen = HashSet::new();
        for id in ids {
            if !existing_set.contains(id.as_str()) {
                return Err(AppError::Validation(format!(
                    "{} {} does not belong to {}",
                    kind.label(),
                    id,
                    parent_id
                )));
            }
            if !seen.insert(id.as_str()) {
                return Err(AppError::Validation(format!("duplicate id {} in ordering", id)));
            }
        }

        let mut removed = 0;
        for id in existing.iter().filter(|id| !seen.contains(id.as_str())) {
            catalog::delete_child(&mut tx, kind, id).await?;
            removed += 1;
        }
        catalog::renumber(&mut tx, kind, parent_id, ids).await?;
        tx.commit().await?;

        if removed > 0 {
            warn!(
                "Reordering {} children of {} deleted {} omitted entries",
                kind.label(),
                parent_id,
                removed
            );
        }
        Ok(())
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}
