use chrono::Utc;
use serde_json::Value;
use sqlx::{SqliteConnection, SqliteExecutor, types::Json};
use uuid::Uuid;

use crate::models::{
    Assignment, Category, Course, CourseListQuery, CourseStatus, Difficulty, EnrollmentType,
    Lesson, LessonContentType, Module, Quiz, QuizQuestion, Section, SectionContentType,
};

macro_rules! select_course {
    () => {
        r#"
        SELECT
            id, title, description, category_id, instructor_id, difficulty, price,
            status, (status = 'published') AS is_published, enrollment_type,
            max_students, language, duration_in_weeks, created_at, updated_at
        FROM courses
        "#
    };
}

macro_rules! select_module {
    () => {
        "SELECT id, course_id, title, description, position, created_at, updated_at FROM modules "
    };
}

macro_rules! select_section {
    () => {
        r#"
        SELECT s.id, s.module_id, s.title, s.description, s.position, s.content_type,
               s.video_ref, s.document_ref, s.created_at, s.updated_at
        FROM sections s
        "#
    };
}

macro_rules! select_lesson {
    () => {
        r#"
        SELECT l.id, l.section_id, l.title, l.description, l.content_type, l.content,
               l.position, l.duration_minutes, l.created_at, l.updated_at
        FROM lessons l
        "#
    };
}

// ---------------------------------------------------------------------------
// categories

pub async fn fetch_categories<'e>(db: impl SqliteExecutor<'e>) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at FROM categories ORDER BY name",
    )
    .fetch_all(db)
    .await
}

pub async fn find_category<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at FROM categories WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_category<'e>(
    db: impl SqliteExecutor<'e>,
    name: &str,
    description: &str,
) -> Result<Category, sqlx::Error> {
    let category = Category {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.to_string(),
        created_at: Utc::now().to_rfc3339(),
    };

    sqlx::query("INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.created_at)
        .execute(db)
        .await?;

    Ok(category)
}

pub async fn count_categories<'e>(db: impl SqliteExecutor<'e>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(db)
        .await
}

// ---------------------------------------------------------------------------
// courses

pub struct CourseRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category_id: &'a str,
    pub difficulty: Difficulty,
    pub price: f64,
    pub enrollment_type: EnrollmentType,
    pub max_students: Option<i64>,
    pub language: &'a str,
    pub duration_in_weeks: i64,
}

pub async fn insert_course(
    conn: &mut SqliteConnection,
    instructor_id: &str,
    row: CourseRow<'_>,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, title, description, category_id, instructor_id, difficulty, price, status,
            enrollment_type, max_students, language, duration_in_weeks, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'draft', ?8, ?9, ?10, ?11, ?12, ?12)
        "#,
    )
    .bind(&id)
    .bind(row.title)
    .bind(row.description)
    .bind(row.category_id)
    .bind(instructor_id)
    .bind(row.difficulty)
    .bind(row.price)
    .bind(row.enrollment_type)
    .bind(row.max_students)
    .bind(row.language)
    .bind(row.duration_in_weeks)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    find_course(&mut *conn, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_course(
    conn: &mut SqliteConnection,
    id: &str,
    row: CourseRow<'_>,
) -> Result<Option<Course>, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let affected = sqlx::query(
        r#"
        UPDATE courses
        SET title = ?1,
            description = ?2,
            category_id = ?3,
            difficulty = ?4,
            price = ?5,
            enrollment_type = ?6,
            max_students = ?7,
            language = ?8,
            duration_in_weeks = ?9,
            updated_at = ?10
        WHERE id = ?11
        "#,
    )
    .bind(row.title)
    .bind(row.description)
    .bind(row.category_id)
    .bind(row.difficulty)
    .bind(row.price)
    .bind(row.enrollment_type)
    .bind(row.max_students)
    .bind(row.language)
    .bind(row.duration_in_weeks)
    .bind(&now)
    .bind(id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if affected == 0 {
        return Ok(None);
    }
    find_course(&mut *conn, id).await
}

pub async fn find_course<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(concat!(select_course!(), " WHERE id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_published_courses<'e>(
    db: impl SqliteExecutor<'e>,
    query: &CourseListQuery,
) -> Result<Vec<Course>, sqlx::Error> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));

    sqlx::query_as::<_, Course>(concat!(
        select_course!(),
        r#"
        WHERE status = 'published'
          AND (?1 IS NULL OR category_id = ?1)
          AND (?2 IS NULL OR lower(title) LIKE ?2 ESCAPE '\' OR lower(description) LIKE ?2 ESCAPE '\')
          AND (?3 IS NULL OR difficulty = ?3)
          AND (?4 IS NULL OR price >= ?4)
          AND (?5 IS NULL OR price <= ?5)
        ORDER BY created_at DESC
        "#
    ))
    .bind(query.category.as_deref())
    .bind(search)
    .bind(query.difficulty)
    .bind(query.price_min)
    .bind(query.price_max)
    .fetch_all(db)
    .await
}

/// Makes `%`, `_` and `\` match themselves under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn fetch_courses_by_instructor<'e>(
    db: impl SqliteExecutor<'e>,
    instructor_id: &str,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(concat!(
        select_course!(),
        " WHERE instructor_id = ?1 ORDER BY created_at DESC"
    ))
    .bind(instructor_id)
    .fetch_all(db)
    .await
}

pub async fn set_course_status<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    status: CourseStatus,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query("UPDATE courses SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn delete_course<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn count_lessons_in_course<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM lessons l
        JOIN sections s ON l.section_id = s.id
        JOIN modules m ON s.module_id = m.id
        WHERE m.course_id = ?1
        "#,
    )
    .bind(course_id)
    .fetch_one(db)
    .await
}

// ---------------------------------------------------------------------------
// ownership lookups

pub async fn course_id_for_module<'e>(
    db: impl SqliteExecutor<'e>,
    module_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT course_id FROM modules WHERE id = ?1")
        .bind(module_id)
        .fetch_optional(db)
        .await
}

pub async fn course_id_for_section<'e>(
    db: impl SqliteExecutor<'e>,
    section_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT m.course_id FROM sections s JOIN modules m ON s.module_id = m.id WHERE s.id = ?1",
    )
    .bind(section_id)
    .fetch_optional(db)
    .await
}

pub async fn course_id_for_lesson<'e>(
    db: impl SqliteExecutor<'e>,
    lesson_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT m.course_id
        FROM lessons l
        JOIN sections s ON l.section_id = s.id
        JOIN modules m ON s.module_id = m.id
        WHERE l.id = ?1
        "#,
    )
    .bind(lesson_id)
    .fetch_optional(db)
    .await
}

// ---------------------------------------------------------------------------
// modules

pub async fn find_module<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Module>, sqlx::Error> {
    sqlx::query_as::<_, Module>(concat!(select_module!(), "WHERE id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_modules<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<Vec<Module>, sqlx::Error> {
    sqlx::query_as::<_, Module>(concat!(
        select_module!(),
        "WHERE course_id = ?1 ORDER BY position"
    ))
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn insert_module(
    conn: &mut SqliteConnection,
    course_id: &str,
    title: &str,
    description: &str,
) -> Result<Module, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO modules (id, course_id, title, description, position, created_at, updated_at)
        SELECT ?1, ?2, ?3, ?4, COALESCE(MAX(position), 0) + 1, ?5, ?5
        FROM modules WHERE course_id = ?2
        "#,
    )
    .bind(&id)
    .bind(course_id)
    .bind(title)
    .bind(description)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    find_module(&mut *conn, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_module<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    title: &str,
    description: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE modules SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(title)
    .bind(description)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

// ---------------------------------------------------------------------------
// sections

pub struct SectionRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content_type: SectionContentType,
    pub video_ref: Option<&'a str>,
    pub document_ref: Option<&'a str>,
}

pub async fn find_section<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(concat!(select_section!(), " WHERE s.id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_sections<'e>(
    db: impl SqliteExecutor<'e>,
    module_id: &str,
) -> Result<Vec<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(concat!(
        select_section!(),
        " WHERE s.module_id = ?1 ORDER BY s.position"
    ))
    .bind(module_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_sections_for_course<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<Vec<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(concat!(
        select_section!(),
        r#"
        JOIN modules m ON s.module_id = m.id
        WHERE m.course_id = ?1
        ORDER BY m.position, s.position
        "#
    ))
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn insert_section(
    conn: &mut SqliteConnection,
    module_id: &str,
    row: SectionRow<'_>,
) -> Result<Section, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO sections
            (id, module_id, title, description, position, content_type, video_ref, document_ref,
            created_at, updated_at)
        SELECT ?1, ?2, ?3, ?4, COALESCE(MAX(position), 0) + 1, ?5, ?6, ?7, ?8, ?8
        FROM sections WHERE module_id = ?2
        "#,
    )
    .bind(&id)
    .bind(module_id)
    .bind(row.title)
    .bind(row.description)
    .bind(row.content_type)
    .bind(row.video_ref)
    .bind(row.document_ref)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    find_section(&mut *conn, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Writes every mutable column at once so content_type and the references
/// can never be persisted out of step.
pub async fn update_section<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    row: SectionRow<'_>,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE sections
        SET title = ?1,
            description = ?2,
            content_type = ?3,
            video_ref = ?4,
            document_ref = ?5,
            updated_at = ?6
        WHERE id = ?7
        "#,
    )
    .bind(row.title)
    .bind(row.description)
    .bind(row.content_type)
    .bind(row.video_ref)
    .bind(row.document_ref)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

// ---------------------------------------------------------------------------
// lessons

pub async fn find_lesson<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(concat!(select_lesson!(), " WHERE l.id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_lessons<'e>(
    db: impl SqliteExecutor<'e>,
    section_id: &str,
) -> Result<Vec<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(concat!(
        select_lesson!(),
        " WHERE l.section_id = ?1 ORDER BY l.position"
    ))
    .bind(section_id)
    .fetch_all(db)
    .await
}

/// Every lesson of a course in reading order (module, section, lesson).
pub async fn fetch_lessons_for_course<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<Vec<Lesson>, sqlx::Error> {
    sqlx::query_as::<_, Lesson>(concat!(
        select_lesson!(),
        r#"
        JOIN sections s ON l.section_id = s.id
        JOIN modules m ON s.module_id = m.id
        WHERE m.course_id = ?1
        ORDER BY m.position, s.position, l.position
        "#
    ))
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub struct LessonRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content_type: LessonContentType,
    pub content: &'a Value,
    pub duration_minutes: i64,
}

pub async fn insert_lesson(
    conn: &mut SqliteConnection,
    section_id: &str,
    row: LessonRow<'_>,
) -> Result<Lesson, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO lessons
            (id, section_id, title, description, content_type, content, position,
            duration_minutes, created_at, updated_at)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, COALESCE(MAX(position), 0) + 1, ?7, ?8, ?8
        FROM lessons WHERE section_id = ?2
        "#,
    )
    .bind(&id)
    .bind(section_id)
    .bind(row.title)
    .bind(row.description)
    .bind(row.content_type)
    .bind(Json(row.content))
    .bind(row.duration_minutes)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    find_lesson(&mut *conn, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_lesson<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    row: LessonRow<'_>,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE lessons
        SET title = ?1,
            description = ?2,
            content_type = ?3,
            content = ?4,
            duration_minutes = ?5,
            updated_at = ?6
        WHERE id = ?7
        "#,
    )
    .bind(row.title)
    .bind(row.description)
    .bind(row.content_type)
    .bind(Json(row.content))
    .bind(row.duration_minutes)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

// ---------------------------------------------------------------------------
// ordering

/// The three ordered levels of the content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Module,
    Section,
    Lesson,
}

impl ChildKind {
    fn table(self) -> &'static str {
        match self {
            ChildKind::Module => "modules",
            ChildKind::Section => "sections",
            ChildKind::Lesson => "lessons",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            ChildKind::Module => "course_id",
            ChildKind::Section => "module_id",
            ChildKind::Lesson => "section_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChildKind::Module => "Module",
            ChildKind::Section => "Section",
            ChildKind::Lesson => "Lesson",
        }
    }
}

pub async fn child_ids(
    conn: &mut SqliteConnection,
    kind: ChildKind,
    parent_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ?1 ORDER BY position",
        kind.table(),
        kind.parent_column()
    );
    sqlx::query_scalar(&sql)
        .bind(parent_id)
        .fetch_all(&mut *conn)
        .await
}

pub async fn delete_child(
    conn: &mut SqliteConnection,
    kind: ChildKind,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Assigns positions 1..=n following `ordered_ids`.
///
/// Goes through negative positions first so UNIQUE(parent, position) holds
/// after every single row update. `ordered_ids` must cover every remaining
/// child of the parent.
pub async fn renumber(
    conn: &mut SqliteConnection,
    kind: ChildKind,
    parent_id: &str,
    ordered_ids: &[String],
) -> Result<(), sqlx::Error> {
    let stage = format!(
        "UPDATE {} SET position = ?1 WHERE id = ?2 AND {} = ?3",
        kind.table(),
        kind.parent_column()
    );
    for (index, id) in ordered_ids.iter().enumerate() {
        sqlx::query(&stage)
            .bind(-(index as i64 + 1))
            .bind(id)
            .bind(parent_id)
            .execute(&mut *conn)
            .await?;
    }

    let flip = format!(
        "UPDATE {} SET position = -position, updated_at = ?1 WHERE {} = ?2 AND position < 0",
        kind.table(),
        kind.parent_column()
    );
    sqlx::query(&flip)
        .bind(Utc::now().to_rfc3339())
        .bind(parent_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// quizzes and assignments

macro_rules! select_quiz {
    () => {
        "SELECT id, lesson_id, title, passing_score, max_attempts, questions, created_at, updated_at FROM quizzes "
    };
}

pub async fn insert_quiz<'e>(
    db: impl SqliteExecutor<'e>,
    lesson_id: &str,
    title: &str,
    passing_score: f64,
    max_attempts: Option<i64>,
    questions: &[QuizQuestion],
) -> Result<Quiz, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let quiz = Quiz {
        id: Uuid::new_v4().to_string(),
        lesson_id: lesson_id.to_string(),
        title: title.to_string(),
        passing_score,
        max_attempts,
        questions: Json(questions.to_vec()),
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO quizzes
            (id, lesson_id, title, passing_score, max_attempts, questions, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&quiz.id)
    .bind(&quiz.lesson_id)
    .bind(&quiz.title)
    .bind(quiz.passing_score)
    .bind(quiz.max_attempts)
    .bind(&quiz.questions)
    .bind(&quiz.created_at)
    .bind(&quiz.updated_at)
    .execute(db)
    .await?;

    Ok(quiz)
}

pub async fn find_quiz<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(concat!(select_quiz!(), "WHERE id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_quiz_by_lesson<'e>(
    db: impl SqliteExecutor<'e>,
    lesson_id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(concat!(select_quiz!(), "WHERE lesson_id = ?1"))
        .bind(lesson_id)
        .fetch_optional(db)
        .await
}

pub async fn insert_assignment<'e>(
    db: impl SqliteExecutor<'e>,
    lesson_id: &str,
    title: &str,
    instructions: &str,
    max_score: i64,
    due_at: Option<String>,
) -> Result<Assignment, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let assignment = Assignment {
        id: Uuid::new_v4().to_string(),
        lesson_id: lesson_id.to_string(),
        title: title.to_string(),
        instructions: instructions.to_string(),
        max_score,
        due_at,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO assignments
            (id, lesson_id, title, instructions, max_score, due_at, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&assignment.id)
    .bind(&assignment.lesson_id)
    .bind(&assignment.title)
    .bind(&assignment.instructions)
    .bind(assignment.max_score)
    .bind(&assignment.due_at)
    .bind(&assignment.created_at)
    .bind(&assignment.updated_at)
    .execute(db)
    .await?;

    Ok(assignment)
}

/// True when a quiz or an assignment hangs off the lesson.
pub async fn lesson_has_assessment<'e>(
    db: impl SqliteExecutor<'e>,
    lesson_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(SELECT 1 FROM quizzes WHERE lesson_id = ?1)
            OR EXISTS(SELECT 1 FROM assignments WHERE lesson_id = ?1)
        "#,
    )
    .bind(lesson_id)
    .fetch_one(db)
    .await
}
