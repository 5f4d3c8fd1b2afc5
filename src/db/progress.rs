use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::models::{Progress, SectionProgress};

/// Creates a not-started row for every lesson of the course. Existing rows
/// are kept untouched.
pub async fn seed_for_course<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    course_id: &str,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO progress (enrollment_id, lesson_id, completed, attempts, time_spent, notes, updated_at)
        SELECT ?1, l.id, 0, 0, 0, '', ?2
        FROM lessons l
        JOIN sections s ON l.section_id = s.id
        JOIN modules m ON s.module_id = m.id
        WHERE m.course_id = ?3
        ON CONFLICT(enrollment_id, lesson_id) DO NOTHING
        "#,
    )
    .bind(enrollment_id)
    .bind(&now)
    .bind(course_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result)
}

pub async fn find_progress<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    lesson_id: &str,
) -> Result<Option<Progress>, sqlx::Error> {
    sqlx::query_as::<_, Progress>(
        r#"
        SELECT enrollment_id, lesson_id, completed, completed_at, score, attempts,
               time_spent, notes, updated_at
        FROM progress
        WHERE enrollment_id = ?1 AND lesson_id = ?2
        "#,
    )
    .bind(enrollment_id)
    .bind(lesson_id)
    .fetch_optional(db)
    .await
}

/// Marks a lesson completed. The first completion time is preserved.
pub async fn upsert_completed<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    lesson_id: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO progress (enrollment_id, lesson_id, completed, completed_at, attempts, time_spent, notes, updated_at)
        VALUES (?1, ?2, 1, ?3, 0, 0, '', ?3)
        ON CONFLICT(enrollment_id, lesson_id) DO UPDATE SET
            completed = 1,
            completed_at = COALESCE(progress.completed_at, excluded.completed_at),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(enrollment_id)
    .bind(lesson_id)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(())
}

/// Records one quiz attempt. A lesson once completed stays completed.
/// Returns `false` without writing when `max_attempts` is already used up.
pub async fn upsert_quiz_attempt<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    lesson_id: &str,
    score: f64,
    completed: bool,
    max_attempts: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO progress (enrollment_id, lesson_id, completed, completed_at, score, attempts, time_spent, notes, updated_at)
        SELECT ?1, ?2, ?3, CASE WHEN ?3 THEN ?5 ELSE NULL END, ?4, 1, 0, '', ?5
        WHERE ?6 IS NULL OR ?6 >= 1
        ON CONFLICT(enrollment_id, lesson_id) DO UPDATE SET
            score = excluded.score,
            attempts = progress.attempts + 1,
            completed = MAX(progress.completed, excluded.completed),
            completed_at = COALESCE(progress.completed_at, excluded.completed_at),
            updated_at = excluded.updated_at
        WHERE ?6 IS NULL OR progress.attempts < ?6
        "#,
    )
    .bind(enrollment_id)
    .bind(lesson_id)
    .bind(completed)
    .bind(score)
    .bind(&now)
    .bind(max_attempts)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Adds `minutes` to the running time counter. Notes are replaced when given.
pub async fn record_activity<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    lesson_id: &str,
    minutes: i64,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO progress (enrollment_id, lesson_id, completed, attempts, time_spent, notes, updated_at)
        VALUES (?1, ?2, 0, 0, ?3, COALESCE(?4, ''), ?5)
        ON CONFLICT(enrollment_id, lesson_id) DO UPDATE SET
            time_spent = progress.time_spent + excluded.time_spent,
            notes = COALESCE(?4, progress.notes),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(enrollment_id)
    .bind(lesson_id)
    .bind(minutes)
    .bind(notes)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(())
}

/// (total lessons in the course, lessons completed under this enrollment).
///
/// Counts from the lesson side so a lesson without a progress row is simply
/// not started.
pub async fn course_counts<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    course_id: &str,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(l.id), COALESCE(SUM(CASE WHEN p.completed = 1 THEN 1 ELSE 0 END), 0)
        FROM lessons l
        JOIN sections s ON l.section_id = s.id
        JOIN modules m ON s.module_id = m.id
        LEFT JOIN progress p ON p.lesson_id = l.id AND p.enrollment_id = ?1
        WHERE m.course_id = ?2
        "#,
    )
    .bind(enrollment_id)
    .bind(course_id)
    .fetch_one(db)
    .await
}

pub async fn section_counts<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    section_id: &str,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(l.id), COALESCE(SUM(CASE WHEN p.completed = 1 THEN 1 ELSE 0 END), 0)
        FROM lessons l
        LEFT JOIN progress p ON p.lesson_id = l.id AND p.enrollment_id = ?1
        WHERE l.section_id = ?2
        "#,
    )
    .bind(enrollment_id)
    .bind(section_id)
    .fetch_one(db)
    .await
}

/// Per-section counters in reading order. `percentage` is left for the caller.
pub async fn section_progress_for_course<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
    course_id: &str,
) -> Result<Vec<SectionProgress>, sqlx::Error> {
    sqlx::query_as::<_, SectionProgress>(
        r#"
        SELECT s.id AS section_id,
               s.title AS title,
               COUNT(l.id) AS total_lessons,
               COALESCE(SUM(CASE WHEN p.completed = 1 THEN 1 ELSE 0 END), 0) AS completed_lessons
        FROM sections s
        JOIN modules m ON s.module_id = m.id
        LEFT JOIN lessons l ON l.section_id = s.id
        LEFT JOIN progress p ON p.lesson_id = l.id AND p.enrollment_id = ?1
        WHERE m.course_id = ?2
        GROUP BY s.id
        ORDER BY m.position, s.position
        "#,
    )
    .bind(enrollment_id)
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn completed_lesson_ids<'e>(
    db: impl SqliteExecutor<'e>,
    enrollment_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT lesson_id FROM progress WHERE enrollment_id = ?1 AND completed = 1")
        .bind(enrollment_id)
        .fetch_all(db)
        .await
}
