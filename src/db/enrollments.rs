use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqliteExecutor};
use uuid::Uuid;

use crate::models::{Enrollment, EnrollmentScope, EnrollmentStatus, EnrollmentSummary};

macro_rules! select_enrollment {
    () => {
        r#"
        SELECT id, user_id, course_id, status, progress_percentage, enrolled_at,
               completed_at, last_accessed_at
        FROM enrollments
        "#
    };
}

pub async fn find_enrollment<'e>(
    db: impl SqliteExecutor<'e>,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(concat!(
        select_enrollment!(),
        " WHERE user_id = ?1 AND course_id = ?2"
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

pub async fn find_enrollment_by_id<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(concat!(select_enrollment!(), " WHERE id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Inserts an active enrollment unless the course already holds
/// `max_students` active or pending enrollments.
///
/// The capacity check and the insert are one statement. Returns `None` when
/// the course is full; a second row for the same pair fails on
/// UNIQUE(user_id, course_id).
pub async fn insert_active(
    conn: &mut SqliteConnection,
    user_id: &str,
    course_id: &str,
    max_students: Option<i64>,
) -> Result<Option<Enrollment>, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let inserted = sqlx::query(
        r#"
        INSERT INTO enrollments
            (id, user_id, course_id, status, progress_percentage, enrolled_at, completed_at,
            last_accessed_at)
        SELECT ?1, ?2, ?3, 'active', 0, ?4, NULL, ?4
        WHERE ?5 IS NULL
           OR (SELECT COUNT(*) FROM enrollments
               WHERE course_id = ?3 AND status IN ('active', 'pending')) < ?5
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(course_id)
    .bind(&now)
    .bind(max_students)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Ok(None);
    }
    find_enrollment_by_id(&mut *conn, &id).await
}

/// Flips a dropped enrollment back to active under the same capacity rule
/// as [`insert_active`]. Keeps the row id and its progress.
pub async fn reactivate(
    conn: &mut SqliteConnection,
    id: &str,
    course_id: &str,
    max_students: Option<i64>,
) -> Result<Option<Enrollment>, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    let updated = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = 'active',
            completed_at = NULL,
            enrolled_at = ?1,
            last_accessed_at = ?1
        WHERE id = ?2
          AND status = 'dropped'
          AND (?3 IS NULL
               OR (SELECT COUNT(*) FROM enrollments
                   WHERE course_id = ?4 AND status IN ('active', 'pending')) < ?3)
        "#,
    )
    .bind(&now)
    .bind(id)
    .bind(max_students)
    .bind(course_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Ok(None);
    }
    find_enrollment_by_id(&mut *conn, id).await
}

pub async fn set_status<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    status: EnrollmentStatus,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE enrollments SET status = ?1, last_accessed_at = ?2 WHERE id = ?3",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Stores the recomputed aggregate. Reaching completion flips an active
/// enrollment to completed and stamps `completed_at` once.
pub async fn store_progress<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    percentage: f64,
    completed: bool,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress_percentage = ?1,
            last_accessed_at = ?2,
            status = CASE WHEN ?3 AND status = 'active' THEN 'completed' ELSE status END,
            completed_at = CASE
                WHEN ?3 AND completed_at IS NULL THEN ?2
                ELSE completed_at
            END
        WHERE id = ?4
        "#,
    )
    .bind(percentage)
    .bind(&now)
    .bind(completed)
    .bind(id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn touch<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE enrollments SET last_accessed_at = ?1 WHERE id = ?2")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn exists<'e>(
    db: impl SqliteExecutor<'e>,
    user_id: &str,
    course_id: &str,
    scope: EnrollmentScope,
) -> Result<bool, sqlx::Error> {
    let sql = match scope {
        EnrollmentScope::Active => {
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = ?1 AND course_id = ?2 AND status = 'active')"
        }
        EnrollmentScope::Standing => {
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = ?1 AND course_id = ?2 AND status != 'dropped')"
        }
        EnrollmentScope::Any => {
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = ?1 AND course_id = ?2)"
        }
    };

    sqlx::query_scalar(sql)
        .bind(user_id)
        .bind(course_id)
        .fetch_one(db)
        .await
}

pub async fn count_active<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM enrollments WHERE course_id = ?1 AND status = 'active'",
    )
    .bind(course_id)
    .fetch_one(db)
    .await
}

/// Enrollments of one user, newest first. Dropped rows only with `include_all`.
pub async fn fetch_for_user<'e>(
    db: impl SqliteExecutor<'e>,
    user_id: &str,
    include_all: bool,
) -> Result<Vec<EnrollmentSummary>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentSummary>(
        r#"
        SELECT e.id, e.user_id, e.course_id, c.title AS course_title, e.status,
               e.progress_percentage, e.enrolled_at, e.completed_at
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        WHERE e.user_id = ?1 AND (?2 OR e.status != 'dropped')
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(user_id)
    .bind(include_all)
    .fetch_all(db)
    .await
}

pub async fn fetch_for_course<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<Vec<EnrollmentSummary>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentSummary>(
        r#"
        SELECT e.id, e.user_id, e.course_id, c.title AS course_title, e.status,
               e.progress_percentage, e.enrolled_at, e.completed_at
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        WHERE e.course_id = ?1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentCourseRow {
    pub user_id: String,
    pub course_id: String,
    pub course_title: String,
}

/// Active enrollments across every course of an instructor, grouped by
/// student when read in order.
pub async fn fetch_students_of_instructor<'e>(
    db: impl SqliteExecutor<'e>,
    instructor_id: &str,
) -> Result<Vec<StudentCourseRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentCourseRow>(
        r#"
        SELECT e.user_id, c.id AS course_id, c.title AS course_title
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        WHERE c.instructor_id = ?1 AND e.status = 'active'
        ORDER BY e.user_id, c.title
        "#,
    )
    .bind(instructor_id)
    .fetch_all(db)
    .await
}

/// Drops every active enrollment the student holds in the instructor's courses.
pub async fn drop_student_from_instructor<'e>(
    db: impl SqliteExecutor<'e>,
    instructor_id: &str,
    user_id: &str,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = 'dropped', last_accessed_at = ?1
        WHERE user_id = ?2
          AND status = 'active'
          AND course_id IN (SELECT id FROM courses WHERE instructor_id = ?3)
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(instructor_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::{self, CourseRow};
    use crate::db::setup_test_db;
    use crate::models::{Difficulty, EnrollmentType};

    async fn seed_course(conn: &mut SqliteConnection, max_students: Option<i64>) -> String {
        let category = catalog::insert_category(&mut *conn, "Science", "")
            .await
            .expect("Failed to insert category");
        catalog::insert_course(
            conn,
            "instructor-1",
            CourseRow {
                title: "Chemistry",
                description: "",
                category_id: &category.id,
                difficulty: Difficulty::Beginner,
                price: 0.0,
                enrollment_type: EnrollmentType::SelfService,
                max_students,
                language: "en",
                duration_in_weeks: 2,
            },
        )
        .await
        .expect("Failed to insert course")
        .id
    }

    #[tokio::test]
    async fn test_capacity_blocks_insert() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let course_id = seed_course(&mut conn, Some(1)).await;

        let first = insert_active(&mut conn, "alice", &course_id, Some(1)).await.unwrap();
        assert!(first.is_some());
        let second = insert_active(&mut conn, "bob", &course_id, Some(1)).await.unwrap();
        assert!(second.is_none());
        assert_eq!(count_active(&mut *conn, &course_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_row_for_same_pair_is_rejected() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let course_id = seed_course(&mut conn, None).await;

        insert_active(&mut conn, "alice", &course_id, None).await.unwrap();
        let err = insert_active(&mut conn, "alice", &course_id, None)
            .await
            .unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reactivate_keeps_row_id() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let course_id = seed_course(&mut conn, None).await;

        let enrollment = insert_active(&mut conn, "alice", &course_id, None)
            .await
            .unwrap()
            .unwrap();
        set_status(&mut *conn, &enrollment.id, EnrollmentStatus::Dropped)
            .await
            .unwrap();
        assert!(!exists(&mut *conn, "alice", &course_id, EnrollmentScope::Standing).await.unwrap());
        assert!(exists(&mut *conn, "alice", &course_id, EnrollmentScope::Any).await.unwrap());

        let again = reactivate(&mut conn, &enrollment.id, &course_id, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, enrollment.id);
        assert_eq!(again.status, EnrollmentStatus::Active);
    }

    #[tokio::test]
    async fn test_store_progress_completes_once() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let course_id = seed_course(&mut conn, None).await;
        let enrollment = insert_active(&mut conn, "alice", &course_id, None)
            .await
            .unwrap()
            .unwrap();

        store_progress(&mut *conn, &enrollment.id, 100.0, true).await.unwrap();
        let done = find_enrollment_by_id(&mut *conn, &enrollment.id).await.unwrap().unwrap();
        assert_eq!(done.status, EnrollmentStatus::Completed);
        let stamped = done.completed_at.clone();
        assert!(stamped.is_some());

        store_progress(&mut *conn, &enrollment.id, 100.0, true).await.unwrap();
        let again = find_enrollment_by_id(&mut *conn, &enrollment.id).await.unwrap().unwrap();
        assert_eq!(again.completed_at, stamped);
    }

    #[tokio::test]
    async fn test_drop_student_from_instructor() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let course_id = seed_course(&mut conn, None).await;
        insert_active(&mut conn, "alice", &course_id, None).await.unwrap();

        let students = fetch_students_of_instructor(&mut *conn, "instructor-1").await.unwrap();
        assert_eq!(students.len(), 1);

        let dropped = drop_student_from_instructor(&mut *conn, "instructor-1", "alice")
            .await
            .unwrap();
        assert_eq!(dropped, 1);
        assert!(fetch_for_user(&mut *conn, "alice", false).await.unwrap().is_empty());
        assert_eq!(fetch_for_user(&mut *conn, "alice", true).await.unwrap().len(), 1);
    }
}
