use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::models::{RatingSummary, Review};

macro_rules! select_review {
    () => {
        "SELECT id, user_id, course_id, rating, comment, created_at, updated_at FROM reviews "
    };
}

pub async fn insert_review<'e>(
    db: impl SqliteExecutor<'e>,
    user_id: &str,
    course_id: &str,
    rating: i64,
    comment: &str,
) -> Result<Review, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let review = Review {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
        rating,
        comment: comment.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO reviews (id, user_id, course_id, rating, comment, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&review.id)
    .bind(&review.user_id)
    .bind(&review.course_id)
    .bind(review.rating)
    .bind(&review.comment)
    .bind(&review.created_at)
    .bind(&review.updated_at)
    .execute(db)
    .await?;

    Ok(review)
}

pub async fn find_review<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(concat!(select_review!(), "WHERE id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn update_review<'e>(
    db: impl SqliteExecutor<'e>,
    id: &str,
    rating: i64,
    comment: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE reviews SET rating = ?1, comment = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(rating)
    .bind(comment)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete_review<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_for_course<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(concat!(
        select_review!(),
        "WHERE course_id = ?1 ORDER BY created_at DESC"
    ))
    .bind(course_id)
    .fetch_all(db)
    .await
}

/// Raw average (unrounded) and count.
pub async fn rating_summary<'e>(
    db: impl SqliteExecutor<'e>,
    course_id: &str,
) -> Result<RatingSummary, sqlx::Error> {
    let (average_rating, review_count) = sqlx::query_as::<_, (f64, i64)>(
        "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM reviews WHERE course_id = ?1",
    )
    .bind(course_id)
    .fetch_one(db)
    .await?;

    Ok(RatingSummary {
        average_rating,
        review_count,
    })
}
