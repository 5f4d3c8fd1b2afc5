use sqlx::SqlitePool;
use tracing::{info, warn};
use validator::Validate;

use crate::db::{catalog, enrollments, reviews};
use crate::error::{AppError, map_unique_violation};
use crate::models::assessment::round2;
use crate::models::{
    AuthUser, EnrollmentScope, NewReviewRequest, RatingSummary, Review, UpdateReviewRequest,
};

/// One review per (user, course). A second submission is always rejected;
/// edits go through `update_review`.
pub struct ReviewService {
    db: SqlitePool,
}

impl ReviewService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn add_review(
        &self,
        user: &AuthUser,
        course_id: &str,
        req: NewReviewRequest,
    ) -> Result<Review, AppError> {
        req.validate()?;
        self.require_course(course_id).await?;

        let enrolled =
            enrollments::exists(&self.db, &user.id, course_id, EnrollmentScope::Standing).await?;
        if !enrolled {
            warn!("User {} tried to review course {} without enrollment", user.id, course_id);
            return Err(AppError::NotEnrolled);
        }

        let review = reviews::insert_review(&self.db, &user.id, course_id, req.rating, &req.comment)
            .await
            .map_err(|e| map_unique_violation(e, AppError::DuplicateReview))?;
        info!("User {} rated course {} with {}", user.id, course_id, review.rating);
        Ok(review)
    }

    pub async fn update_review(
        &self,
        user: &AuthUser,
        review_id: &str,
        req: UpdateReviewRequest,
    ) -> Result<Review, AppError> {
        req.validate()?;
        let review = reviews::find_review(&self.db, review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review"))?;
        if review.user_id != user.id {
            return Err(AppError::Permission("only the author can edit a review".to_string()));
        }

        let rating = req.rating.unwrap_or(review.rating);
        let comment = req.comment.unwrap_or(review.comment);
        reviews::update_review(&self.db, review_id, rating, &comment).await?;

        reviews::find_review(&self.db, review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review"))
    }

    pub async fn delete_review(&self, user: &AuthUser, review_id: &str) -> Result<(), AppError> {
        let review = reviews::find_review(&self.db, review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review"))?;
        if review.user_id != user.id && !user.is_admin() {
            return Err(AppError::Permission(
                "only the author or an admin can delete a review".to_string(),
            ));
        }

        reviews::delete_review(&self.db, review_id).await?;
        info!("Review {} deleted by {}", review_id, user.id);
        Ok(())
    }

    pub async fn list_reviews(&self, course_id: &str) -> Result<Vec<Review>, AppError> {
        self.require_course(course_id).await?;
        Ok(reviews::fetch_for_course(&self.db, course_id).await?)
    }

    /// Mean rating rounded to two decimals; 0 with a zero count means "no rating".
    pub async fn average_rating(&self, course_id: &str) -> Result<RatingSummary, AppError> {
        self.require_course(course_id).await?;
        let summary = reviews::rating_summary(&self.db, course_id).await?;
        Ok(RatingSummary {
            average_rating: round2(summary.average_rating),
            review_count: summary.review_count,
        })
    }

    async fn require_course(&self, course_id: &str) -> Result<(), AppError> {
        if catalog::find_course(&self.db, course_id).await?.is_none() {
            return Err(AppError::not_found("Course"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_test_db;
    use crate::models::{AuthUser, Role};
    use crate::services::EnrollmentService;
    use crate::services::testing::{self, student};

    fn review(rating: i64) -> NewReviewRequest {
        NewReviewRequest {
            rating,
            comment: "solid course".to_string(),
        }
    }

    async fn enrolled_course(pool: &SqlitePool, users: &[&str]) -> String {
        let fixture = testing::course_with_lessons(pool, &[1]).await;
        testing::publish(pool, &fixture.course_id).await;
        let enrollment = EnrollmentService::new(pool.clone());
        for user in users {
            enrollment
                .enroll(&student(user), &fixture.course_id)
                .await
                .expect("Failed to enroll");
        }
        fixture.course_id
    }

    #[tokio::test]
    async fn test_review_requires_enrollment() {
        let pool = setup_test_db().await;
        let svc = ReviewService::new(pool.clone());
        let course_id = enrolled_course(&pool, &[]).await;

        let err = svc.add_review(&student("alice"), &course_id, review(5)).await.unwrap_err();
        assert!(matches!(err, AppError::NotEnrolled));
    }

    #[tokio::test]
    async fn test_second_review_is_rejected() {
        let pool = setup_test_db().await;
        let svc = ReviewService::new(pool.clone());
        let course_id = enrolled_course(&pool, &["alice"]).await;

        svc.add_review(&student("alice"), &course_id, review(4)).await.unwrap();
        let err = svc.add_review(&student("alice"), &course_id, review(2)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateReview));

        let summary = svc.average_rating(&course_id).await.unwrap();
        assert_eq!(summary.review_count, 1);
        assert_eq!(summary.average_rating, 4.0);
    }

    #[tokio::test]
    async fn test_rating_out_of_range_is_invalid() {
        let pool = setup_test_db().await;
        let svc = ReviewService::new(pool.clone());
        let course_id = enrolled_course(&pool, &["alice"]).await;

        let err = svc.add_review(&student("alice"), &course_id, review(6)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = svc.add_review(&student("alice"), &course_id, review(0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_average_is_rounded() {
        let pool = setup_test_db().await;
        let svc = ReviewService::new(pool.clone());
        let course_id = enrolled_course(&pool, &["a", "b", "c"]).await;

        assert_eq!(svc.average_rating(&course_id).await.unwrap().average_rating, 0.0);
        svc.add_review(&student("a"), &course_id, review(5)).await.unwrap();
        svc.add_review(&student("b"), &course_id, review(5)).await.unwrap();
        svc.add_review(&student("c"), &course_id, review(4)).await.unwrap();

        let summary = svc.average_rating(&course_id).await.unwrap();
        assert_eq!(summary.average_rating, 4.67);
        assert_eq!(summary.review_count, 3);
        assert_eq!(svc.list_reviews(&course_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_edit_and_delete_permissions() {
        let pool = setup_test_db().await;
        let svc = ReviewService::new(pool.clone());
        let course_id = enrolled_course(&pool, &["alice"]).await;
        let created = svc.add_review(&student("alice"), &course_id, review(3)).await.unwrap();

        let err = svc
            .update_review(&student("bob"), &created.id, UpdateReviewRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));

        let updated = svc
            .update_review(
                &student("alice"),
                &created.id,
                UpdateReviewRequest {
                    rating: Some(5),
                    comment: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rating, 5);
        assert_eq!(updated.comment, "solid course");

        let admin = AuthUser::new("root", Role::Admin);
        svc.delete_review(&admin, &created.id).await.unwrap();
        assert!(svc.list_reviews(&course_id).await.unwrap().is_empty());
    }
}
