mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use common::{ALICE, BOB, INSTRUCTOR, create_test_app};

#[tokio::test]
async fn health_check_reports_ok() {
    let app = create_test_app().await;
    let (status, _) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn draft_courses_are_hidden_until_published() {
    let app = create_test_app().await;
    let course_id = app.create_course(json!({})).await;

    let (status, body) = app.get("/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = app.get(&format!("/courses/{}", course_id), Some(ALICE)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&format!("/courses/{}", course_id), Some(INSTRUCTOR)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    app.publish(&course_id).await;

    let (_, body) = app.get("/courses?search=RUST", None).await;
    let courses = body["data"].as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["is_published"], true);
}

#[tokio::test]
async fn lesson_completion_drives_course_progress() {
    let app = create_test_app().await;
    let (course_id, _, lessons) = app.published_course(3, json!({})).await;

    let (status, body) = app
        .post(&format!("/courses/{}/enroll", course_id), Some(ALICE), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["enrollment"]["status"], "active");

    for lesson_id in &lessons[..2] {
        let (status, body) = app
            .post(&format!("/lessons/{}/complete", lesson_id), Some(ALICE), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let (status, body) = app
        .get(&format!("/courses/{}/progress", course_id), Some(ALICE))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["overall"]["percentage"], 66.67);
    assert_eq!(body["data"]["status"], "active");

    let (_, body) = app
        .post(&format!("/lessons/{}/complete", lessons[2]), Some(ALICE), json!({}))
        .await;
    assert_eq!(body["data"]["progress"]["percentage"], 100.0);
    assert_eq!(body["data"]["course_completed"], true);
    assert_eq!(body["data"]["enrollment_status"], "completed");
    assert!(body["data"]["next_lesson_id"].is_null());

    let (_, body) = app
        .get(&format!("/courses/{}/enrollment", course_id), Some(ALICE))
        .await;
    assert_eq!(body["data"]["enrollment"]["status"], "completed");
    assert!(body["data"]["enrollment"]["completed_at"].is_string());
}

#[tokio::test]
async fn re_enrolling_reuses_the_dropped_enrollment() {
    let app = create_test_app().await;
    let (course_id, _, _) = app.published_course(2, json!({})).await;

    let (status, _) = app
        .post(&format!("/courses/{}/enroll", course_id), Some(ALICE), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(&format!("/courses/{}/unenroll", course_id), Some(ALICE), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "dropped");

    let (status, body) = app
        .post(&format!("/courses/{}/enroll", course_id), Some(ALICE), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["reactivated"], true);
    assert_eq!(body["data"]["enrollment"]["status"], "active");

    let (_, body) = app
        .get(&format!("/courses/{}/enrollments", course_id), Some(INSTRUCTOR))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn capacity_is_enforced() {
    let app = create_test_app().await;
    let (course_id, _, _) = app.published_course(1, json!({ "max_students": 1 })).await;

    let (status, _) = app
        .post(&format!("/courses/{}/enroll", course_id), Some(ALICE), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(&format!("/courses/{}/enroll", course_id), Some(BOB), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "capacity_reached");
}

#[tokio::test]
async fn reorder_deletes_omitted_sections() {
    let app = create_test_app().await;
    let course_id = app.create_course(json!({})).await;
    let module_id = app.create_module(&course_id, "Basics").await;
    let first = app.create_section(&module_id, "First").await;
    let second = app.create_section(&module_id, "Second").await;
    let third = app.create_section(&module_id, "Third").await;

    let (status, body) = app
        .put(
            &format!("/modules/{}/sections/order", module_id),
            Some(INSTRUCTOR),
            json!({ "ids": [third, first] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = app
        .get(&format!("/modules/{}/sections", module_id), Some(INSTRUCTOR))
        .await;
    let sections = body["data"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["id"], third.as_str());
    assert_eq!(sections[0]["order"], 1);
    assert_eq!(sections[1]["id"], first.as_str());
    assert_eq!(sections[1]["order"], 2);
    assert!(sections.iter().all(|s| s["id"] != second.as_str()));
}

#[tokio::test]
async fn enrolled_learner_reads_section_content() {
    let app = create_test_app().await;
    let course_id = app.create_course(json!({})).await;
    let module_id = app.create_module(&course_id, "Basics").await;
    let (status, body) = app
        .post(
            &format!("/modules/{}/sections", module_id),
            Some(INSTRUCTOR),
            json!({ "title": "Intro video", "video": "https://youtu.be/dQw4w9WgXcQ" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["content_type"], "video");
    let section_id = body["data"]["id"].as_str().unwrap().to_string();
    app.publish(&course_id).await;

    let (status, body) = app
        .get(&format!("/sections/{}/content", section_id), Some(ALICE))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "not_enrolled");

    app.post(&format!("/courses/{}/enroll", course_id), Some(ALICE), json!({}))
        .await;

    let (status, body) = app
        .get(&format!("/sections/{}/content", section_id), Some(ALICE))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["kind"], "video");
    assert!(body["data"]["video"].is_object());
}

#[tokio::test]
async fn reviews_and_rating() {
    let app = create_test_app().await;
    let (course_id, _, _) = app.published_course(1, json!({})).await;

    for token in [ALICE, BOB] {
        app.post(&format!("/courses/{}/enroll", course_id), Some(token), json!({}))
            .await;
    }

    let (status, body) = app
        .post(
            &format!("/courses/{}/reviews", course_id),
            Some(ALICE),
            json!({ "rating": 5, "comment": "Great" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, _) = app
        .post(
            &format!("/courses/{}/reviews", course_id),
            Some(BOB),
            json!({ "rating": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            &format!("/courses/{}/reviews", course_id),
            Some(ALICE),
            json!({ "rating": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "duplicate_review");

    let (_, body) = app.get(&format!("/courses/{}/rating", course_id), None).await;
    assert_eq!(body["data"]["average_rating"], 4.5);
    assert_eq!(body["data"]["review_count"], 2);
}

#[tokio::test]
async fn pdf_upload_is_served_through_the_blob_store() {
    let app = create_test_app().await;
    let (course_id, section_id, _) = app.published_course(1, json!({})).await;

    let upload = |content_type: &str, body: &'static [u8]| {
        Request::builder()
            .method("PUT")
            .uri(format!("/sections/{}/document?filename=notes.pdf", section_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", INSTRUCTOR))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    };

    let (status, body) = app.send(upload("text/plain", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = app.send(upload("application/pdf", b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["content_type"], "pdf");

    app.post(&format!("/courses/{}/enroll", course_id), Some(ALICE), json!({}))
        .await;
    let (status, body) = app
        .get(&format!("/sections/{}/content", section_id), Some(ALICE))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["kind"], "pdf");
    let url = body["data"]["document"]["url"].as_str().unwrap();
    assert!(url.starts_with("memory://sections/"));
    assert!(url.ends_with("-notes.pdf"));
}
