use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

mod common;

use common::{Actor, envelope, init_app};

#[actix_web::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = init_app!(common::services());

    let req = test::TestRequest::get().uri("/api/v1/time-logs").to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = envelope(res).await;
    assert!(!body.success);
}

#[actix_web::test]
async fn test_manual_entry_is_recorded() {
    let app = init_app!(common::services());
    let employee = Actor::employee();
    let project = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs/manual")
        .insert_header(employee.auth())
        .set_json(json!({
            "projectId": project,
            "description": "Client call",
            "duration": "1h 30m",
            "billable": true
        }))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(res.headers().contains_key("x-request-id"));
    let body = envelope(res).await;
    let data = body.data.unwrap();
    assert_eq!(data["duration"], 5400);
    assert_eq!(data["status"], "stopped");
    assert_eq!(data["totalHours"], 1.5);
    assert_eq!(data["userId"], json!(employee.id));
    assert_eq!(data["projectId"], json!(project));
}

#[actix_web::test]
async fn test_manual_entry_rejects_unparseable_duration() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    for duration in ["garbage", "25h", "0"] {
        let req = test::TestRequest::post()
            .uri("/api/v1/time-logs/manual")
            .insert_header(employee.auth())
            .set_json(json!({ "projectId": Uuid::new_v4(), "duration": duration }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", duration);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs/manual")
        .insert_header(employee.auth())
        .set_json(json!({ "duration": "30m" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_long_day_is_split_into_regular_and_overtime() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs")
        .insert_header(employee.auth())
        .set_json(json!({
            "projectId": Uuid::new_v4(),
            "description": "Tender package",
            "startTime": "2025-03-10T08:30:00Z",
            "endTime": "2025-03-10T18:00:00Z"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let data = envelope(res).await.data.unwrap();
    assert_eq!(data["totalHours"], 9.5);
    assert_eq!(data["regularHours"], 8.0);
    assert_eq!(data["overtimeHours"], 1.5);
    assert_eq!(
        data["overtimeReason"],
        "Auto-flagged: clock-out at or after 17:00"
    );
    assert_eq!(data["duration"], 34_200);
}

#[actix_web::test]
async fn test_end_before_start_is_rejected() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs")
        .insert_header(employee.auth())
        .set_json(json!({
            "startTime": "2025-03-10T12:00:00Z",
            "endTime": "2025-03-10T11:00:00Z"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_stopping_an_attached_log_twice_is_idempotent() {
    let app = init_app!(common::services());
    let employee = Actor::employee();
    let project = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs")
        .insert_header(employee.auth())
        .set_json(json!({
            "projectId": project,
            "startTime": "2025-03-10T09:00:00Z"
        }))
        .to_request();
    let running = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    assert_eq!(running["status"], "running");

    let stop = json!({
        "logId": running["id"],
        "projectId": project,
        "startTime": "2025-03-10T09:00:00Z",
        "endTime": "2025-03-10T11:00:00Z",
        "duration": 7200
    });

    let mut ids = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/time-logs")
            .insert_header(employee.auth())
            .set_json(&stop)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let data = envelope(res).await.data.unwrap();
        assert_eq!(data["status"], "stopped");
        assert_eq!(data["totalHours"], 2.0);
        ids.push(data["id"].clone());
    }
    assert_eq!(ids[0], running["id"]);
    assert_eq!(ids[1], running["id"]);

    let req = test::TestRequest::get()
        .uri("/api/v1/time-logs")
        .insert_header(employee.auth())
        .to_request();
    let listed = envelope(test::call_service(&app, req).await).await;
    assert_eq!(listed.data.unwrap().as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_summary_and_listing_are_scoped() {
    let app = init_app!(common::services());
    let employee = Actor::employee();
    let colleague = Actor::employee();
    let manager = Actor::manager();

    for (actor, start, end) in [
        (&employee, "2025-03-10T09:00:00Z", "2025-03-10T12:00:00Z"),
        (&employee, "2025-03-11T09:00:00Z", "2025-03-11T19:00:00Z"),
        (&employee, "2025-03-12T09:00:00Z", "2025-03-12T10:00:00Z"),
        (&colleague, "2025-03-10T09:00:00Z", "2025-03-10T17:00:00Z"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/time-logs")
            .insert_header(actor.auth())
            .set_json(json!({ "startTime": start, "endTime": end, "billable": true }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/time-logs/summary?from=2025-03-10&to=2025-03-11&userId={}",
            colleague.id
        ))
        .insert_header(employee.auth())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let summary = envelope(res).await.data.unwrap();
    assert_eq!(summary["userId"], json!(employee.id));
    assert_eq!(summary["entryCount"], 2);
    assert_eq!(summary["totalHours"], 13.0);
    assert_eq!(summary["regularHours"], 11.0);
    assert_eq!(summary["overtimeHours"], 2.0);
    assert_eq!(summary["billableHours"], 13.0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/time-logs?userId={}", colleague.id))
        .insert_header(manager.auth())
        .to_request();
    let listed = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["userId"], json!(colleague.id));
}

#[actix_web::test]
async fn test_update_recomputes_and_rejects_unknown_fields() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs")
        .insert_header(employee.auth())
        .set_json(json!({
            "startTime": "2025-03-10T09:00:00Z",
            "endTime": "2025-03-10T17:00:00Z"
        }))
        .to_request();
    let created = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/time-logs/{}", id))
        .insert_header(employee.auth())
        .set_json(json!({ "endTime": "2025-03-10T18:30:00Z", "note": "Late review" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = envelope(res).await.data.unwrap();
    assert_eq!(updated["totalHours"], 9.5);
    assert_eq!(updated["overtimeHours"], 1.5);
    assert_eq!(updated["note"], "Late review");

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/time-logs/{}", id))
        .insert_header(employee.auth())
        .set_json(json!({ "totalHours": 20.0 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let stranger = Actor::employee();
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/time-logs/{}", id))
        .insert_header(stranger.auth())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/time-logs/{}", id))
        .insert_header(employee.auth())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/time-logs/{}", id))
        .insert_header(employee.auth())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_creation_bodies_reject_unknown_fields() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs")
        .insert_header(employee.auth())
        .set_json(json!({
            "startTime": "2025-03-10T09:00:00Z",
            "endTime": "2025-03-10T10:00:00Z",
            "totalHours": 40.0
        }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/time-logs/manual")
        .insert_header(employee.auth())
        .set_json(json!({
            "projectId": Uuid::new_v4(),
            "duration": "1h",
            "userId": Actor::employee().id
        }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::get()
        .uri("/api/v1/time-logs")
        .insert_header(employee.auth())
        .to_request();
    let listed = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}
