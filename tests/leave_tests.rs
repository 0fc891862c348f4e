use actix_web::{http::StatusCode, test};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

mod common;

use common::{Actor, envelope, init_app};
use workledger::Config;

fn day(offset: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(offset)
}

fn leave_body(start: NaiveDate, end: NaiveDate) -> Value {
    json!({
        "leaveType": "vacation",
        "startDate": start,
        "endDate": end,
        "reason": "Family trip"
    })
}

#[actix_web::test]
async fn test_submit_approve_then_owner_cannot_edit() {
    let app = init_app!(common::services());
    let employee = Actor::employee();
    let manager = Actor::manager();

    let req = test::TestRequest::post()
        .uri("/api/v1/leaves")
        .insert_header(employee.auth())
        .set_json(leave_body(day(7), day(9)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = envelope(res).await.data.unwrap();
    assert_eq!(created["status"], "pending");
    assert_eq!(created["totalDays"], 3);
    assert_eq!(created["userId"], json!(employee.id));
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leaves/{}/approve", id))
        .insert_header(manager.auth())
        .set_json(json!({ "notes": "Approved, enjoy" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let approved = envelope(res).await.data.unwrap();
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["approvedBy"], json!(manager.id));
    assert!(approved["approvedAt"].is_string());
    assert_eq!(approved["notes"], "Approved, enjoy");

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/leaves/{}", id))
        .insert_header(employee.auth())
        .set_json(json!({ "reason": "Changed plans" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = envelope(res).await;
    assert!(!body.success);
    assert!(body.message.unwrap().contains("approved"));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leaves/{}/reject", id))
        .insert_header(manager.auth())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );
}

#[actix_web::test]
async fn test_invalid_dates_are_rejected() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let bodies = [
        leave_body(day(5), day(4)),
        leave_body(day(-1), day(1)),
        json!({ "leaveType": "sick", "startDate": day(1), "endDate": day(1) }),
        json!({ "startDate": day(1), "endDate": day(1), "reason": "Flu" }),
        json!({ "leaveType": "sabbatical", "startDate": day(1), "endDate": day(1), "reason": "x" }),
    ];

    for body in bodies {
        let req = test::TestRequest::post()
            .uri("/api/v1/leaves")
            .insert_header(employee.auth())
            .set_json(&body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[actix_web::test]
async fn test_employees_cannot_resolve() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let req = test::TestRequest::post()
        .uri("/api/v1/leaves")
        .insert_header(employee.auth())
        .set_json(leave_body(day(3), day(3)))
        .to_request();
    let created = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leaves/{}/approve", created["id"].as_str().unwrap()))
        .insert_header(employee.auth())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[actix_web::test]
async fn test_patch_with_unknown_field_is_rejected() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let req = test::TestRequest::post()
        .uri("/api/v1/leaves")
        .insert_header(employee.auth())
        .set_json(leave_body(day(3), day(4)))
        .to_request();
    let created = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/leaves/{}", created["id"].as_str().unwrap()))
        .insert_header(employee.auth())
        .set_json(json!({ "userId": Actor::employee().id }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn test_listing_is_role_filtered() {
    let app = init_app!(common::services());
    let employee = Actor::employee();
    let colleague = Actor::employee();
    let manager = Actor::manager();

    for actor in [&employee, &colleague] {
        let req = test::TestRequest::post()
            .uri("/api/v1/leaves")
            .insert_header(actor.auth())
            .set_json(leave_body(day(2), day(2)))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/leaves")
        .insert_header(employee.auth())
        .to_request();
    let own = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    assert_eq!(own.as_array().unwrap().len(), 1);
    assert_eq!(own[0]["userId"], json!(employee.id));

    let req = test::TestRequest::get()
        .uri("/api/v1/leaves?status=pending")
        .insert_header(manager.auth())
        .to_request();
    let all = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/leaves?status=archived")
        .insert_header(manager.auth())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn test_approval_debits_credits_when_enabled() {
    let config = Config {
        leave_auto_debit: true,
        ..Config::test_config()
    };
    let app = init_app!(common::services_with(&config));
    let employee = Actor::employee();
    let manager = Actor::manager();
    let start = day(30);

    let req = test::TestRequest::post()
        .uri("/api/v1/leave-credits")
        .insert_header(manager.auth())
        .set_json(json!({
            "userId": employee.id,
            "year": start.year(),
            "leaveType": "vacation",
            "totalCredits": 15.0
        }))
        .to_request();
    let balance = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/leaves")
        .insert_header(employee.auth())
        .set_json(leave_body(start, start + Duration::days(4)))
        .to_request();
    let leave = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leaves/{}/approve", leave["id"].as_str().unwrap()))
        .insert_header(manager.auth())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/leave-credits/{}",
            balance["id"].as_str().unwrap()
        ))
        .insert_header(employee.auth())
        .to_request();
    let after = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    assert_eq!(after["usedCredits"], 5.0);
    assert_eq!(after["remainingCredits"], 10.0);
}

#[actix_web::test]
async fn test_owner_may_withdraw_pending_request() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let req = test::TestRequest::post()
        .uri("/api/v1/leaves")
        .insert_header(employee.auth())
        .set_json(leave_body(day(1), day(1)))
        .to_request();
    let created = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    let uri = format!("/api/v1/leaves/{}", created["id"].as_str().unwrap());

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(Actor::employee().auth())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(employee.auth())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(employee.auth())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_submission_rejects_unknown_fields() {
    let app = init_app!(common::services());
    let employee = Actor::employee();

    let mut self_approved = leave_body(day(3), day(4));
    self_approved["status"] = json!("approved");
    let misspelled = json!({
        "leaveType": "vacation",
        "startdate": day(3),
        "endDate": day(4),
        "reason": "Family trip"
    });

    for body in [self_approved, misspelled] {
        let req = test::TestRequest::post()
            .uri("/api/v1/leaves")
            .insert_header(employee.auth())
            .set_json(&body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[actix_web::test]
async fn test_resolution_body_is_optional_but_must_be_valid() {
    let app = init_app!(common::services());
    let employee = Actor::employee();
    let manager = Actor::manager();

    let req = test::TestRequest::post()
        .uri("/api/v1/leaves")
        .insert_header(employee.auth())
        .set_json(leave_body(day(5), day(5)))
        .to_request();
    let created = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    let uri = format!("/api/v1/leaves/{}", created["id"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri(&format!("{}/approve", uri))
        .insert_header(manager.auth())
        .set_json(json!({ "note": "typo in field name" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::post()
        .uri(&format!("{}/approve", uri))
        .insert_header(manager.auth())
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(manager.auth())
        .to_request();
    let still_pending = envelope(test::call_service(&app, req).await)
        .await
        .data
        .unwrap();
    assert_eq!(still_pending["status"], "pending");

    let req = test::TestRequest::post()
        .uri(&format!("{}/approve", uri))
        .insert_header(manager.auth())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(envelope(res).await.data.unwrap()["status"], "approved");
}
