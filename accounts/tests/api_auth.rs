// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod common;

use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_TYPE, LOCATION};
use actix_web::test;
use nop_accounts::util::TestConfigBuilder;
use serde_json::Value;

#[actix_web::test]
async fn sign_up_creates_account_and_points_at_profile() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let req = common::sign_up_request("alice", "alice@example.com", "secret1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_string();
    assert!(location.ends_with("/api/users/alice"), "got {}", location);

    let json = common::read_json(resp).await;
    assert_eq!(json.get("success").and_then(Value::as_bool), Some(true));
    assert_eq!(
        json.get("message").and_then(Value::as_str),
        Some("User registered successfully")
    );

    let user = harness
        .user_services
        .get_user_by_username("alice")
        .expect("lookup")
        .expect("registered user");
    assert_eq!(user.roles, vec!["ROLE_USER".to_string()]);
    assert_ne!(user.password_hash, "secret1");
}

#[actix_web::test]
async fn sign_up_rejects_duplicate_username_and_email() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let req = common::sign_up_request("alice", "alice@example.com", "secret1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = common::sign_up_request("alice", "other@example.com", "secret1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = common::read_json(resp).await;
    assert_eq!(json.get("success").and_then(Value::as_bool), Some(false));
    assert_eq!(
        json.get("message").and_then(Value::as_str),
        Some("Username is already taken!")
    );

    let req = common::sign_up_request("alicia", "ALICE@example.com", "secret1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = common::read_json(resp).await;
    assert_eq!(
        json.get("message").and_then(Value::as_str),
        Some("Email Address already in use!")
    );
}

#[actix_web::test]
async fn sign_up_rejects_invalid_fields() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let cases = [
        ("al", "al@example.com", "secret1"),
        ("alice", "not-an-email", "secret1"),
        ("alice", "alice@example.com", "short"),
    ];
    for (username, email, password) in cases {
        let req = common::sign_up_request(username, email, password).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.status(),
            StatusCode::BAD_REQUEST,
            "{} / {} should be rejected",
            username,
            email
        );
    }

    assert!(
        harness
            .user_services
            .list_users()
            .expect("list users")
            .is_empty()
    );
}

#[actix_web::test]
async fn sign_up_without_default_role_in_catalog_fails() {
    let config = TestConfigBuilder::new()
        .with_default_role("ROLE_MISSING")
        .build();
    let harness = common::TestHarness::with_config(config, Vec::new());
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let req = common::sign_up_request("alice", "alice@example.com", "secret1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = common::read_json(resp).await;
    assert_eq!(
        json.get("message").and_then(Value::as_str),
        Some("User Role not set.")
    );
}

#[actix_web::test]
async fn sign_in_accepts_username_or_email() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let req = common::sign_up_request("alice", "alice@example.com", "secret1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = common::sign_in_request("alice", "secret1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = common::read_json(resp).await;
    assert_eq!(
        json.get("tokenType").and_then(Value::as_str),
        Some("Bearer")
    );
    assert!(
        json.get("accessToken")
            .and_then(Value::as_str)
            .is_some_and(|token| !token.is_empty())
    );

    let req = common::sign_in_request("alice@example.com", "secret1").to_request();
    let token = common::access_token(test::call_service(&app, req).await).await;
    assert!(!token.is_empty());
}

#[actix_web::test]
async fn sign_in_failures_are_indistinguishable() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let req = common::sign_up_request("alice", "alice@example.com", "secret1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = common::sign_in_request("alice", "wrong-password").to_request();
    let wrong_password = test::call_service(&app, req).await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = common::read_json(wrong_password).await;

    let req = common::sign_in_request("nobody", "secret1").to_request();
    let unknown_user = test::call_service(&app, req).await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user = common::read_json(unknown_user).await;

    assert_eq!(wrong_password, unknown_user);
}

#[actix_web::test]
async fn sign_in_rejects_blank_fields() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let req = common::sign_in_request("   ", "secret1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.user_services.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .insert_header((CONTENT_TYPE, "application/json"))
        .set_payload("{\"username\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = common::read_json(resp).await;
    assert_eq!(json.get("success").and_then(Value::as_bool), Some(false));

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(serde_json::json!({ "usernameOrEmail": "alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
