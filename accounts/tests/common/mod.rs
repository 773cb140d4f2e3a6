// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, test, web};
use chrono::Utc;
use nop_accounts::api;
use nop_accounts::config::ValidatedConfig;
use nop_accounts::iam::{
    Argon2PasswordHasher, JwtAuthMiddlewareFactory, MemoryUserStore, PasswordHasher, User,
    UserServices,
};
use nop_accounts::roles::{RoleName, StaticRoleCatalog};
use nop_accounts::util::TestConfigBuilder;
use serde_json::{Value, json};
use std::sync::Arc;

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_EMAIL: &str = "root@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestHarness {
    pub config: ValidatedConfig,
    pub user_services: web::Data<UserServices>,
}

impl TestHarness {
    /// Empty store, built-in roles only.
    pub fn new() -> Self {
        Self::with_users(Vec::new())
    }

    /// Store seeded with one `ROLE_USER` + `ROLE_ADMIN` account.
    pub fn with_admin() -> Self {
        let config = TestConfigBuilder::new().build();
        let hasher =
            Argon2PasswordHasher::new(config.users.password.clone()).expect("password hasher");
        let admin = User {
            id: 1,
            username: ADMIN_USERNAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            first_name: "Root".to_string(),
            last_name: "Admin".to_string(),
            password_hash: hasher.hash(ADMIN_PASSWORD).expect("hash"),
            roles: vec![
                RoleName::User.as_str().to_string(),
                RoleName::Admin.as_str().to_string(),
            ],
            created_at: Utc::now(),
        };
        Self::with_users(vec![admin])
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self::with_config(TestConfigBuilder::new().build(), users)
    }

    pub fn with_config(config: ValidatedConfig, users: Vec<User>) -> Self {
        let store = Arc::new(MemoryUserStore::from_users(users));
        let role_catalog = Arc::new(StaticRoleCatalog::with_builtin_roles());
        let user_services =
            UserServices::new_with_store(&config, store, role_catalog).expect("user services");

        Self {
            config,
            user_services: web::Data::new(user_services),
        }
    }
}

pub fn build_test_app(
    user_services: web::Data<UserServices>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(user_services)
        .wrap(JwtAuthMiddlewareFactory)
        .configure(api::configure)
}

pub fn sign_up_body(username: &str, email: &str, password: &str) -> Value {
    json!({
        "firstName": "Alice",
        "lastName": "Liddell",
        "username": username,
        "email": email,
        "password": password,
    })
}

pub fn with_bearer(request: test::TestRequest, token: &str) -> test::TestRequest {
    request.insert_header((AUTHORIZATION, format!("Bearer {}", token)))
}

pub async fn read_json(resp: ServiceResponse) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("json body")
}

pub fn sign_up_request(username: &str, email: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(sign_up_body(username, email, password))
}

pub fn sign_in_request(username_or_email: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({
            "usernameOrEmail": username_or_email,
            "password": password,
        }))
}

/// Extracts the bearer token from a successful sign-in response.
pub async fn access_token(resp: ServiceResponse) -> String {
    assert_eq!(resp.status(), StatusCode::OK);
    let json = read_json(resp).await;
    json.get("accessToken")
        .and_then(Value::as_str)
        .expect("access token")
        .to_string()
}
