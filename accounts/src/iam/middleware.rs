// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::Error;
use actix_web::error::InternalError;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{HttpMessage, HttpRequest};
use std::future::{Ready, ready};
use std::pin::Pin;
use std::rc::Rc;

use super::jwt::Claims;
use super::types::User;
use crate::api::errors::{service_error_response, status_for};
use crate::iam::user_services::{UserServiceError, UserServices};
use crate::roles::{RoleName, require_role};

const BEARER_PREFIX: &str = "Bearer ";

/// Trait to add authentication methods to HttpRequest
pub trait AuthRequest {
    fn user_info(&self) -> Option<User>;
    fn jwt_claims(&self) -> Option<Claims>;
    fn has_role(&self, role: RoleName) -> bool;

    /// True when a valid token was presented, even if its account no longer exists.
    fn is_authenticated(&self) -> bool;
}

impl AuthRequest for HttpRequest {
    fn user_info(&self) -> Option<User> {
        self.extensions().get::<User>().cloned()
    }

    fn jwt_claims(&self) -> Option<Claims> {
        self.extensions().get::<Claims>().cloned()
    }

    fn has_role(&self, role: RoleName) -> bool {
        self.user_info()
            .map(|user| require_role(&user, role))
            .unwrap_or(false)
    }

    fn is_authenticated(&self) -> bool {
        self.jwt_claims().is_some()
    }
}

pub fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Rejected tokens yield `None` and the request continues anonymously. Failures on the
/// server side (store, signer configuration) become a 500 instead of a silent 401.
fn authentication_failure(err: &UserServiceError) -> Option<Error> {
    if !status_for(err).is_server_error() {
        log::debug!("Bearer token rejected: {}", err);
        return None;
    }
    let response = service_error_response("Authentication", err);
    Some(InternalError::from_response(err.to_string(), response).into())
}

// JWT Authentication Middleware
pub struct JwtAuthMiddlewareFactory;

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user_services_data = req.app_data::<Data<UserServices>>().cloned();
        let service = self.service.clone();

        Box::pin(async move {
            // Handlers decide whether a missing identity is fatal
            if let (Some(user_services), Some(token)) = (user_services_data, bearer_token(&req)) {
                match user_services.get_ref().authenticate(&token) {
                    Ok((claims, user)) => {
                        match user {
                            Some(user) => {
                                req.extensions_mut().insert(user);
                            }
                            None => {
                                log::debug!(
                                    "Token subject {} no longer resolves to an account",
                                    claims.sub
                                );
                            }
                        }
                        req.extensions_mut().insert(claims);
                    }
                    Err(err) => {
                        if let Some(error) = authentication_failure(&err) {
                            return Err(error);
                        }
                    }
                }
            }

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::IamError;
    use crate::iam::jwt::JwtError;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use serde_json::Value;

    #[test]
    fn rejected_tokens_pass_through() {
        for err in [
            JwtError::InvalidSignature,
            JwtError::Expired,
            JwtError::Malformed("bad".to_string()),
        ] {
            assert!(authentication_failure(&UserServiceError::Token(err)).is_none());
        }
    }

    #[actix_web::test]
    async fn store_failures_become_server_errors() {
        let err = UserServiceError::Store(IamError::FileError("disk gone".to_string()));
        let error = authentication_failure(&err).expect("server error");

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body()).await.expect("body");
        let json: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json.get("success").and_then(Value::as_bool), Some(false));
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("Internal server error")
        );
    }

    #[test]
    fn signer_misconfiguration_is_a_server_error() {
        let err = UserServiceError::Token(JwtError::Configuration("no secret".to_string()));
        assert!(authentication_failure(&err).is_some());
    }
}
