// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::ApiResponse;
use crate::iam::UserServiceError;
use crate::iam::jwt::JwtError;
use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};

pub fn status_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        success: false,
        message: message.into(),
    })
}

pub fn unauthorized() -> HttpResponse {
    status_response(
        StatusCode::UNAUTHORIZED,
        "Full authentication is required to access this resource",
    )
}

pub fn forbidden() -> HttpResponse {
    status_response(
        StatusCode::FORBIDDEN,
        "You don't have permission to access this resource",
    )
}

pub fn status_for(err: &UserServiceError) -> StatusCode {
    match err {
        UserServiceError::Validation(_)
        | UserServiceError::UsernameTaken
        | UserServiceError::EmailTaken => StatusCode::BAD_REQUEST,
        UserServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        UserServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        UserServiceError::Token(
            JwtError::InvalidSignature | JwtError::Expired | JwtError::Malformed(_),
        ) => StatusCode::UNAUTHORIZED,
        UserServiceError::Token(_)
        | UserServiceError::RoleConfigurationMissing
        | UserServiceError::Password(_)
        | UserServiceError::Store(_)
        | UserServiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps a flow failure onto a status and the `{success:false, message}` body.
/// Server-side details are logged, not returned.
pub fn service_error_response(context: &str, err: &UserServiceError) -> HttpResponse {
    let status = status_for(err);
    if status.is_server_error() {
        log::error!("{} failed: {}", context, err);
        let message = match err {
            UserServiceError::RoleConfigurationMissing => err.to_string(),
            _ => "Internal server error".to_string(),
        };
        return status_response(status, message);
    }

    log::warn!("{} rejected: {}", context, err);
    status_response(status, err.to_string())
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Malformed JSON payload: {}", err);
    let response = status_response(StatusCode::BAD_REQUEST, format!("Invalid request: {}", err));
    InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Malformed query string: {}", err);
    let response = status_response(StatusCode::BAD_REQUEST, format!("Invalid request: {}", err));
    InternalError::from_response(err, response).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::{IamError, PasswordError};

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            status_for(&UserServiceError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&UserServiceError::UsernameTaken),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&UserServiceError::EmailTaken),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&UserServiceError::NotFound("gone".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&UserServiceError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&UserServiceError::Token(JwtError::Expired)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn server_errors_map_to_500() {
        assert_eq!(
            status_for(&UserServiceError::RoleConfigurationMissing),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&UserServiceError::Store(IamError::StoreTimeout)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&UserServiceError::Token(JwtError::TokenCreation(
                "boom".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&UserServiceError::Password(PasswordError::HashError(
                "boom".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn internal_details_are_not_exposed() {
        let response = service_error_response(
            "Test",
            &UserServiceError::Store(IamError::FileError("/secret/path".to_string())),
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = actix_web::body::to_bytes(response.into_body())
            .await
            .unwrap();
        let parsed: ApiResponse = serde_json::from_slice(&body).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.message, "Internal server error");
    }
}
