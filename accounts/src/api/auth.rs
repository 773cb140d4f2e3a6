// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::errors::service_error_response;
use super::types::{ApiResponse, JwtAuthenticationResponse, SignInRequest, SignUpRequest};
use crate::iam::UserServices;
use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse, Result, web};

pub(super) async fn sign_in(
    payload: web::Json<SignInRequest>,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    match user_services.sign_in(&payload.username_or_email, &payload.password) {
        Ok(token) => Ok(HttpResponse::Ok().json(JwtAuthenticationResponse::bearer(token))),
        Err(err) => Ok(service_error_response("Sign-in", &err)),
    }
}

pub(super) async fn sign_up(
    req: HttpRequest,
    payload: web::Json<SignUpRequest>,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    let user = match user_services.register(payload.into_inner().into()).await {
        Ok(user) => user,
        Err(err) => return Ok(service_error_response("Sign-up", &err)),
    };

    let location = {
        let connection = req.connection_info();
        format!(
            "{}://{}/api/users/{}",
            connection.scheme(),
            connection.host(),
            user.username
        )
    };

    Ok(HttpResponse::Created()
        .insert_header((LOCATION, location))
        .json(ApiResponse {
            success: true,
            message: "User registered successfully".to_string(),
        }))
}
