// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::errors::{forbidden, service_error_response, status_response, unauthorized};
use super::types::{
    ApiResponse, EmailQuery, UpdateProfileRequest, UserIdentityAvailability, UserProfile,
    UsernameQuery,
};
use crate::iam::{AuthRequest, User, UserServices};
use crate::roles::RoleName;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Result, web};

/// Resolves the caller and applies the `ROLE_USER` guard. `Err` carries the response to send.
fn require_user(req: &HttpRequest) -> std::result::Result<User, HttpResponse> {
    if !req.is_authenticated() {
        return Err(unauthorized());
    }
    let Some(user) = req.user_info() else {
        // Token still verifies but its account was deleted
        return Err(status_response(StatusCode::NOT_FOUND, "User not found"));
    };
    if !req.has_role(RoleName::User) {
        log::warn!("User {} lacks {}", user.username, RoleName::User);
        return Err(forbidden());
    }
    Ok(user)
}

pub(super) async fn get_current_user(
    req: HttpRequest,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };

    match user_services.get_profile(user.id) {
        Ok(view) => Ok(HttpResponse::Ok().json(UserProfile::from(view))),
        Err(err) => Ok(service_error_response("Profile lookup", &err)),
    }
}

pub(super) async fn delete_current_user(
    req: HttpRequest,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };

    match user_services.delete_profile(user.id).await {
        Ok(()) => Ok(HttpResponse::Created().json(ApiResponse {
            success: true,
            message: "User deleted successfully".to_string(),
        })),
        Err(err) => Ok(service_error_response("Profile deletion", &err)),
    }
}

pub(super) async fn check_username_availability(
    query: web::Query<UsernameQuery>,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    match user_services.check_username_availability(&query.username) {
        Ok(available) => Ok(HttpResponse::Ok().json(UserIdentityAvailability { available })),
        Err(err) => Ok(service_error_response("Username availability", &err)),
    }
}

pub(super) async fn check_email_availability(
    query: web::Query<EmailQuery>,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    match user_services.check_email_availability(&query.email) {
        Ok(available) => Ok(HttpResponse::Ok().json(UserIdentityAvailability { available })),
        Err(err) => Ok(service_error_response("Email availability", &err)),
    }
}

pub(super) async fn get_user_profile(
    path: web::Path<String>,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    match user_services.get_profile_by_username(&path) {
        Ok(view) => Ok(HttpResponse::Ok().json(UserProfile::from(view))),
        Err(err) => Ok(service_error_response("Profile lookup", &err)),
    }
}

/// Owners may edit their own profile; `ROLE_ADMIN` may edit any.
pub(super) async fn update_user_profile(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<UpdateProfileRequest>,
    user_services: web::Data<UserServices>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };

    let username = path.into_inner();
    if user.username != username && !req.has_role(RoleName::Admin) {
        log::warn!(
            "User {} attempted to update profile of {}",
            user.username,
            username
        );
        return Ok(forbidden());
    }

    match user_services
        .update_profile(&username, payload.into_inner().into())
        .await
    {
        Ok(_) => Ok(HttpResponse::Created().json(ApiResponse {
            success: true,
            message: "User profile updated successfully".to_string(),
        })),
        Err(err) => Ok(service_error_response("Profile update", &err)),
    }
}
