// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::web;

mod auth;
pub mod errors;
pub mod types;
mod user;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(errors::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(errors::query_error_handler))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .route("/signin", web::post().to(auth::sign_in))
                        .route("/signup", web::post().to(auth::sign_up)),
                )
                .service(
                    web::scope("/user")
                        .route("/me", web::get().to(user::get_current_user))
                        .route("/me", web::delete().to(user::delete_current_user))
                        .route(
                            "/checkUsernameAvailability",
                            web::get().to(user::check_username_availability),
                        )
                        .route(
                            "/checkEmailAvailability",
                            web::get().to(user::check_email_availability),
                        ),
                )
                .service(
                    web::scope("/users")
                        .route("/{username}", web::get().to(user::get_user_profile))
                        .route("/{username}", web::put().to(user::update_user_profile)),
                ),
        );
}
