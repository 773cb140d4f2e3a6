// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use crate::config::{
    AppConfig, Argon2Params, JwtConfig, LoggingConfig, ServerConfig, ValidatedConfig,
    ValidatedUsersConfig,
};
use crate::roles::RoleName;

pub const TEST_JWT_SECRET: &str = "test-secret-0123456789abcdef0123456789";

// Cheap Argon2id cost for tests
pub const TEST_ARGON2_PARAMS: Argon2Params = Argon2Params {
    memory_kib: 8192,
    iterations: 1,
    parallelism: 1,
    output_len: 32,
    salt_len: 16,
};

#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: ValidatedConfig,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ValidatedConfig {
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 5466,
                    workers: 1,
                },
                users: ValidatedUsersConfig {
                    default_role: RoleName::User.as_str().to_string(),
                    store_timeout_seconds: 5,
                    jwt: JwtConfig {
                        secret: TEST_JWT_SECRET.to_string(),
                        issuer: "nop-accounts".to_string(),
                        audience: "nop-accounts-users".to_string(),
                        expiration_seconds: 3600,
                        leeway_seconds: 0,
                    },
                    password: TEST_ARGON2_PARAMS,
                },
                logging: LoggingConfig {
                    level: "info".to_string(),
                },
                app: AppConfig {
                    name: "Test App".to_string(),
                    description: "Test Description".to_string(),
                },
            },
        }
    }

    pub fn with_default_role(mut self, role: &str) -> Self {
        self.config.users.default_role = role.to_string();
        self
    }

    pub fn with_token_lifetime(mut self, expiration_seconds: u64) -> Self {
        self.config.users.jwt.expiration_seconds = expiration_seconds;
        self
    }

    pub fn with_jwt_secret(mut self, secret: &str) -> Self {
        self.config.users.jwt.secret = secret.to_string();
        self
    }

    pub fn build(self) -> ValidatedConfig {
        self.config
    }
}

pub fn test_config() -> ValidatedConfig {
    TestConfigBuilder::new().build()
}
