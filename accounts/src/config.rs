// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::roles::{RoleName, normalize_role};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const MIN_JWT_SECRET_BYTES: usize = 32;
pub const MAX_JWT_LEEWAY_SECONDS: u64 = 300;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    LoadError(String),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub users: UsersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub users: ValidatedUsersConfig,
    pub logging: LoggingConfig,
    pub app: AppConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl ServerConfig {
    pub fn address_tuple(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UsersConfig {
    #[serde(default = "default_role")]
    pub default_role: String,
    #[serde(default = "default_store_timeout_seconds")]
    pub store_timeout_seconds: u64,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: Argon2ParamsConfig,
}

fn default_role() -> String {
    RoleName::User.as_str().to_string()
}

fn default_store_timeout_seconds() -> u64 {
    5
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
    #[serde(default = "default_jwt_expiration_seconds")]
    pub expiration_seconds: u64, // Fixed lifetime, no sliding refresh
    #[serde(default)]
    pub leeway_seconds: u64, // Clock skew tolerance on expiry
}

fn default_jwt_issuer() -> String {
    "nop-accounts".to_string()
}

fn default_jwt_audience() -> String {
    "nop-accounts-users".to_string()
}

fn default_jwt_expiration_seconds() -> u64 {
    604_800
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Argon2ParamsConfig {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
    pub output_len: Option<u32>,
    pub salt_len: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ValidatedUsersConfig {
    pub default_role: String,
    pub store_timeout_seconds: u64,
    pub jwt: JwtConfig,
    pub password: Argon2Params,
}

impl ValidatedUsersConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub output_len: u32,
    pub salt_len: u32,
}

pub const DEFAULT_ARGON2_PARAMS: Argon2Params = Argon2Params {
    memory_kib: 65536,
    iterations: 3,
    parallelism: 1,
    output_len: 32,
    salt_len: 16,
};

impl Argon2Params {
    fn resolve(
        label: &str,
        config: &Argon2ParamsConfig,
        defaults: Argon2Params,
    ) -> Result<Self, ConfigError> {
        let resolved = Argon2Params {
            memory_kib: config.memory_kib.unwrap_or(defaults.memory_kib),
            iterations: config.iterations.unwrap_or(defaults.iterations),
            parallelism: config.parallelism.unwrap_or(defaults.parallelism),
            output_len: config.output_len.unwrap_or(defaults.output_len),
            salt_len: config.salt_len.unwrap_or(defaults.salt_len),
        };

        if resolved.memory_kib == 0
            || resolved.iterations == 0
            || resolved.parallelism == 0
            || resolved.output_len == 0
            || resolved.salt_len == 0
        {
            return Err(ConfigError::ValidationError(format!(
                "Argon2id params for {} must be non-zero",
                label
            )));
        }

        if resolved.salt_len < 8 {
            return Err(ConfigError::ValidationError(format!(
                "Argon2id salt_len for {} must be at least 8 bytes, got {}",
                label, resolved.salt_len
            )));
        }

        let output_len = usize::try_from(resolved.output_len).map_err(|_| {
            ConfigError::ValidationError(format!(
                "Argon2id output_len for {} is too large: {}",
                label, resolved.output_len
            ))
        })?;

        if let Err(err) = argon2::Params::new(
            resolved.memory_kib,
            resolved.iterations,
            resolved.parallelism,
            Some(output_len),
        ) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid Argon2id params for {}: {}",
                label, err
            )));
        }

        Ok(resolved)
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        Self::validate_server(&self.server)?;
        Self::validate_jwt(&self.users.jwt)?;
        Self::validate_logging(&self.logging)?;

        let default_role = normalize_role(&self.users.default_role).map_err(|err| {
            ConfigError::ValidationError(format!("users.default_role is invalid: {}", err))
        })?;

        if self.users.store_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "users.store_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let password =
            Argon2Params::resolve("users.password", &self.users.password, DEFAULT_ARGON2_PARAMS)?;

        Ok(ValidatedConfig {
            server: self.server,
            users: ValidatedUsersConfig {
                default_role,
                store_timeout_seconds: self.users.store_timeout_seconds,
                jwt: self.users.jwt,
                password,
            },
            logging: self.logging,
            app: self.app,
        })
    }

    fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
        if server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host cannot be empty".to_string(),
            ));
        }
        if server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be greater than 0".to_string(),
            ));
        }
        if server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_jwt(jwt: &JwtConfig) -> Result<(), ConfigError> {
        if jwt.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "users.jwt.secret cannot be empty".to_string(),
            ));
        }
        if jwt.secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::ValidationError(format!(
                "users.jwt.secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }
        if jwt.expiration_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "users.jwt.expiration_seconds must be greater than 0".to_string(),
            ));
        }
        if jwt.leeway_seconds > MAX_JWT_LEEWAY_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "users.jwt.leeway_seconds must be at most {}, got: {}",
                MAX_JWT_LEEWAY_SECONDS, jwt.leeway_seconds
            )));
        }
        if jwt.issuer.trim().is_empty() || jwt.audience.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "users.jwt issuer and audience cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let level = logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got: {}",
                LOG_LEVELS.join(", "),
                logging.level
            )));
        }
        Ok(())
    }
}

impl ValidatedConfig {
    pub fn is_localhost_only(&self) -> bool {
        ["127.0.0.1", "localhost", "::1"].contains(&self.server.host.as_str())
    }
}
