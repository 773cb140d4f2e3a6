// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use crate::config::CONFIG_FILE_NAME;
use crate::roles::RoleName;
use openssl::rand::rand_bytes;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WORKERS: u16 = 4;
const JWT_SECRET_BYTES: usize = 32;

/// Writes a default `config.yaml` with a fresh signing secret. Returns false if one exists.
pub fn ensure_config(root: &Path) -> Result<bool, BootstrapError> {
    let config_path = root.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        return Ok(false);
    }

    let jwt_secret = generate_jwt_secret()?;
    let contents = default_config_yaml(&jwt_secret);

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    log_action(format!(
        "created {} listening on {}:{}",
        CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT
    ));

    Ok(true)
}

fn generate_jwt_secret() -> Result<String, BootstrapError> {
    let mut bytes = [0u8; JWT_SECRET_BYTES];
    rand_bytes(&mut bytes).map_err(|err| {
        BootstrapError::Io(io::Error::other(format!(
            "Failed to generate JWT secret: {}",
            err
        )))
    })?;

    Ok(hex::encode(bytes))
}

fn default_config_yaml(jwt_secret: &str) -> String {
    format!(
        "server:\n  host: \"{host}\"\n  port: {port}\n  workers: {workers}\n\nusers:\n  default_role: \"{default_role}\"\n  store_timeout_seconds: 5\n  jwt:\n    secret: \"{jwt_secret}\"\n    issuer: \"nop-accounts\"\n    audience: \"nop-accounts-users\"\n    expiration_seconds: 604800\n    leeway_seconds: 0\n\nlogging:\n  level: \"info\"\n\napp:\n  name: \"NoPressure Accounts\"\n  description: \"User registration and token sign-in service\"\n",
        host = DEFAULT_HOST,
        port = DEFAULT_PORT,
        workers = DEFAULT_WORKERS,
        default_role = RoleName::User.as_str(),
        jwt_secret = jwt_secret,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn default_config_validates() {
        let secret = generate_jwt_secret().expect("secret");
        let config: Config = serde_yaml::from_str(&default_config_yaml(&secret)).unwrap();
        let validated = config.validate().expect("default config should validate");
        assert_eq!(validated.server.port, DEFAULT_PORT);
        assert_eq!(validated.users.jwt.secret, secret);
    }

    #[test]
    fn generated_secrets_differ() {
        let first = generate_jwt_secret().expect("secret");
        let second = generate_jwt_secret().expect("secret");
        assert_eq!(first.len(), JWT_SECRET_BYTES * 2);
        assert_ne!(first, second);
    }
}
