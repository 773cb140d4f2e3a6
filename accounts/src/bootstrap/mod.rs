// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{Config, ConfigError, ValidatedConfig};
use crate::runtime_paths::RuntimePaths;
use std::path::Path;

pub mod config;
pub mod roles;
pub mod root_guard;
pub mod users;

#[derive(Debug)]
pub struct BootstrapResult {
    pub validated_config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
    pub created_config: bool,
    pub created_users: bool,
    pub created_roles: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("Bootstrap I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Prepares a runtime root: creates missing files, then loads and validates them.
pub fn bootstrap_runtime(root: &Path) -> Result<BootstrapResult, BootstrapError> {
    let root_path = root_guard::ensure_root_is_clean(root)?;

    let created_config = config::ensure_config(&root_path)?;

    let validated_config = Config::load_and_validate(&root_path)?;

    let created_users = users::ensure_users(&root_path)?;

    let created_roles = roles::ensure_roles(&root_path, &validated_config)?;

    let runtime_paths = RuntimePaths::from_root(&root_path)?;

    Ok(BootstrapResult {
        validated_config,
        runtime_paths,
        created_config,
        created_users,
        created_roles,
    })
}

pub(crate) fn log_action(message: impl AsRef<str>) {
    eprintln!("[bootstrap] {}", message.as_ref());
}

pub(crate) fn log_warning(message: impl AsRef<str>) {
    eprintln!("[bootstrap] WARNING: {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::types::YamlUsersFile;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::fs;

    #[test]
    fn bootstrap_creates_defaults_when_missing() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-default").unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");

        assert!(result.created_config);
        assert!(result.created_users);
        assert!(result.created_roles);

        let config = &result.validated_config;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.users.default_role, "ROLE_USER");
        assert_eq!(config.users.jwt.secret.len(), 64);
        assert!(
            config
                .users
                .jwt
                .secret
                .chars()
                .all(|ch| ch.is_ascii_hexdigit())
        );

        let users_content = fs::read_to_string(fixture.path().join("users.yaml")).unwrap();
        let users: YamlUsersFile = serde_yaml::from_str(&users_content).unwrap();
        assert!(users.users.is_empty());

        let roles_content = fs::read_to_string(fixture.path().join("roles.yaml")).unwrap();
        let roles: Vec<String> = serde_yaml::from_str(&roles_content).unwrap();
        assert_eq!(roles, vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()]);

        assert_eq!(
            result.runtime_paths.users_file,
            result.runtime_paths.root.join("users.yaml")
        );
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-idempotent").unwrap();
        let first = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(first.created_config);

        let config_path = fixture.path().join("config.yaml");
        let users_path = fixture.path().join("users.yaml");
        let roles_path = fixture.path().join("roles.yaml");
        let config_before = fs::read_to_string(&config_path).unwrap();
        let users_before = fs::read_to_string(&users_path).unwrap();
        let roles_before = fs::read_to_string(&roles_path).unwrap();

        let second = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!second.created_config);
        assert!(!second.created_users);
        assert!(!second.created_roles);

        assert_eq!(config_before, fs::read_to_string(&config_path).unwrap());
        assert_eq!(users_before, fs::read_to_string(&users_path).unwrap());
        assert_eq!(roles_before, fs::read_to_string(&roles_path).unwrap());
        assert_eq!(
            first.validated_config.users.jwt.secret,
            second.validated_config.users.jwt.secret
        );
    }

    #[test]
    fn bootstrap_keeps_existing_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-existing").unwrap();
        let config_path = fixture.path().join("config.yaml");
        let config = "server:\n  host: \"127.0.0.1\"\n  port: 9090\n  workers: 1\n\nusers:\n  default_role: \"ROLE_USER\"\n  jwt:\n    secret: \"0123456789abcdef0123456789abcdef\"\n    expiration_seconds: 60\n\napp:\n  name: \"Accounts\"\n  description: \"Existing\"\n";
        fs::write(&config_path, config).unwrap();

        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!result.created_config);
        assert_eq!(result.validated_config.server.port, 9090);
        assert_eq!(result.validated_config.users.jwt.expiration_seconds, 60);
        assert_eq!(config, fs::read_to_string(&config_path).unwrap());
    }

    #[test]
    fn bootstrap_rejects_invalid_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-invalid").unwrap();
        fs::write(
            fixture.path().join("config.yaml"),
            "server:\n  host: \"127.0.0.1\"\n  port: 8080\n\nusers:\n  jwt:\n    secret: \"short\"\n\napp:\n  name: \"Accounts\"\n  description: \"Bad\"\n",
        )
        .unwrap();

        let error = bootstrap_runtime(fixture.path()).expect_err("bootstrap should fail");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(!fixture.path().join("users.yaml").exists());
    }

    #[test]
    fn bootstrap_rejects_unexpected_root_entries() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-unexpected").unwrap();
        fs::write(fixture.path().join("notes.txt"), "do not use").unwrap();

        let error = bootstrap_runtime(fixture.path()).expect_err("bootstrap should fail");
        let message = error.to_string();
        assert!(message.contains("unexpected entries"));
        assert!(message.contains("notes.txt"));
    }
}
