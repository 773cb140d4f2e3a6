// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action, log_warning};
use crate::config::ValidatedConfig;
use crate::roles::{ROLES_FILE_NAME, RoleName, normalize_role};
use crate::runtime_paths::USERS_FILE_NAME;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

#[derive(Deserialize)]
struct UserRecord {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Deserialize)]
struct UsersFileRecord {
    #[serde(default)]
    users: HashMap<String, UserRecord>,
}

/// Seeds `roles.yaml` with the built-in roles, the configured default role, and any
/// role already granted in `users.yaml`.
pub fn ensure_roles(root: &Path, config: &ValidatedConfig) -> Result<bool, BootstrapError> {
    let roles_path = root.join(ROLES_FILE_NAME);
    if roles_path.exists() {
        return Ok(false);
    }

    let mut roles: BTreeSet<String> = RoleName::ALL
        .iter()
        .map(|role| role.as_str().to_string())
        .collect();
    roles.insert(config.users.default_role.clone());

    collect_roles_from_users(&root.join(USERS_FILE_NAME), &mut roles)?;

    let yaml =
        serde_yaml::to_string(&roles).map_err(|err| BootstrapError::Io(io::Error::other(err)))?;
    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&roles_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(yaml.as_bytes())?;
    file.sync_all()?;
    log_action(format!("created {}", roles_path.display()));
    Ok(true)
}

fn collect_roles_from_users(
    users_path: &Path,
    roles: &mut BTreeSet<String>,
) -> Result<(), BootstrapError> {
    if !users_path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(users_path)?;
    if content.trim().is_empty() {
        return Ok(());
    }
    let file: UsersFileRecord =
        serde_yaml::from_str(&content).map_err(|err| BootstrapError::Io(io::Error::other(err)))?;
    for user in file.users.values() {
        for role in &user.roles {
            match normalize_role(role) {
                Ok(normalized) => {
                    roles.insert(normalized);
                }
                Err(err) => {
                    log_warning(format!("Skipping invalid user role '{}': {}", role, err));
                }
            }
        }
    }
    Ok(())
}
