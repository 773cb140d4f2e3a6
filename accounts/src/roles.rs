// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::iam::User;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

pub const ROLES_FILE_NAME: &str = "roles.yaml";
pub const MAX_ROLE_COUNT: usize = 64;
pub const MAX_ROLE_CHARS: usize = 64;

/// Roles the service itself knows how to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleName {
    User,
    Admin,
}

impl RoleName {
    pub const ALL: [RoleName; 2] = [RoleName::User, RoleName::Admin];

    pub const fn as_str(&self) -> &'static str {
        match self {
            RoleName::User => "ROLE_USER",
            RoleName::Admin => "ROLE_ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit authorization check called at the top of protected handlers.
pub fn require_role(user: &User, role: RoleName) -> bool {
    user.roles.iter().any(|held| held == role.as_str())
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RoleValidationError {
    message: String,
}

impl RoleValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn normalize_role(role: &str) -> Result<String, RoleValidationError> {
    let trimmed = role.trim();
    if trimmed.is_empty() {
        return Err(RoleValidationError::new("Role is required"));
    }
    if trimmed.chars().count() > MAX_ROLE_CHARS {
        return Err(RoleValidationError::new(format!(
            "Role must be at most {} characters",
            MAX_ROLE_CHARS
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RoleValidationError::new(format!(
            "Role '{}' contains invalid characters",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

pub fn normalize_roles(roles: &[String]) -> Result<Vec<String>, RoleValidationError> {
    if roles.len() > MAX_ROLE_COUNT {
        return Err(RoleValidationError::new(format!(
            "Roles must be at most {} entries",
            MAX_ROLE_COUNT
        )));
    }
    let mut normalized = Vec::with_capacity(roles.len());
    for role in roles {
        normalized.push(normalize_role(role)?);
    }
    Ok(normalized)
}

#[derive(Debug, thiserror::Error)]
pub enum RoleCatalogError {
    #[error("Failed to read roles file: {0}")]
    Read(String),
    #[error("Failed to parse roles file: {0}")]
    Parse(String),
}

/// Source of the roles that may be granted to accounts.
pub trait RoleCatalog: Send + Sync {
    fn find_by_name(&self, name: &str) -> Result<Option<String>, RoleCatalogError>;
}

/// Reads `roles.yaml` on every lookup so edits apply without a restart.
pub struct FileRoleCatalog {
    roles_file: PathBuf,
}

impl FileRoleCatalog {
    pub fn new(roles_file: PathBuf) -> Self {
        Self { roles_file }
    }

    fn load(&self) -> Result<BTreeSet<String>, RoleCatalogError> {
        let content = match std::fs::read_to_string(&self.roles_file) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Roles file {} is missing", self.roles_file.display());
                return Ok(BTreeSet::new());
            }
            Err(err) => return Err(RoleCatalogError::Read(err.to_string())),
        };
        if content.trim().is_empty() {
            return Ok(BTreeSet::new());
        }
        let roles: Vec<String> = serde_yaml::from_str(&content)
            .map_err(|err| RoleCatalogError::Parse(err.to_string()))?;
        let mut catalog = BTreeSet::new();
        for role in roles {
            match normalize_role(&role) {
                Ok(normalized) => {
                    catalog.insert(normalized);
                }
                Err(err) => log::warn!("Skipping invalid role '{}': {}", role, err),
            }
        }
        Ok(catalog)
    }
}

impl RoleCatalog for FileRoleCatalog {
    fn find_by_name(&self, name: &str) -> Result<Option<String>, RoleCatalogError> {
        Ok(self.load()?.take(name))
    }
}

pub struct StaticRoleCatalog {
    roles: BTreeSet<String>,
}

impl StaticRoleCatalog {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_builtin_roles() -> Self {
        Self::new(RoleName::ALL.iter().map(|role| role.as_str()))
    }
}

impl RoleCatalog for StaticRoleCatalog {
    fn find_by_name(&self, name: &str) -> Result<Option<String>, RoleCatalogError> {
        Ok(self.roles.get(name).cloned())
    }
}
