// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{IamError, User, UserDirectory, UsersData, YamlUser, YamlUsersFile};
use crate::roles::normalize_roles;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Persistence for the full set of accounts. Callers serialize writes.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<UserDirectory, IamError>;
    fn save(&self, directory: &UserDirectory) -> Result<(), IamError>;
}

pub struct FileUserStore {
    users_file: PathBuf,
}

impl FileUserStore {
    pub fn new(users_file: PathBuf) -> Result<Self, IamError> {
        if users_file.as_os_str().is_empty() {
            return Err(IamError::ConfigurationError(
                "Users file path is empty".to_string(),
            ));
        }

        Ok(Self { users_file })
    }

    fn parse_users(content: &str) -> Result<UserDirectory, IamError> {
        if content.trim().is_empty() {
            return Ok(UserDirectory::default());
        }
        let file: YamlUsersFile = serde_yaml::from_str(content)
            .map_err(|e| IamError::ParseError(format!("Failed to parse users file: {}", e)))?;

        let mut users_data = UsersData::with_capacity(file.users.len());
        let mut seen_ids = std::collections::HashSet::new();
        for (username, yaml_user) in file.users {
            if !seen_ids.insert(yaml_user.id) {
                return Err(IamError::ParseError(format!(
                    "Duplicate user id {} in users file",
                    yaml_user.id
                )));
            }
            let mut user = yaml_user.into_user(username.clone());
            user.roles = normalize_roles(&user.roles).map_err(|e| {
                IamError::ParseError(format!("Invalid roles for user {}: {}", username, e))
            })?;
            users_data.insert(username, user);
        }

        Ok(UserDirectory::new(users_data, file.next_id))
    }

    fn serialize_users(directory: &UserDirectory) -> Result<String, IamError> {
        let file = YamlUsersFile {
            next_id: directory.next_id,
            users: directory
                .users
                .iter()
                .map(|(username, user)| (username.clone(), YamlUser::from(user)))
                .collect(),
        };

        serde_yaml::to_string(&file)
            .map_err(|e| IamError::ParseError(format!("Failed to serialize users: {}", e)))
    }

    fn read_users_file(&self) -> Result<String, IamError> {
        std::fs::read_to_string(&self.users_file)
            .map_err(|e| IamError::FileError(format!("Failed to read users file: {}", e)))
    }

    fn write_users_file(&self, content: &str) -> Result<(), IamError> {
        let parent = self.users_file.parent().ok_or_else(|| {
            IamError::FileError("Users file path has no parent directory".to_string())
        })?;
        let file_name = self
            .users_file
            .file_name()
            .ok_or_else(|| IamError::FileError("Users file path has no file name".to_string()))?;
        let (mut file, temp_path) = create_temp_file(parent, file_name)?;

        #[cfg(unix)]
        {
            if let Ok(metadata) = std::fs::metadata(&self.users_file)
                && let Err(err) = std::fs::set_permissions(&temp_path, metadata.permissions())
            {
                let _ = std::fs::remove_file(&temp_path);
                return Err(IamError::FileError(format!(
                    "Failed to set temp users file permissions: {}",
                    err
                )));
            }
        }

        let written = file
            .write_all(content.as_bytes())
            .map_err(|err| format!("Failed to write users temp file: {}", err))
            .and_then(|_| {
                file.sync_all()
                    .map_err(|err| format!("Failed to sync users temp file: {}", err))
            })
            .and_then(|_| {
                std::fs::rename(&temp_path, &self.users_file)
                    .map_err(|err| format!("Failed to replace users file: {}", err))
            });
        if let Err(message) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(IamError::FileError(message));
        }

        #[cfg(unix)]
        {
            if let Err(err) = sync_parent_dir(parent) {
                log::warn!("Users directory sync failed: {}", err);
            }
        }

        Ok(())
    }
}

fn create_temp_file(
    dir: &Path,
    file_name: &std::ffi::OsStr,
) -> Result<(std::fs::File, PathBuf), IamError> {
    use std::fs::OpenOptions;
    const MAX_ATTEMPTS: u32 = 100;
    let base = file_name.to_string_lossy();
    for attempt in 0..MAX_ATTEMPTS {
        let candidate = dir.join(format!(".{}.tmp.{}.{}", base, std::process::id(), attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((file, candidate)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(IamError::FileError(format!(
                    "Failed to create temp users file: {}",
                    err
                )));
            }
        }
    }
    Err(IamError::FileError(
        "Failed to create temp users file after repeated attempts".to_string(),
    ))
}

#[cfg(unix)]
fn sync_parent_dir(parent: &Path) -> Result<(), IamError> {
    let dir = std::fs::File::open(parent).map_err(|err| {
        IamError::FileError(format!("Failed to open users directory for sync: {}", err))
    })?;
    dir.sync_all()
        .map_err(|err| IamError::FileError(format!("Failed to sync users directory: {}", err)))
}

impl CredentialStore for FileUserStore {
    fn load(&self) -> Result<UserDirectory, IamError> {
        let content = self.read_users_file()?;
        Self::parse_users(&content)
    }

    fn save(&self, directory: &UserDirectory) -> Result<(), IamError> {
        let content = Self::serialize_users(directory)?;
        self.write_users_file(&content)
    }
}

/// Volatile store used by tests and embedded setups.
pub struct MemoryUserStore {
    directory: Arc<RwLock<UserDirectory>>,
}

impl MemoryUserStore {
    pub fn new(initial: UserDirectory) -> Self {
        Self {
            directory: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn from_users(users: Vec<User>) -> Self {
        Self::new(UserDirectory::from_users(users))
    }
}

impl CredentialStore for MemoryUserStore {
    fn load(&self) -> Result<UserDirectory, IamError> {
        match self.directory.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => {
                log::error!("MemoryUserStore lock poisoned on read; recovering");
                Ok(poisoned.into_inner().clone())
            }
        }
    }

    fn save(&self, directory: &UserDirectory) -> Result<(), IamError> {
        match self.directory.write() {
            Ok(mut guard) => {
                *guard = directory.clone();
                Ok(())
            }
            Err(poisoned) => {
                log::error!("MemoryUserStore lock poisoned on write; recovering");
                let mut guard = poisoned.into_inner();
                *guard = directory.clone();
                Ok(())
            }
        }
    }
}
