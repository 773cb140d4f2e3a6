// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> ProfileView {
        ProfileView {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

// Structure matching the YAML file format
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YamlUser {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl YamlUser {
    pub fn into_user(self, username: String) -> User {
        User {
            id: self.id,
            username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            roles: self.roles,
            created_at: self.created_at,
        }
    }
}

impl From<&User> for YamlUser {
    fn from(user: &User) -> Self {
        YamlUser {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: user.password_hash.clone(),
            roles: user.roles.clone(),
            created_at: user.created_at,
        }
    }
}

/// Raw registration input, before validation.
#[derive(Debug, Clone)]
pub struct SignUpCandidate {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A validated account ready to be inserted; id and timestamp are assigned by the store task.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IamError {
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Username is already taken: {0}")]
    UsernameTaken(String),
    #[error("Email address already in use: {0}")]
    EmailTaken(String),
    #[error("IAM service not initialized")]
    ServiceNotInitialized,
    #[error("User store did not respond in time")]
    StoreTimeout,
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("File error: {0}")]
    FileError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

// Mutation commands for the background task
#[derive(Debug)]
pub enum UserMutation {
    Add(NewUser),
    UpdateProfile {
        username: String,
        changes: ProfileUpdate,
    },
    Delete {
        id: u64,
    },
}

#[derive(Debug)]
pub enum UserMutationResult {
    Added(User),
    Updated(User),
    Deleted(User),
}

// username -> yaml user data, sorted so the file diffs cleanly between saves
pub type YamlUsersData = BTreeMap<String, YamlUser>;
pub type UsersData = HashMap<String, User>;

/// The users.yaml file structure. `{}` is a valid empty file.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct YamlUsersFile {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub users: YamlUsersData,
}

/// All accounts plus the id high-water mark.
///
/// `next_id` only moves forward, so an id freed by a deletion is never handed to a
/// later registrant and a leftover token cannot resolve to someone else's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDirectory {
    pub users: UsersData,
    pub next_id: u64,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new(UsersData::new(), 1)
    }
}

impl UserDirectory {
    /// Raises `next_id` above every id already present.
    pub fn new(users: UsersData, next_id: u64) -> Self {
        let floor = users.values().map(|user| user.id).max().map_or(1, |max| max + 1);
        Self {
            users,
            next_id: next_id.max(floor),
        }
    }

    pub fn from_users(users: Vec<User>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();
        Self::new(users, 1)
    }

    pub fn allocate_id(&mut self) -> u64 {
        let floor = self.users.values().map(|user| user.id).max().map_or(1, |max| max + 1);
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }
}
