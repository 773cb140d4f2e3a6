// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::IamService;
use super::jwt::{Claims, JwtError, JwtService, TokenSigner};
use super::password::{Argon2PasswordHasher, PasswordError, PasswordHasher};
use super::store::{CredentialStore, FileUserStore};
use super::types::{IamError, NewUser, ProfileUpdate, ProfileView, SignUpCandidate, User};
use crate::config::ValidatedConfig;
use crate::roles::{FileRoleCatalog, RoleCatalog};
use crate::runtime_paths::RuntimePaths;
use crate::security::{validate_profile_update, validate_required, validate_sign_up};
use std::sync::Arc;

/// Registration, sign-in and profile flows over the injected capabilities.
pub struct UserServices {
    iam_service: IamService,
    token_signer: Arc<dyn TokenSigner>,
    password_hasher: Arc<dyn PasswordHasher>,
    role_catalog: Arc<dyn RoleCatalog>,
    default_role: String,
    dummy_stored_hash: String,
}

pub type UserServiceResult<T> = Result<T, UserServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("Username is already taken!")]
    UsernameTaken,
    #[error("Email Address already in use!")]
    EmailTaken,
    #[error("User Role not set.")]
    RoleConfigurationMissing,
    #[error("Invalid username/email or password")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Token(#[from] JwtError),
    #[error("{0}")]
    Password(#[from] PasswordError),
    #[error("{0}")]
    Store(IamError),
    #[error("{0}")]
    Config(String),
}

impl From<IamError> for UserServiceError {
    fn from(err: IamError) -> Self {
        match err {
            IamError::UsernameTaken(_) => UserServiceError::UsernameTaken,
            IamError::EmailTaken(_) => UserServiceError::EmailTaken,
            IamError::UserNotFound(subject) => {
                UserServiceError::NotFound(format!("User not found: {}", subject))
            }
            other => UserServiceError::Store(other),
        }
    }
}

fn not_found(field: &str, value: impl std::fmt::Display) -> UserServiceError {
    UserServiceError::NotFound(format!("User not found with {} : '{}'", field, value))
}

fn build_dummy_stored_hash(hasher: &dyn PasswordHasher) -> Result<String, PasswordError> {
    hasher.hash("dummy-password")
}

impl UserServices {
    /// File-backed wiring used by the server binary.
    pub fn new(config: &ValidatedConfig, runtime_paths: &RuntimePaths) -> UserServiceResult<Self> {
        let store = Arc::new(FileUserStore::new(runtime_paths.users_file.clone())?);
        let role_catalog = Arc::new(FileRoleCatalog::new(runtime_paths.roles_file.clone()));
        Self::new_with_store(config, store, role_catalog)
    }

    pub fn new_with_store(
        config: &ValidatedConfig,
        store: Arc<dyn CredentialStore>,
        role_catalog: Arc<dyn RoleCatalog>,
    ) -> UserServiceResult<Self> {
        let iam_service = IamService::new(store, config.users.store_timeout())?;
        let token_signer = Arc::new(JwtService::new(&config.users.jwt)?);
        let password_hasher = Arc::new(Argon2PasswordHasher::new(config.users.password.clone())?);

        Self::with_components(
            iam_service,
            token_signer,
            password_hasher,
            role_catalog,
            config.users.default_role.clone(),
        )
    }

    pub fn with_components(
        iam_service: IamService,
        token_signer: Arc<dyn TokenSigner>,
        password_hasher: Arc<dyn PasswordHasher>,
        role_catalog: Arc<dyn RoleCatalog>,
        default_role: String,
    ) -> UserServiceResult<Self> {
        let dummy_stored_hash = build_dummy_stored_hash(password_hasher.as_ref())?;

        Ok(UserServices {
            iam_service,
            token_signer,
            password_hasher,
            role_catalog,
            default_role,
            dummy_stored_hash,
        })
    }

    pub fn token_signer(&self) -> &dyn TokenSigner {
        self.token_signer.as_ref()
    }

    /// Creates an account holding exactly the default role.
    pub async fn register(&self, candidate: SignUpCandidate) -> UserServiceResult<User> {
        let candidate = validate_sign_up(candidate).map_err(UserServiceError::Validation)?;

        if self.iam_service.exists_by_username(&candidate.username)? {
            return Err(UserServiceError::UsernameTaken);
        }
        if self.iam_service.exists_by_email(&candidate.email)? {
            return Err(UserServiceError::EmailTaken);
        }

        let role = self
            .role_catalog
            .find_by_name(&self.default_role)
            .map_err(|err| UserServiceError::Config(err.to_string()))?
            .ok_or_else(|| {
                log::error!(
                    "Default role {} is not present in the role catalog",
                    self.default_role
                );
                UserServiceError::RoleConfigurationMissing
            })?;

        let password_hash = self.password_hasher.hash(&candidate.password)?;

        // The store task re-checks both uniqueness constraints before inserting
        let user = self
            .iam_service
            .add_user(NewUser {
                username: candidate.username,
                email: candidate.email,
                first_name: candidate.first_name,
                last_name: candidate.last_name,
                password_hash,
                roles: vec![role],
            })
            .await?;

        log::info!("Registered user {} (id {})", user.username, user.id);
        Ok(user)
    }

    /// Returns a bearer token. Unknown users and wrong passwords are indistinguishable.
    pub fn sign_in(&self, username_or_email: &str, password: &str) -> UserServiceResult<String> {
        validate_required("Username or email", username_or_email)
            .map_err(UserServiceError::Validation)?;
        validate_required("Password", password).map_err(UserServiceError::Validation)?;

        let user = self
            .iam_service
            .find_by_username_or_email(username_or_email.trim())?;
        let stored_hash = match user.as_ref() {
            Some(user) => user.password_hash.as_str(),
            None => self.dummy_stored_hash.as_str(),
        };

        let valid = match self.password_hasher.verify(password, stored_hash) {
            Ok(valid) => valid,
            Err(PasswordError::MalformedHash(message)) => {
                log::error!("Stored password hash is unreadable: {}", message);
                false
            }
            Err(err) => return Err(err.into()),
        };

        match user {
            Some(user) if valid => {
                let token = self.token_signer.issue_token(&user)?;
                log::debug!("Issued token for user id {}", user.id);
                Ok(token)
            }
            _ => {
                log::debug!("Sign-in rejected");
                Err(UserServiceError::InvalidCredentials)
            }
        }
    }

    /// Validates a token and resolves its identity. `None` means the account is gone.
    pub fn authenticate(&self, token: &str) -> UserServiceResult<(Claims, Option<User>)> {
        let claims = self.token_signer.validate_token(token)?;
        let id = claims.identity_id()?;
        let user = self.iam_service.find_by_id(id)?;
        Ok((claims, user))
    }

    pub fn get_profile(&self, id: u64) -> UserServiceResult<ProfileView> {
        self.iam_service
            .find_by_id(id)?
            .map(|user| user.profile())
            .ok_or_else(|| not_found("id", id))
    }

    pub fn get_profile_by_username(&self, username: &str) -> UserServiceResult<ProfileView> {
        self.iam_service
            .find_by_username(username)?
            .map(|user| user.profile())
            .ok_or_else(|| not_found("username", username))
    }

    pub fn get_user_by_username(&self, username: &str) -> UserServiceResult<Option<User>> {
        Ok(self.iam_service.find_by_username(username)?)
    }

    /// Overwrites first name, last name and email. Username and password stay untouched.
    pub async fn update_profile(
        &self,
        username: &str,
        changes: ProfileUpdate,
    ) -> UserServiceResult<ProfileView> {
        let changes = validate_profile_update(changes).map_err(UserServiceError::Validation)?;
        match self.iam_service.update_profile(username, changes).await {
            Ok(user) => {
                log::info!("Updated profile of user {}", user.username);
                Ok(user.profile())
            }
            Err(IamError::UserNotFound(_)) => Err(not_found("username", username)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_profile(&self, id: u64) -> UserServiceResult<()> {
        match self.iam_service.delete_user(id).await {
            Ok(user) => {
                log::info!("Deleted user {} (id {})", user.username, user.id);
                Ok(())
            }
            Err(IamError::UserNotFound(_)) => Err(not_found("id", id)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn check_username_availability(&self, username: &str) -> UserServiceResult<bool> {
        Ok(!self.iam_service.exists_by_username(username)?)
    }

    pub fn check_email_availability(&self, email: &str) -> UserServiceResult<bool> {
        Ok(!self.iam_service.exists_by_email(email.trim())?)
    }

    pub fn list_users(&self) -> UserServiceResult<Vec<User>> {
        Ok(self.iam_service.list_users()?)
    }
}
