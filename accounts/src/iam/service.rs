// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::store::CredentialStore;
use super::types::{
    IamError, NewUser, ProfileUpdate, User, UserDirectory, UserMutation, UserMutationResult,
    UsersData,
};
use chrono::Utc;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// Type aliases for complex channel types
type MutationResponder = oneshot::Sender<Result<UserMutationResult, IamError>>;
type MutationRequest = (UserMutation, MutationResponder);
type MutationSender = mpsc::UnboundedSender<MutationRequest>;
type MutationReceiver = mpsc::UnboundedReceiver<MutationRequest>;

/// Owns the in-memory account view and serializes every write through one task.
///
/// A mutation is kept only if its caller is still waiting for the answer. When the
/// caller has already given up (timeout or dropped request) the store is put back to
/// the previous state, so a reported failure never leaves a half-visible account.
#[derive(Clone)]
pub struct IamService {
    users_data: Arc<RwLock<UserDirectory>>,
    mutation_sender: MutationSender,
    store: Arc<dyn CredentialStore>,
    mutation_timeout: Duration,
}

impl IamService {
    /// Loads users from the store and starts the background mutation task.
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mutation_timeout: Duration,
    ) -> Result<Self, IamError> {
        let directory = store.load()?;
        log::debug!(
            "Loaded {} user(s) from credential store, next id {}",
            directory.users.len(),
            directory.next_id
        );

        let users_data = Arc::new(RwLock::new(directory));

        let (mutation_sender, mut mutation_receiver): (MutationSender, MutationReceiver) =
            mpsc::unbounded_channel();

        let users_data_clone = users_data.clone();
        let store_clone = store.clone();

        tokio::spawn(async move {
            while let Some((mutation, response_sender)) = mutation_receiver.recv().await {
                if response_sender.is_closed() {
                    log::warn!("Skipping user mutation; caller stopped waiting before it ran");
                    continue;
                }
                Self::apply_mutation(mutation, response_sender, &users_data_clone, &store_clone);
            }
        });

        Ok(IamService {
            users_data,
            mutation_sender,
            store,
            mutation_timeout,
        })
    }

    fn reload_users_from_store(
        users_data: &Arc<RwLock<UserDirectory>>,
        store: &Arc<dyn CredentialStore>,
    ) -> Result<(), IamError> {
        let directory = store.load()?;
        match users_data.write() {
            Ok(mut guard) => {
                *guard = directory;
                users_data.clear_poison();
                Ok(())
            }
            Err(poisoned) => {
                log::error!("Users lock poisoned during reload; recovering");
                let mut guard = poisoned.into_inner();
                *guard = directory;
                users_data.clear_poison();
                Ok(())
            }
        }
    }

    fn with_users_read<T>(
        &self,
        f: impl FnOnce(&UsersData) -> Result<T, IamError>,
    ) -> Result<T, IamError> {
        match self.users_data.read() {
            Ok(guard) => f(&guard.users),
            Err(_) => {
                log::error!("Users lock poisoned on read; reloading from store");
                Self::reload_users_from_store(&self.users_data, &self.store)?;
                let guard = self.users_data.read().map_err(|_| {
                    IamError::ConfigurationError(
                        "Users lock poisoned after recovery attempt".to_string(),
                    )
                })?;
                f(&guard.users)
            }
        }
    }

    fn write_users<'a>(
        users_data: &'a Arc<RwLock<UserDirectory>>,
        store: &Arc<dyn CredentialStore>,
    ) -> Result<RwLockWriteGuard<'a, UserDirectory>, IamError> {
        match users_data.write() {
            Ok(guard) => Ok(guard),
            Err(poisoned) => {
                log::error!("Users lock poisoned on write; reloading from store");
                let mut guard = poisoned.into_inner();
                *guard = store.load()?;
                users_data.clear_poison();
                Ok(guard)
            }
        }
    }

    /// Runs on the background task. Stages the mutation, saves it, and swaps it into
    /// memory only once the caller has taken the result.
    fn apply_mutation(
        mutation: UserMutation,
        response_sender: MutationResponder,
        users_data: &Arc<RwLock<UserDirectory>>,
        store: &Arc<dyn CredentialStore>,
    ) {
        let mut guard = match Self::write_users(users_data, store) {
            Ok(guard) => guard,
            Err(err) => {
                let _ = response_sender.send(Err(err));
                return;
            }
        };

        let (staged, result) = match Self::stage_mutation(mutation, &guard) {
            Ok(staged) => staged,
            Err(err) => {
                let _ = response_sender.send(Err(err));
                return;
            }
        };

        if let Err(err) = store.save(&staged) {
            let _ = response_sender.send(Err(err));
            return;
        }

        if response_sender.send(Ok(result)).is_ok() {
            *guard = staged;
            return;
        }

        log::warn!("Caller stopped waiting for user mutation; restoring previous users");
        if let Err(err) = store.save(&guard) {
            // The store holds the staged state, keep memory consistent with it
            log::error!("Failed to restore users after abandoned mutation: {}", err);
            *guard = staged;
        }
    }

    fn stage_mutation(
        mutation: UserMutation,
        current: &UserDirectory,
    ) -> Result<(UserDirectory, UserMutationResult), IamError> {
        match mutation {
            UserMutation::Add(new_user) => {
                if current.users.contains_key(&new_user.username) {
                    return Err(IamError::UsernameTaken(new_user.username));
                }
                if email_owner(&current.users, &new_user.email).is_some() {
                    return Err(IamError::EmailTaken(new_user.email));
                }

                let mut staged = current.clone();
                let user = User {
                    id: staged.allocate_id(),
                    username: new_user.username,
                    email: new_user.email,
                    first_name: new_user.first_name,
                    last_name: new_user.last_name,
                    password_hash: new_user.password_hash,
                    roles: new_user.roles,
                    created_at: Utc::now(),
                };
                staged.users.insert(user.username.clone(), user.clone());
                Ok((staged, UserMutationResult::Added(user)))
            }
            UserMutation::UpdateProfile { username, changes } => {
                if let Some(owner) = email_owner(&current.users, &changes.email)
                    && owner.username != username
                {
                    return Err(IamError::EmailTaken(changes.email));
                }

                let mut staged = current.clone();
                let user = match staged.users.get_mut(&username) {
                    Some(user) => user,
                    None => return Err(IamError::UserNotFound(username)),
                };
                user.first_name = changes.first_name;
                user.last_name = changes.last_name;
                user.email = changes.email;
                let user = user.clone();
                Ok((staged, UserMutationResult::Updated(user)))
            }
            UserMutation::Delete { id } => {
                let username = current
                    .users
                    .values()
                    .find(|user| user.id == id)
                    .map(|user| user.username.clone())
                    .ok_or_else(|| IamError::UserNotFound(format!("id {}", id)))?;

                // next_id is left alone so the freed id is never handed out again
                let mut staged = current.clone();
                let removed = staged
                    .users
                    .remove(&username)
                    .ok_or_else(|| IamError::UserNotFound(username.clone()))?;
                Ok((staged, UserMutationResult::Deleted(removed)))
            }
        }
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, IamError> {
        self.with_users_read(|users| Ok(users.get(username).cloned()))
    }

    pub fn find_by_id(&self, id: u64) -> Result<Option<User>, IamError> {
        self.with_users_read(|users| Ok(users.values().find(|user| user.id == id).cloned()))
    }

    /// Username match wins over an email match.
    pub fn find_by_username_or_email(&self, value: &str) -> Result<Option<User>, IamError> {
        self.with_users_read(|users| {
            Ok(users
                .get(value)
                .or_else(|| email_owner(users, value))
                .cloned())
        })
    }

    pub fn exists_by_username(&self, username: &str) -> Result<bool, IamError> {
        self.with_users_read(|users| Ok(users.contains_key(username)))
    }

    pub fn exists_by_email(&self, email: &str) -> Result<bool, IamError> {
        self.with_users_read(|users| Ok(email_owner(users, email).is_some()))
    }

    pub fn list_users(&self) -> Result<Vec<User>, IamError> {
        self.with_users_read(|users| Ok(users.values().cloned().collect()))
    }

    pub async fn add_user(&self, new_user: NewUser) -> Result<User, IamError> {
        match self.send_mutation(UserMutation::Add(new_user)).await? {
            UserMutationResult::Added(user) => Ok(user),
            _ => Err(IamError::ConfigurationError(
                "Unexpected result".to_string(),
            )),
        }
    }

    pub async fn update_profile(
        &self,
        username: &str,
        changes: ProfileUpdate,
    ) -> Result<User, IamError> {
        let mutation = UserMutation::UpdateProfile {
            username: username.to_string(),
            changes,
        };
        match self.send_mutation(mutation).await? {
            UserMutationResult::Updated(user) => Ok(user),
            _ => Err(IamError::ConfigurationError(
                "Unexpected result".to_string(),
            )),
        }
    }

    pub async fn delete_user(&self, id: u64) -> Result<User, IamError> {
        match self.send_mutation(UserMutation::Delete { id }).await? {
            UserMutationResult::Deleted(user) => Ok(user),
            _ => Err(IamError::ConfigurationError(
                "Unexpected result".to_string(),
            )),
        }
    }

    async fn send_mutation(&self, mutation: UserMutation) -> Result<UserMutationResult, IamError> {
        let (response_sender, mut response_receiver) = oneshot::channel();

        self.mutation_sender
            .send((mutation, response_sender))
            .map_err(|_| IamError::ServiceNotInitialized)?;

        match tokio::time::timeout(self.mutation_timeout, &mut response_receiver).await {
            Ok(response) => response.map_err(|_| IamError::ServiceNotInitialized)?,
            Err(_) => {
                // Closing first means a late result is either seen here or rolled back
                response_receiver.close();
                match response_receiver.try_recv() {
                    Ok(response) => response,
                    Err(_) => {
                        log::error!(
                            "User store mutation did not complete within {:?}",
                            self.mutation_timeout
                        );
                        Err(IamError::StoreTimeout)
                    }
                }
            }
        }
    }
}

fn email_owner<'a>(users: &'a UsersData, email: &str) -> Option<&'a User> {
    users
        .values()
        .find(|user| user.email.eq_ignore_ascii_case(email))
}
