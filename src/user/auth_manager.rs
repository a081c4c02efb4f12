use super::attempt_tracker::{AttemptTracker, FailureOutcome};
use super::auth::{hash_password, HashingParams, PasswordScheme};
use super::{AccountType, User};
use crate::persistence::{JsonUserStore, PersistenceError};
use crate::server::END;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Unknown account type '{0}', expected free or premium")]
    UnknownAccountType(String),

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Invalid username or password. {remaining_attempts} attempt(s) remaining before lockout")]
    InvalidCredentials { remaining_attempts: u32 },

    #[error("Too many failed attempts. Account locked for {} seconds", .remaining.as_secs().max(1))]
    LockedOut { remaining: Duration },

    #[error("Could not hash password: {0}")]
    Hashing(String),

    #[error("Storage failure: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Registration and login policy on top of the user store.
pub struct AuthManager {
    user_store: Arc<JsonUserStore>,
    attempts: AttemptTracker,
    hashing_params: HashingParams,
    min_password_len: usize,
}

impl AuthManager {
    pub fn new(
        user_store: Arc<JsonUserStore>,
        attempts: AttemptTracker,
        hashing_params: HashingParams,
        min_password_len: usize,
    ) -> Self {
        Self {
            user_store,
            attempts,
            hashing_params,
            min_password_len,
        }
    }

    fn validate_username(username: &str) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::InvalidInput("Username cannot be empty".to_string()));
        }
        if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AuthError::InvalidInput(
                "Username cannot contain whitespace".to_string(),
            ));
        }
        if username.contains(',') || username.contains('|') {
            return Err(AuthError::InvalidInput(
                "Username cannot contain ',' or '|'".to_string(),
            ));
        }
        // A bare username row must never read as the end of a listing.
        if username.eq_ignore_ascii_case(END) {
            return Err(AuthError::InvalidInput(format!(
                "Username cannot be {}",
                END
            )));
        }
        Ok(())
    }

    pub fn register(
        &self,
        username: &str,
        password: &str,
        account_type: &str,
    ) -> Result<User, AuthError> {
        let username = username.trim();
        Self::validate_username(username)?;
        if password.is_empty() {
            return Err(AuthError::InvalidInput("Password cannot be empty".to_string()));
        }
        let account_type = AccountType::from_str(account_type)
            .ok_or_else(|| AuthError::UnknownAccountType(account_type.to_string()))?;
        if password.chars().count() < self.min_password_len {
            return Err(AuthError::InvalidInput(format!(
                "Password must be at least {} characters",
                self.min_password_len
            )));
        }

        // Hashing is slow, keep it out of the store's write lock.
        let password_hash = hash_password(password, &self.hashing_params)
            .map_err(|err| AuthError::Hashing(err.to_string()))?;
        let user = User::new(username, password_hash, account_type);

        self.user_store.transaction(|users| {
            if users.contains(username) {
                return Err(AuthError::UsernameTaken);
            }
            users.upsert(user.clone());
            Ok(())
        })?;

        info!("Registered {} account {}", account_type, username);
        Ok(user)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if let Some(remaining) = self.attempts.check_locked(username) {
            warn!("Login attempt for locked username {}", username);
            return Err(AuthError::LockedOut { remaining });
        }

        let user = if username.is_empty() || password.is_empty() {
            None
        } else {
            self.user_store.authenticate(username, password)?
        };

        match user {
            Some(user) => {
                self.attempts.reset(username);
                let user = self.migrate_hash_if_outdated(user, password);
                info!("User {} logged in", user.username);
                Ok(user)
            }
            None => match self.attempts.record_failure(username) {
                FailureOutcome::Counting { remaining } => {
                    info!("Failed login for {}, {} attempts left", username, remaining);
                    Err(AuthError::InvalidCredentials {
                        remaining_attempts: remaining,
                    })
                }
                FailureOutcome::Locked { lockout } => {
                    warn!("Username {} locked after repeated failures", username);
                    Err(AuthError::LockedOut { remaining: lockout })
                }
            },
        }
    }

    /// Rehashes a password stored with an older scheme. Failing to do so does
    /// not fail the login.
    fn migrate_hash_if_outdated(&self, mut user: User, password: &str) -> User {
        match PasswordScheme::detect(&user.password_hash) {
            Some(scheme) if scheme.is_current() => return user,
            _ => {}
        }
        let new_hash = match hash_password(password, &self.hashing_params) {
            Ok(hash) => hash,
            Err(err) => {
                warn!("Could not rehash password of {}: {}", user.username, err);
                return user;
            }
        };
        let result = self.user_store.transaction(|users| {
            if let Some(stored) = users.get_mut(&user.username) {
                stored.password_hash = new_hash.clone();
            }
            Ok::<(), PersistenceError>(())
        });
        match result {
            Ok(()) => {
                info!("Migrated password hash of {} to {}", user.username, PasswordScheme::CURRENT);
                user.password_hash = new_hash;
            }
            Err(err) => warn!("Could not store migrated hash of {}: {}", user.username, err),
        }
        user
    }

    pub fn logout(&self, username: &str) {
        info!("User {} logged out", username);
    }
}
