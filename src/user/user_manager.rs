use super::user_models::same_username;
use super::{Playlist, User};
use crate::persistence::{JsonUserStore, PersistenceError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("You cannot follow yourself")]
    SelfFollow,

    #[error("You are not following {0}")]
    NotFollowing(String),

    #[error("{0} does not share playlists publicly")]
    NotShared(String),

    #[error("Storage failure: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Account summary returned by `ACCOUNT_INFO`.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub username: String,
    pub account_type: super::AccountType,
    pub playlist_count: usize,
    pub max_playlists: Option<usize>,
    pub shuffle_allowed: bool,
    pub sharing: bool,
}

impl AccountInfo {
    fn from_user(user: &User) -> Self {
        let capabilities = user.capabilities();
        Self {
            username: user.username.clone(),
            account_type: user.account_type,
            playlist_count: user.playlists.len(),
            max_playlists: capabilities.max_playlists,
            shuffle_allowed: capabilities.shuffle_allowed,
            sharing: user.share_playlists_publicly,
        }
    }

    pub fn to_wire_line(&self) -> String {
        let max = self
            .max_playlists
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        format!(
            "ACCOUNT {} {} playlists={}/{} shuffle={} sharing={}",
            self.username,
            self.account_type,
            self.playlist_count,
            max,
            if self.shuffle_allowed { "yes" } else { "no" },
            if self.sharing { "on" } else { "off" }
        )
    }
}

/// Follow edges, sharing preference and account lookups.
pub struct UserManager {
    user_store: Arc<JsonUserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<JsonUserStore>) -> Self {
        Self { user_store }
    }

    pub fn get_user(&self, username: &str) -> Result<Option<User>, SocialError> {
        Ok(self.user_store.get_by_username(username)?)
    }

    pub fn account_info(&self, username: &str) -> Result<AccountInfo, SocialError> {
        self.get_user(username)?
            .map(|user| AccountInfo::from_user(&user))
            .ok_or_else(|| SocialError::UserNotFound(username.to_string()))
    }

    /// Following an already followed user succeeds without changes.
    pub fn follow(&self, username: &str, target: &str) -> Result<String, SocialError> {
        if same_username(username, target) {
            return Err(SocialError::SelfFollow);
        }
        let followed = self.user_store.transaction(|users| {
            let target_name = users
                .get(target)
                .map(|u| u.username.clone())
                .ok_or_else(|| SocialError::UserNotFound(target.to_string()))?;
            let user = users
                .get_mut(username)
                .ok_or_else(|| SocialError::UserNotFound(username.to_string()))?;
            if !user.is_following(&target_name) {
                user.followed_users.insert(target_name.clone());
            }
            Ok::<_, SocialError>(target_name)
        })?;
        info!("User {} follows {}", username, followed);
        Ok(followed)
    }

    pub fn unfollow(&self, username: &str, target: &str) -> Result<(), SocialError> {
        self.user_store.transaction(|users| {
            let user = users
                .get_mut(username)
                .ok_or_else(|| SocialError::UserNotFound(username.to_string()))?;
            let before = user.followed_users.len();
            user.followed_users
                .retain(|followed| !same_username(followed, target));
            if before == user.followed_users.len() {
                return Err(SocialError::NotFollowing(target.to_string()));
            }
            Ok(())
        })
    }

    pub fn following(&self, username: &str) -> Result<Vec<String>, SocialError> {
        let user = self
            .get_user(username)?
            .ok_or_else(|| SocialError::UserNotFound(username.to_string()))?;
        Ok(user.followed_users.into_iter().collect())
    }

    pub fn set_sharing(&self, username: &str, share: bool) -> Result<(), SocialError> {
        self.user_store.transaction(|users| {
            let user = users
                .get_mut(username)
                .ok_or_else(|| SocialError::UserNotFound(username.to_string()))?;
            user.share_playlists_publicly = share;
            Ok(())
        })
    }

    /// Playlists of `target`, visible only if `target` shares them publicly.
    pub fn shared_playlists(&self, target: &str) -> Result<(String, Vec<Playlist>), SocialError> {
        let user = self
            .get_user(target)?
            .ok_or_else(|| SocialError::UserNotFound(target.to_string()))?;
        if !user.share_playlists_publicly {
            return Err(SocialError::NotShared(user.username));
        }
        Ok((user.username, user.playlists))
    }
}
