use super::user_models::same_username;
use super::{AccountType, Playlist};
use crate::catalog::{Catalog, Song};
use crate::persistence::{JsonUserStore, PersistenceError, UserSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Invalid playlist name: {0}")]
    InvalidName(String),

    #[error("A playlist named '{0}' already exists")]
    DuplicateName(String),

    #[error("{account} accounts can hold at most {max} playlist(s)")]
    LimitReached { account: AccountType, max: usize },

    #[error("Playlist '{0}' not found")]
    PlaylistNotFound(String),

    #[error("Song '{0}' not found in catalog")]
    SongNotInCatalog(String),

    #[error("Song '{title}' is not in playlist '{playlist}'")]
    SongNotInPlaylist { playlist: String, title: String },

    #[error("Only the owner of '{0}' can do that")]
    NotOwner(String),

    #[error("Playlist '{0}' is not collaborative")]
    NotCollaborative(String),

    #[error("'{0}' cannot be added as collaborator")]
    InvalidCollaborator(String),

    #[error("Storage failure: {0}")]
    Persistence(#[from] PersistenceError),
}

/// A playlist as seen by a user: either one of their own, or a collaborative
/// one held in another user's record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistView {
    pub holder: String,
    pub playlist: Playlist,
}

impl PlaylistView {
    pub fn to_wire_line(&self) -> String {
        self.playlist.to_wire_line(&self.holder)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddSongOutcome {
    Added(Song),
    AlreadyPresent(Song),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollaborativeCreation {
    pub playlist: Playlist,
    pub skipped: Vec<String>,
}

fn validate_name(name: &str) -> Result<String, PlaylistError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlaylistError::InvalidName("name cannot be empty".to_string()));
    }
    if name.contains('|') {
        return Err(PlaylistError::InvalidName("name cannot contain '|'".to_string()));
    }
    Ok(name.to_string())
}

/// Finds the record holding the playlist `name` visible to `username`: their
/// own playlists first, then collaborative playlists they were invited to.
fn locate(users: &UserSet, username: &str, name: &str) -> Option<String> {
    if let Some(user) = users.get(username) {
        if user.playlist(name).is_some() {
            return Some(user.username.clone());
        }
    }
    users
        .iter()
        .filter(|holder| !same_username(&holder.username, username))
        .find(|holder| {
            holder
                .playlist(name)
                .map(|p| p.can_edit(&holder.username, username))
                .unwrap_or(false)
        })
        .map(|holder| holder.username.clone())
}

fn locate_mut<'a>(
    users: &'a mut UserSet,
    username: &str,
    name: &str,
) -> Result<(String, &'a mut Playlist), PlaylistError> {
    let holder = locate(users, username, name)
        .ok_or_else(|| PlaylistError::PlaylistNotFound(name.to_string()))?;
    let playlist = users
        .get_mut(&holder)
        .and_then(|user| user.playlist_mut(name))
        .ok_or_else(|| PlaylistError::PlaylistNotFound(name.to_string()))?;
    Ok((holder, playlist))
}

/// Playlist operations. Every successful mutation has been committed to the
/// store by the time the method returns.
pub struct PlaylistManager {
    catalog: Arc<Catalog>,
    user_store: Arc<JsonUserStore>,
}

impl PlaylistManager {
    pub fn new(catalog: Arc<Catalog>, user_store: Arc<JsonUserStore>) -> Self {
        Self {
            catalog,
            user_store,
        }
    }

    fn check_can_create(users: &UserSet, username: &str, name: &str) -> Result<(), PlaylistError> {
        let user = users
            .get(username)
            .ok_or_else(|| PlaylistError::UserNotFound(username.to_string()))?;
        if user.playlist(name).is_some() {
            return Err(PlaylistError::DuplicateName(name.to_string()));
        }
        if !user.can_create_playlist() {
            return Err(PlaylistError::LimitReached {
                account: user.account_type,
                max: user.capabilities().max_playlists.unwrap_or(usize::MAX),
            });
        }
        Ok(())
    }

    pub fn create_playlist(&self, username: &str, name: &str) -> Result<Playlist, PlaylistError> {
        let name = validate_name(name)?;
        let playlist = self.user_store.transaction(|users| {
            Self::check_can_create(users, username, &name)?;
            let playlist = Playlist::new(name.clone());
            if let Some(user) = users.get_mut(username) {
                user.playlists.push(playlist.clone());
            }
            Ok::<_, PlaylistError>(playlist)
        })?;
        info!("User {} created playlist {}", username, playlist.name);
        Ok(playlist)
    }

    /// Creates a collaborative playlist. Collaborator names are comma
    /// separated; names that are not registered users (or the owner) are
    /// skipped and reported back.
    pub fn create_collaborative_playlist(
        &self,
        username: &str,
        name: &str,
        collaborators: &str,
    ) -> Result<CollaborativeCreation, PlaylistError> {
        let name = validate_name(name)?;
        let creation = self.user_store.transaction(|users| {
            Self::check_can_create(users, username, &name)?;
            let owner = users
                .get(username)
                .map(|u| u.username.clone())
                .unwrap_or_else(|| username.to_string());

            let mut playlist = Playlist::new_collaborative(name.clone(), owner);
            let mut skipped = vec![];
            for candidate in collaborators.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let resolved = users.get(candidate).map(|u| u.username.clone());
                let added = match (&resolved, playlist.collaboration.as_mut()) {
                    (Some(resolved), Some(collaboration)) => {
                        collaboration.add_collaborator(resolved)
                    }
                    _ => false,
                };
                if !added {
                    skipped.push(candidate.to_string());
                }
            }

            if let Some(user) = users.get_mut(username) {
                user.playlists.push(playlist.clone());
            }
            Ok::<_, PlaylistError>(CollaborativeCreation { playlist, skipped })
        })?;
        info!(
            "User {} created collaborative playlist {} ({} collaborators, {} skipped)",
            username,
            creation.playlist.name,
            creation
                .playlist
                .collaboration
                .as_ref()
                .map(|c| c.collaborators.len())
                .unwrap_or(0),
            creation.skipped.len()
        );
        Ok(creation)
    }

    /// Only the holder of a playlist can delete it.
    pub fn delete_playlist(&self, username: &str, name: &str) -> Result<Playlist, PlaylistError> {
        self.user_store.transaction(|users| {
            let user = users
                .get_mut(username)
                .ok_or_else(|| PlaylistError::UserNotFound(username.to_string()))?;
            match user.playlists.iter().position(|p| p.has_name(name)) {
                Some(index) => {
                    let removed = user.playlists.remove(index);
                    info!("User {} deleted playlist {}", username, removed.name);
                    Ok(removed)
                }
                None => {
                    if locate(users, username, name).is_some() {
                        Err(PlaylistError::NotOwner(name.to_string()))
                    } else {
                        Err(PlaylistError::PlaylistNotFound(name.to_string()))
                    }
                }
            }
        })
    }

    /// Adds a copy of the catalog song best matching `title`. Adding a song
    /// whose title is already in the playlist succeeds without changes.
    pub fn add_song_to_playlist(
        &self,
        username: &str,
        playlist_name: &str,
        title: &str,
    ) -> Result<AddSongOutcome, PlaylistError> {
        let song = self
            .catalog
            .resolve_title(title)
            .cloned()
            .ok_or_else(|| PlaylistError::SongNotInCatalog(title.trim().to_string()))?;

        self.user_store.transaction(|users| {
            let (_, playlist) = locate_mut(users, username, playlist_name)?;
            if playlist.add_song(&song) {
                debug!("Added {} to playlist {}", song.title, playlist.name);
                Ok(AddSongOutcome::Added(song.clone()))
            } else {
                Ok(AddSongOutcome::AlreadyPresent(song.clone()))
            }
        })
    }

    pub fn remove_song_from_playlist(
        &self,
        username: &str,
        playlist_name: &str,
        title: &str,
    ) -> Result<Song, PlaylistError> {
        self.user_store.transaction(|users| {
            let (_, playlist) = locate_mut(users, username, playlist_name)?;
            let name = playlist.name.clone();
            playlist
                .remove_song(title)
                .ok_or_else(|| PlaylistError::SongNotInPlaylist {
                    playlist: name,
                    title: title.trim().to_string(),
                })
        })
    }

    pub fn add_collaborator(
        &self,
        username: &str,
        playlist_name: &str,
        collaborator: &str,
    ) -> Result<(), PlaylistError> {
        self.user_store.transaction(|users| {
            let resolved = users
                .get(collaborator)
                .map(|u| u.username.clone())
                .ok_or_else(|| PlaylistError::UserNotFound(collaborator.to_string()))?;
            let collaboration = Self::owned_collaboration(users, username, playlist_name)?;
            if collaboration.add_collaborator(&resolved) {
                Ok(())
            } else {
                Err(PlaylistError::InvalidCollaborator(collaborator.to_string()))
            }
        })
    }

    pub fn remove_collaborator(
        &self,
        username: &str,
        playlist_name: &str,
        collaborator: &str,
    ) -> Result<(), PlaylistError> {
        self.user_store.transaction(|users| {
            let collaboration = Self::owned_collaboration(users, username, playlist_name)?;
            if collaboration.remove_collaborator(collaborator) {
                Ok(())
            } else {
                Err(PlaylistError::UserNotFound(collaborator.to_string()))
            }
        })
    }

    fn owned_collaboration<'a>(
        users: &'a mut UserSet,
        username: &str,
        playlist_name: &str,
    ) -> Result<&'a mut super::user_models::Collaboration, PlaylistError> {
        let (holder, playlist) = locate_mut(users, username, playlist_name)?;
        if !same_username(&holder, username) {
            return Err(PlaylistError::NotOwner(playlist.name.clone()));
        }
        let name = playlist.name.clone();
        playlist
            .collaboration
            .as_mut()
            .ok_or(PlaylistError::NotCollaborative(name))
    }

    /// Own playlists followed by collaborative playlists the user was invited to.
    pub fn get_playlists(&self, username: &str) -> Result<Vec<PlaylistView>, PlaylistError> {
        let users = self.user_store.load_all()?;
        let owner = users
            .get(username)
            .ok_or_else(|| PlaylistError::UserNotFound(username.to_string()))?;
        let mut views: Vec<PlaylistView> = owner
            .playlists
            .iter()
            .map(|playlist| PlaylistView {
                holder: owner.username.clone(),
                playlist: playlist.clone(),
            })
            .collect();
        for holder in users.iter().filter(|u| !same_username(&u.username, username)) {
            for playlist in holder.playlists.iter() {
                let invited = playlist
                    .collaboration
                    .as_ref()
                    .map(|c| c.is_collaborator(username))
                    .unwrap_or(false);
                if invited {
                    views.push(PlaylistView {
                        holder: holder.username.clone(),
                        playlist: playlist.clone(),
                    });
                }
            }
        }
        Ok(views)
    }

    pub fn find_playlist(
        &self,
        username: &str,
        name: &str,
    ) -> Result<Option<PlaylistView>, PlaylistError> {
        let users = self.user_store.load_all()?;
        Ok(locate(&users, username, name).and_then(|holder| {
            users
                .get(&holder)
                .and_then(|user| user.playlist(name))
                .map(|playlist| PlaylistView {
                    holder,
                    playlist: playlist.clone(),
                })
        }))
    }
}
