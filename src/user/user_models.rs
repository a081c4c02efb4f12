use crate::catalog::Song;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Usernames are unique case-insensitively, every lookup goes through this.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub fn same_username(a: &str, b: &str) -> bool {
    normalize_username(a) == normalize_username(b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[serde(alias = "Free", alias = "FREE")]
    Free,
    #[serde(alias = "Premium", alias = "PREMIUM")]
    Premium,
}

/// What an account type is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub max_playlists: Option<usize>,
    pub shuffle_allowed: bool,
}

const FREE_CAPABILITIES: Capabilities = Capabilities {
    max_playlists: Some(1),
    shuffle_allowed: false,
};
const PREMIUM_CAPABILITIES: Capabilities = Capabilities {
    max_playlists: None,
    shuffle_allowed: true,
};

impl AccountType {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            AccountType::Free => FREE_CAPABILITIES,
            AccountType::Premium => PREMIUM_CAPABILITIES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Free => "free",
            AccountType::Premium => "premium",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Some(AccountType::Free),
            "premium" => Some(AccountType::Premium),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub share_playlists_publicly: bool,
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    #[serde(default)]
    pub followed_users: BTreeSet<String>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: String, account_type: AccountType) -> Self {
        Self {
            username: username.into(),
            password_hash,
            account_type,
            share_playlists_publicly: false,
            playlists: vec![],
            followed_users: BTreeSet::new(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.account_type.capabilities()
    }

    pub fn can_create_playlist(&self) -> bool {
        match self.capabilities().max_playlists {
            Some(max) => self.playlists.len() < max,
            None => true,
        }
    }

    pub fn playlist(&self, name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.has_name(name))
    }

    pub fn playlist_mut(&mut self, name: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.has_name(name))
    }

    pub fn is_following(&self, username: &str) -> bool {
        self.followed_users
            .iter()
            .any(|followed| same_username(followed, username))
    }
}

/// Owner and collaborators of a shared playlist. The owner is never part of
/// `collaborators`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaboration {
    pub owner: String,
    #[serde(default)]
    pub collaborators: BTreeSet<String>,
}

impl Collaboration {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            collaborators: BTreeSet::new(),
        }
    }

    /// Returns false when the name is the owner or already present.
    pub fn add_collaborator(&mut self, username: &str) -> bool {
        if same_username(&self.owner, username) || self.is_collaborator(username) {
            return false;
        }
        self.collaborators.insert(username.to_string())
    }

    pub fn remove_collaborator(&mut self, username: &str) -> bool {
        let before = self.collaborators.len();
        self.collaborators
            .retain(|collaborator| !same_username(collaborator, username));
        before != self.collaborators.len()
    }

    pub fn is_collaborator(&self, username: &str) -> bool {
        self.collaborators
            .iter()
            .any(|collaborator| same_username(collaborator, username))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub collaboration: Option<Collaboration>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            songs: vec![],
            collaboration: None,
        }
    }

    pub fn new_collaborative(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            songs: vec![],
            collaboration: Some(Collaboration::new(owner)),
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    /// Whether `username` may change the songs of this playlist, given the
    /// name of the user whose record holds it.
    pub fn can_edit(&self, holder: &str, username: &str) -> bool {
        if same_username(holder, username) {
            return true;
        }
        self.collaboration
            .as_ref()
            .map(|c| c.is_collaborator(username))
            .unwrap_or(false)
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.songs.iter().any(|song| song.same_title(title))
    }

    /// Adds a copy of `song`. Returns false if an equal-titled song was
    /// already present.
    pub fn add_song(&mut self, song: &Song) -> bool {
        if self.contains_title(&song.title) {
            return false;
        }
        self.songs.push(song.clone());
        true
    }

    pub fn remove_song(&mut self, title: &str) -> Option<Song> {
        let index = self.songs.iter().position(|song| song.same_title(title))?;
        Some(self.songs.remove(index))
    }

    /// `<name>|<song count>|<owner>|<personal|collaborative>`
    pub fn to_wire_line(&self, holder: &str) -> String {
        let (owner, kind) = match &self.collaboration {
            Some(c) => (c.owner.as_str(), "collaborative"),
            None => (holder, "personal"),
        };
        format!("{}|{}|{}|{}", self.name, self.songs.len(), owner, kind)
    }
}
