//! Flat-file user store.
//!
//! The whole user set lives in one JSON array. Every write serializes the
//! full set to `<store>.tmp`, backs the current store up to `<store>.bak`
//! and renames the temporary file over the store, so readers only ever see
//! a complete document. Mutations go through [`JsonUserStore::transaction`],
//! which holds a single write lock across load, modify and save.

use super::UserSet;
use crate::user::auth::verify_password;
use crate::user::User;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const BACKUP_SUFFIX: &str = ".bak";
pub const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not serialize users: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Temporary store file {0:?} was empty after writing")]
    EmptyWrite(PathBuf),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

enum StoreContent {
    Missing,
    Empty,
    Corrupt(String),
    Users(Vec<User>),
}

fn read_store_file(path: &Path) -> Result<StoreContent, PersistenceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(StoreContent::Missing),
        Err(err) => return Err(io_err(path)(err)),
    };
    if content.trim().is_empty() {
        return Ok(StoreContent::Empty);
    }
    match serde_json::from_str::<Vec<User>>(&content) {
        Ok(users) => Ok(StoreContent::Users(users)),
        Err(err) => Ok(StoreContent::Corrupt(err.to_string())),
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

pub struct JsonUserStore {
    path: PathBuf,
    backup_path: PathBuf,
    temp_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonUserStore {
    /// Opens the store at `path`, creating or repairing it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
        }
        let store = JsonUserStore {
            backup_path: sibling_path(&path, BACKUP_SUFFIX),
            temp_path: sibling_path(&path, TEMP_SUFFIX),
            path,
            write_lock: Mutex::new(()),
        };

        if store.temp_path.exists() {
            warn!(
                "Removing leftover temporary store file {:?} from an interrupted write",
                store.temp_path
            );
            let _ = fs::remove_file(&store.temp_path);
        }

        let users = store.load_all()?;
        info!("User store {:?} opened with {} users", store.path, users.len());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // A panicking writer never leaves the file half-written, the lock
        // itself carries no data worth distrusting.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads every user. A missing, empty or unparsable store is recovered
    /// from the backup when possible, otherwise reinitialized as empty.
    pub fn load_all(&self) -> Result<UserSet, PersistenceError> {
        if let StoreContent::Users(users) = read_store_file(&self.path)? {
            return Ok(UserSet::from_users(users));
        }
        let _guard = self.lock();
        self.load_locked()
    }

    fn load_locked(&self) -> Result<UserSet, PersistenceError> {
        match read_store_file(&self.path)? {
            StoreContent::Users(users) => Ok(UserSet::from_users(users)),
            StoreContent::Missing => {
                info!("No user store at {:?}, creating an empty one", self.path);
                self.recover_locked()
            }
            StoreContent::Empty => {
                warn!("User store {:?} is empty", self.path);
                self.recover_locked()
            }
            StoreContent::Corrupt(reason) => {
                error!("User store {:?} is corrupt: {}", self.path, reason);
                self.recover_locked()
            }
        }
    }

    fn recover_locked(&self) -> Result<UserSet, PersistenceError> {
        let users = match read_store_file(&self.backup_path)? {
            StoreContent::Users(users) => {
                warn!(
                    "Restoring {} users from backup {:?}",
                    users.len(),
                    self.backup_path
                );
                UserSet::from_users(users)
            }
            _ => UserSet::default(),
        };
        self.write_locked(&users)?;
        Ok(users)
    }

    /// Replaces the whole store content.
    pub fn save_all(&self, users: &UserSet) -> Result<(), PersistenceError> {
        let _guard = self.lock();
        self.write_locked(users)
    }

    fn write_locked(&self, users: &UserSet) -> Result<(), PersistenceError> {
        match self.try_write(users) {
            Ok(()) => Ok(()),
            Err(err) => {
                error!("Failed to write user store {:?}: {}", self.path, err);
                let _ = fs::remove_file(&self.temp_path);
                self.restore_backup_if_store_broken();
                Err(err)
            }
        }
    }

    fn try_write(&self, users: &UserSet) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(users.users())?;
        {
            let mut file = File::create(&self.temp_path).map_err(io_err(&self.temp_path))?;
            file.write_all(&json).map_err(io_err(&self.temp_path))?;
            file.sync_all().map_err(io_err(&self.temp_path))?;
        }

        let written = fs::metadata(&self.temp_path)
            .map_err(io_err(&self.temp_path))?
            .len();
        if written == 0 {
            return Err(PersistenceError::EmptyWrite(self.temp_path.clone()));
        }

        // Only a readable store is worth backing up, a broken one would
        // overwrite the last good backup.
        if let StoreContent::Users(_) = read_store_file(&self.path)? {
            fs::copy(&self.path, &self.backup_path).map_err(io_err(&self.backup_path))?;
        }

        fs::rename(&self.temp_path, &self.path).map_err(io_err(&self.path))?;
        debug!("Wrote {} users to {:?}", users.len(), self.path);
        Ok(())
    }

    fn restore_backup_if_store_broken(&self) {
        match read_store_file(&self.path) {
            Ok(StoreContent::Users(_)) => {}
            _ => {
                if let Ok(StoreContent::Users(_)) = read_store_file(&self.backup_path) {
                    match fs::copy(&self.backup_path, &self.path) {
                        Ok(_) => warn!("Restored user store {:?} from backup", self.path),
                        Err(err) => error!("Could not restore user store from backup: {}", err),
                    }
                }
            }
        }
    }

    /// Runs `f` on the current user set while holding the write lock, and
    /// commits the result if `f` succeeded and changed anything. Nothing is
    /// written when `f` fails.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut UserSet) -> Result<T, E>,
        E: From<PersistenceError>,
    {
        let _guard = self.lock();
        let mut users = self.load_locked()?;
        let before = users.clone();
        let value = f(&mut users)?;
        if users != before {
            self.write_locked(&users)?;
        }
        Ok(value)
    }

    /// Inserts `user`, or updates the record with the same case-insensitive
    /// username. Returns true if a new record was created.
    pub fn add_user(&self, user: User) -> Result<bool, PersistenceError> {
        self.transaction(|users| Ok(users.upsert(user)))
    }

    /// Replaces an existing record. Returns false if no such user exists.
    pub fn update_user(&self, user: &User) -> Result<bool, PersistenceError> {
        self.transaction(|users| {
            if !users.contains(&user.username) {
                return Ok(false);
            }
            users.upsert(user.clone());
            Ok(true)
        })
    }

    pub fn get_by_username(&self, username: &str) -> Result<Option<User>, PersistenceError> {
        Ok(self.load_all()?.get(username).cloned())
    }

    pub fn exists(&self, username: &str) -> Result<bool, PersistenceError> {
        Ok(self.load_all()?.contains(username))
    }

    /// Low-level credential check: returns the user if `password` matches the
    /// stored hash. No attempt counting happens here.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, PersistenceError> {
        let user = match self.get_by_username(username)? {
            Some(user) => user,
            None => return Ok(None),
        };
        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(err) => {
                warn!("Stored hash of user {} is unreadable: {}", user.username, err);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Song;
    use crate::user::auth::{cheap_params, hash_password};
    use crate::user::{AccountType, Playlist};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn user(name: &str) -> User {
        User::new(name, "hash".to_string(), AccountType::Free)
    }

    fn open(dir: &TempDir) -> JsonUserStore {
        JsonUserStore::open(dir.path().join("users.json")).unwrap()
    }

    #[test]
    fn missing_store_is_initialized_empty() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert!(store.load_all().unwrap().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "[]");
    }

    #[test]
    fn empty_or_invalid_store_without_backup_becomes_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "").unwrap();
        let store = JsonUserStore::open(&path).unwrap();
        assert!(store.load_all().unwrap().is_empty());

        fs::write(&path, "{ not json").unwrap();
        assert!(store.load_all().unwrap().is_empty());
        assert!(serde_json::from_str::<Vec<User>>(&fs::read_to_string(&path).unwrap()).is_ok());
    }

    #[test]
    fn add_user_is_upsert() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert!(store.add_user(user("Alice")).unwrap());
        let mut premium = user("ALICE");
        premium.account_type = AccountType::Premium;
        assert!(!store.add_user(premium).unwrap());

        let users = store.load_all().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(
            store.get_by_username("alice").unwrap().unwrap().account_type,
            AccountType::Premium
        );
        assert!(store.exists("aLiCe").unwrap());
        assert!(!store.exists("bob").unwrap());
    }

    #[test]
    fn update_user_requires_existing_record() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert!(!store.update_user(&user("ghost")).unwrap());
        store.add_user(user("bob")).unwrap();
        let mut bob = store.get_by_username("bob").unwrap().unwrap();
        bob.share_playlists_publicly = true;
        assert!(store.update_user(&bob).unwrap());
        assert!(store.get_by_username("BOB").unwrap().unwrap().share_playlists_publicly);
    }

    #[test]
    fn save_load_roundtrip_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let mut alice = user("alice");
        let mut playlist = Playlist::new_collaborative("Drive", "alice");
        playlist
            .collaboration
            .as_mut()
            .unwrap()
            .add_collaborator("bob");
        playlist.add_song(&Song::new("Ciel", "Gims", "Album", "Pop", 183, "ciel.mp3"));
        alice.playlists.push(playlist);
        alice.followed_users.insert("bob".to_string());
        store.add_user(alice).unwrap();
        store.add_user(user("bob")).unwrap();

        let before: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let users = store.load_all().unwrap();
        store.save_all(&users).unwrap();
        let after: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn writes_leave_backup_and_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.add_user(user("alice")).unwrap();
        store.add_user(user("bob")).unwrap();

        assert!(!store.temp_path().exists());
        let backup: Vec<User> =
            serde_json::from_str(&fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].username, "alice");
    }

    #[test]
    fn partial_temp_file_does_not_affect_store() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.add_user(user("alice")).unwrap();
        store.add_user(user("bob")).unwrap();

        // A crash mid-write leaves a truncated temporary file behind.
        fs::write(store.temp_path(), "[{\"username\": \"alic").unwrap();
        let reopened = open(&dir);
        assert!(!reopened.temp_path().exists());
        let users = reopened.load_all().unwrap();
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn corrupt_store_is_recovered_from_backup() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.add_user(user("alice")).unwrap();
        store.add_user(user("bob")).unwrap();

        // The store got truncated by something outside our control.
        fs::write(store.path(), "[{\"username\": \"ali").unwrap();
        let users = store.load_all().unwrap();
        assert_eq!(users.len(), 1);
        assert!(users.contains("alice"));

        // The recovered state is durable again.
        let on_disk: Vec<User> =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
    }

    #[test]
    fn failed_write_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.add_user(user("alice")).unwrap();
        let before = fs::read(store.path()).unwrap();

        // A directory in place of the temporary file makes every write fail.
        fs::create_dir(store.temp_path()).unwrap();
        fs::write(store.temp_path().join("keep"), "x").unwrap();

        assert!(store.add_user(user("bob")).is_err());
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!store.exists("bob").unwrap());
    }

    #[test]
    fn failed_write_restores_broken_store_from_backup() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.add_user(user("alice")).unwrap();
        store.add_user(user("bob")).unwrap();
        let backup = fs::read(store.backup_path()).unwrap();

        fs::write(store.path(), "[{\"username\": \"ali").unwrap();
        fs::create_dir(store.temp_path()).unwrap();
        fs::write(store.temp_path().join("keep"), "x").unwrap();

        let mut users = UserSet::default();
        users.upsert(user("carol"));
        assert!(store.save_all(&users).is_err());

        assert_eq!(fs::read(store.path()).unwrap(), backup);
        let on_disk: Vec<User> =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].username, "alice");
    }

    #[test]
    fn failed_transaction_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.add_user(user("alice")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let result: Result<(), PersistenceError> = store.transaction(|users| {
            users.upsert(user("bob"));
            Err(PersistenceError::EmptyWrite(PathBuf::from("simulated")))
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(&dir));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store.add_user(user(&format!("user-{}-{}", i, j))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.load_all().unwrap().len(), 40);
    }

    #[test]
    fn authenticate_checks_hash_only() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let hash = hash_password("secret1", &cheap_params()).unwrap();
        store
            .add_user(User::new("alice", hash, AccountType::Free))
            .unwrap();

        assert!(store.authenticate("ALICE", "secret1").unwrap().is_some());
        assert!(store.authenticate("alice", "wrong").unwrap().is_none());
        assert!(store.authenticate("nobody", "secret1").unwrap().is_none());
    }
}
