//! Test fixture creation
//!
//! Builds the catalog file and the user store every test server starts from.

use super::constants::*;
use anyhow::Result;
use jukebox_server::catalog::Song;
use jukebox_server::persistence::JsonUserStore;
use jukebox_server::user::{AccountType, HashingParams, PasswordScheme, User};
use std::path::PathBuf;
use tempfile::TempDir;

/// Cheap argon2 parameters so user creation stays fast in tests.
pub fn test_hashing_params() -> HashingParams {
    HashingParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

fn test_songs() -> Vec<Song> {
    vec![
        Song::new(SONG_CIEL, "Gims", "Ceinture Noire", "Pop", 210, "/media/gims/ciel.mp3"),
        Song::new(SONG_SO_WHAT, ARTIST_MILES, "Kind of Blue", "Jazz", 545, "/media/miles/so_what.mp3"),
        Song::new(
            SONG_FREDDIE,
            ARTIST_MILES,
            "Kind of Blue",
            "Jazz",
            589,
            "/media/miles/freddie.mp3",
        ),
        Song::new(
            SONG_BLUE_IN_GREEN,
            ARTIST_MILES,
            "Kind of Blue",
            "Jazz",
            337,
            "/media/miles/blue_in_green.mp3",
        ),
        Song::new(
            SONG_CLAIR_DE_LUNE,
            "Claude Debussy",
            "Suite bergamasque",
            "Classical",
            300,
            "/media/debussy/clair_de_lune.flac",
        ),
    ]
}

/// Writes the test catalog as a JSON file.
///
/// Returns the temp dir (keep it alive) and the catalog file path.
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, serde_json::to_string_pretty(&test_songs())?)?;
    Ok((dir, path))
}

/// Creates a user store holding the free, premium and legacy test users.
pub fn create_test_store_with_users() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("users.json");
    let store = JsonUserStore::open(&path)?;
    let params = test_hashing_params();

    for (username, password, account_type, scheme) in [
        (TEST_USER, TEST_PASS, AccountType::Free, PasswordScheme::Argon2),
        (PREMIUM_USER, PREMIUM_PASS, AccountType::Premium, PasswordScheme::Argon2),
        (LEGACY_USER, LEGACY_PASS, AccountType::Free, PasswordScheme::LegacySha256),
    ] {
        let hash = scheme.hash(password, &params)?;
        store.add_user(User::new(username, hash, account_type))?;
    }
    Ok((dir, path))
}
