//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, catalog songs, etc.),
//! update only this file.

#![allow(dead_code)]

// ============================================================================
// Test User Credentials
// ============================================================================

/// Free account test user
pub const TEST_USER: &str = "testuser";

/// Free account test user password
pub const TEST_PASS: &str = "testpass123";

/// Premium account test user
pub const PREMIUM_USER: &str = "premiumuser";

/// Premium account test user password
pub const PREMIUM_PASS: &str = "premiumpass123";

/// User whose password is stored with the legacy SHA-256 scheme
pub const LEGACY_USER: &str = "olduser";

/// Legacy user password
pub const LEGACY_PASS: &str = "oldpass123";

// ============================================================================
// Test Catalog
// ============================================================================

/// "Ciel" by Gims
pub const SONG_CIEL: &str = "Ciel";

/// "So What" by Miles Davis
pub const SONG_SO_WHAT: &str = "So What";

/// "Blue in Green" by Miles Davis
pub const SONG_BLUE_IN_GREEN: &str = "Blue in Green";

/// "Freddie Freeloader" by Miles Davis
pub const SONG_FREDDIE: &str = "Freddie Freeloader";

/// "Clair de Lune" by Claude Debussy
pub const SONG_CLAIR_DE_LUNE: &str = "Clair de Lune";

/// Number of songs in the test catalog
pub const CATALOG_SONGS_COUNT: usize = 5;

/// Artist with three songs in the test catalog
pub const ARTIST_MILES: &str = "Miles Davis";

// ============================================================================
// Timing
// ============================================================================

/// Timeout for a single response line
pub const REQUEST_TIMEOUT_SECS: u64 = 5;
