pub mod attempt_tracker;
pub mod auth;
mod auth_manager;
mod playlist_manager;
mod user_manager;
pub mod user_models;

pub use attempt_tracker::{AttemptStatus, AttemptTracker, AttemptTrackerConfig, FailureOutcome};
pub use auth::{HashingParams, PasswordScheme};
pub use auth_manager::{AuthError, AuthManager, DEFAULT_MIN_PASSWORD_LEN};
pub use playlist_manager::{
    AddSongOutcome, CollaborativeCreation, PlaylistError, PlaylistManager, PlaylistView,
};
pub use user_manager::{AccountInfo, SocialError, UserManager};
pub use user_models::{AccountType, Capabilities, Collaboration, Playlist, User};
