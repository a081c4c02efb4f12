//! Line protocol: command parsing and response framing.
//!
//! A request is one line. The first token is the command keyword, matched
//! case-insensitively; the remaining tokens are split with POSIX shell rules
//! so that quoted arguments may contain spaces.

use crate::catalog::SearchField;
use thiserror::Error;

/// Terminates every multi-line response.
pub const END: &str = "END";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty command")]
    Empty,

    #[error("Unbalanced quotes in command")]
    UnbalancedQuotes,

    #[error("Unknown command {0}")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Please login first")]
    NotAuthenticated,

    #[error("Already logged in as {0}")]
    AlreadyAuthenticated(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Stop,
    Next,
    Prev,
    Exit,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        username: String,
        password: String,
        account_type: String,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    Ping,
    Quit,

    GetAllSongs,
    Search {
        field: SearchField,
        query: String,
    },

    CreatePlaylist {
        name: String,
    },
    CreateCollabPlaylist {
        name: String,
        collaborators: String,
    },
    AddCollaborator {
        playlist: String,
        username: String,
    },
    RemoveCollaborator {
        playlist: String,
        username: String,
    },
    GetPlaylists,
    CheckPlaylist {
        name: String,
    },
    GetPlaylistSongs {
        name: String,
    },
    DeletePlaylist {
        name: String,
    },
    AddSongToPlaylist {
        playlist: String,
        title: String,
    },
    RemoveSongFromPlaylist {
        playlist: String,
        title: String,
    },

    LoadPlaylist {
        name: String,
        mode: Option<String>,
    },
    SetPlaybackMode {
        mode: String,
    },
    Player(PlayerCommand),

    Follow {
        username: String,
    },
    Unfollow {
        username: String,
    },
    GetFollowing,
    SetSharing {
        enabled: bool,
    },
    GetSharedPlaylists {
        username: String,
    },
    AccountInfo,
}

fn exactly<const N: usize>(
    args: Vec<String>,
    usage: &'static str,
) -> Result<[String; N], ProtocolError> {
    args.try_into().map_err(|_| ProtocolError::Usage(usage))
}

fn joined(args: &[String], usage: &'static str) -> Result<String, ProtocolError> {
    let text = args.join(" ");
    if text.trim().is_empty() {
        Err(ProtocolError::Usage(usage))
    } else {
        Ok(text)
    }
}

/// First argument on its own, the rest joined by a space.
fn head_and_rest(
    mut args: Vec<String>,
    usage: &'static str,
) -> Result<(String, String), ProtocolError> {
    if args.len() < 2 {
        return Err(ProtocolError::Usage(usage));
    }
    let rest = args.split_off(1);
    let head = args.remove(0);
    Ok((head, joined(&rest, usage)?))
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let mut tokens = shlex::split(line).ok_or(ProtocolError::UnbalancedQuotes)?;
        if tokens.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let keyword = tokens.remove(0).to_ascii_uppercase();
        let args = tokens;

        let command = match keyword.as_str() {
            "CREATE" => {
                let [username, password, account_type] =
                    exactly(args, "CREATE <username> <password> <free|premium>")?;
                Command::Create {
                    username,
                    password,
                    account_type,
                }
            }
            "LOGIN" => {
                let [username, password] = exactly(args, "LOGIN <username> <password>")?;
                Command::Login { username, password }
            }
            "LOGOUT" => Command::Logout,
            "PING" => Command::Ping,
            "QUIT" => Command::Quit,

            "GET_ALL_SONGS" => Command::GetAllSongs,
            "SEARCH_TITLE" => Command::Search {
                field: SearchField::Title,
                query: joined(&args, "SEARCH_TITLE <query>")?,
            },
            "SEARCH_ARTIST" => Command::Search {
                field: SearchField::Artist,
                query: joined(&args, "SEARCH_ARTIST <query>")?,
            },
            "SEARCH_ALBUM" => Command::Search {
                field: SearchField::Album,
                query: joined(&args, "SEARCH_ALBUM <query>")?,
            },
            "SEARCH_GENRE" => Command::Search {
                field: SearchField::Genre,
                query: joined(&args, "SEARCH_GENRE <query>")?,
            },

            "CREATE_PLAYLIST" => Command::CreatePlaylist {
                name: joined(&args, "CREATE_PLAYLIST <name>")?,
            },
            "CREATE_COLLAB_PLAYLIST" => {
                const USAGE: &str = "CREATE_COLLAB_PLAYLIST <name> <user1,user2,...>";
                let mut args = args;
                if args.is_empty() {
                    return Err(ProtocolError::Usage(USAGE));
                }
                let rest = args.split_off(1);
                let name = args.remove(0);
                Command::CreateCollabPlaylist {
                    name,
                    collaborators: rest.join(","),
                }
            }
            "ADD_COLLABORATOR" => {
                let [playlist, username] =
                    exactly(args, "ADD_COLLABORATOR <playlist> <username>")?;
                Command::AddCollaborator { playlist, username }
            }
            "REMOVE_COLLABORATOR" => {
                let [playlist, username] =
                    exactly(args, "REMOVE_COLLABORATOR <playlist> <username>")?;
                Command::RemoveCollaborator { playlist, username }
            }
            "GET_PLAYLISTS" => Command::GetPlaylists,
            "CHECK_PLAYLIST" => Command::CheckPlaylist {
                name: joined(&args, "CHECK_PLAYLIST <name>")?,
            },
            "GET_PLAYLIST_SONGS" => Command::GetPlaylistSongs {
                name: joined(&args, "GET_PLAYLIST_SONGS <name>")?,
            },
            "DELETE_PLAYLIST" => Command::DeletePlaylist {
                name: joined(&args, "DELETE_PLAYLIST <name>")?,
            },
            "ADD_SONG_TO_PLAYLIST" => {
                let (playlist, title) =
                    head_and_rest(args, "ADD_SONG_TO_PLAYLIST <playlist> <title>")?;
                Command::AddSongToPlaylist { playlist, title }
            }
            "REMOVE_SONG_FROM_PLAYLIST" => {
                let (playlist, title) =
                    head_and_rest(args, "REMOVE_SONG_FROM_PLAYLIST <playlist> <title>")?;
                Command::RemoveSongFromPlaylist { playlist, title }
            }

            "LOAD_PLAYLIST" => {
                const USAGE: &str = "LOAD_PLAYLIST <name> [mode]";
                let mut args = args.into_iter();
                match (args.next(), args.next(), args.next()) {
                    (Some(name), mode, None) => Command::LoadPlaylist { name, mode },
                    _ => return Err(ProtocolError::Usage(USAGE)),
                }
            }
            "SET_PLAYBACK_MODE" => {
                let [mode] = exactly(args, "SET_PLAYBACK_MODE <SEQUENTIAL|REPEAT|SHUFFLE>")?;
                Command::SetPlaybackMode { mode }
            }
            "PLAYER_PLAY" => Command::Player(PlayerCommand::Play),
            "PLAYER_PAUSE" => Command::Player(PlayerCommand::Pause),
            "PLAYER_STOP" => Command::Player(PlayerCommand::Stop),
            "PLAYER_NEXT" => Command::Player(PlayerCommand::Next),
            "PLAYER_PREV" | "PLAYER_PREVIOUS" => Command::Player(PlayerCommand::Prev),
            "PLAYER_EXIT" => Command::Player(PlayerCommand::Exit),
            "PLAYER_STATUS" => Command::Player(PlayerCommand::Status),

            "FOLLOW" => {
                let [username] = exactly(args, "FOLLOW <username>")?;
                Command::Follow { username }
            }
            "UNFOLLOW" => {
                let [username] = exactly(args, "UNFOLLOW <username>")?;
                Command::Unfollow { username }
            }
            "GET_FOLLOWING" => Command::GetFollowing,
            "SET_SHARING" => {
                const USAGE: &str = "SET_SHARING <ON|OFF>";
                let [flag] = exactly(args, USAGE)?;
                let enabled = match flag.to_ascii_uppercase().as_str() {
                    "ON" | "TRUE" | "YES" => true,
                    "OFF" | "FALSE" | "NO" => false,
                    _ => return Err(ProtocolError::Usage(USAGE)),
                };
                Command::SetSharing { enabled }
            }
            "GET_SHARED_PLAYLISTS" => {
                let [username] = exactly(args, "GET_SHARED_PLAYLISTS <username>")?;
                Command::GetSharedPlaylists { username }
            }
            "ACCOUNT_INFO" => Command::AccountInfo,

            _ => return Err(ProtocolError::UnknownCommand(keyword)),
        };
        Ok(command)
    }

    /// Commands accepted before login.
    pub fn allowed_unauthenticated(&self) -> bool {
        matches!(
            self,
            Command::Create { .. }
                | Command::Login { .. }
                | Command::Logout
                | Command::Ping
                | Command::Quit
        )
    }
}

/// What the session writes back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Line(String),
    /// Data rows, written followed by [`END`].
    Rows(Vec<String>),
}

impl Response {
    pub fn line(text: impl Into<String>) -> Self {
        Response::Line(text.into())
    }

    pub fn error(reason: impl std::fmt::Display) -> Self {
        Response::Line(format!("ERROR {}", reason))
    }

    /// Wire form, newline terminated.
    pub fn encode(&self) -> String {
        match self {
            Response::Line(line) => format!("{}\n", line),
            Response::Rows(rows) => {
                let mut out = String::new();
                for row in rows {
                    out.push_str(row);
                    out.push('\n');
                }
                out.push_str(END);
                out.push('\n');
                out
            }
        }
    }
}
