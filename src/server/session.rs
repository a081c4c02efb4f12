//! One connection, one [`SessionHandler`].
//!
//! The handler keeps the authentication state of the connection and its
//! playback session, and turns every command line into exactly one
//! [`Response`]. I/O lives in [`run_session`].

use super::protocol::{Command, PlayerCommand, ProtocolError, Response};
use super::state::ServerState;
use crate::playback::{select_mode, PlaybackModeKind, PlaybackSession, PlayerStatus};
use crate::user::{AddSongOutcome, PlaylistError};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

struct LoggedUser {
    username: String,
    shuffle_allowed: bool,
}

pub struct SessionHandler {
    state: ServerState,
    peer: String,
    user: Option<LoggedUser>,
    preferred_mode: PlaybackModeKind,
    player: Option<PlaybackSession>,
}

impl SessionHandler {
    pub fn new(state: ServerState, peer: impl Into<String>) -> Self {
        Self {
            state,
            peer: peer.into(),
            user: None,
            preferred_mode: PlaybackModeKind::Sequential,
            player: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn current_username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn handle_line(&mut self, line: &str) -> (Response, Flow) {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                debug!("[{}] Rejected line: {}", self.peer, err);
                return (Response::error(err), Flow::Continue);
            }
        };
        self.dispatch(command)
    }

    fn dispatch(&mut self, command: Command) -> (Response, Flow) {
        match command {
            Command::Ping => return (Response::line("PONG"), Flow::Continue),
            Command::Quit => return (Response::line("BYE"), Flow::Close),
            _ => {}
        }

        let user = match self.current_username().map(str::to_string) {
            Some(user) => user,
            None if command.allowed_unauthenticated() => {
                return (self.handle_unauthenticated(command), Flow::Continue)
            }
            None => return (Response::error(ProtocolError::NotAuthenticated), Flow::Continue),
        };

        let response = match command {
            Command::Create { .. } => Response::line(format!(
                "CREATE_FAIL {}",
                ProtocolError::AlreadyAuthenticated(user)
            )),
            Command::Login { .. } => Response::line(format!(
                "LOGIN_FAIL {}",
                ProtocolError::AlreadyAuthenticated(user)
            )),
            Command::Logout => self.logout(&user),
            Command::GetAllSongs => Response::Rows(
                self.state
                    .catalog
                    .all_songs()
                    .iter()
                    .map(|song| song.to_wire_line())
                    .collect(),
            ),
            Command::Search { field, query } => Response::Rows(
                self.state
                    .catalog
                    .search(field, &query)
                    .into_iter()
                    .map(|song| song.to_wire_line())
                    .collect(),
            ),
            Command::LoadPlaylist { name, mode } => self.load_playlist(&user, &name, mode),
            Command::SetPlaybackMode { mode } => self.set_playback_mode(&mode),
            Command::Player(player_command) => self.player_command(player_command),
            command => self.handle_library(&user, command),
        };
        (response, Flow::Continue)
    }

    fn handle_unauthenticated(&mut self, command: Command) -> Response {
        let auth = self.state.auth_manager.clone();
        match command {
            Command::Create {
                username,
                password,
                account_type,
            } => match auth.register(&username, &password, &account_type) {
                Ok(_) => Response::line("CREATE_SUCCESS"),
                Err(err) => {
                    info!("[{}] Registration of {} failed: {}", self.peer, username, err);
                    Response::line(format!("CREATE_FAIL {}", err))
                }
            },
            Command::Login { username, password } => match auth.login(&username, &password) {
                Ok(user) => {
                    info!("[{}] Authenticated as {}", self.peer, user.username);
                    self.user = Some(LoggedUser {
                        shuffle_allowed: user.capabilities().shuffle_allowed,
                        username: user.username,
                    });
                    Response::line("LOGIN_SUCCESS")
                }
                Err(err) => Response::line(format!("LOGIN_FAIL {}", err)),
            },
            Command::Logout => Response::line("LOGOUT_SUCCESS"),
            _ => Response::error(ProtocolError::NotAuthenticated),
        }
    }

    fn logout(&mut self, username: &str) -> Response {
        self.player = None;
        self.preferred_mode = PlaybackModeKind::Sequential;
        self.user = None;
        self.state.auth_manager.logout(username);
        Response::line("LOGOUT_SUCCESS")
    }

    /// Playlist and social commands, all backed by the user store.
    fn handle_library(&mut self, user: &str, command: Command) -> Response {
        let playlists = self.state.playlist_manager.clone();
        let social = self.state.user_manager.clone();
        let result: Result<Response, Box<dyn std::error::Error>> = match command {
            Command::CreatePlaylist { name } => playlists
                .create_playlist(user, &name)
                .map(|_| Response::line("PLAYLIST_CREATED"))
                .map_err(Into::into),
            Command::CreateCollabPlaylist {
                name,
                collaborators,
            } => playlists
                .create_collaborative_playlist(user, &name, &collaborators)
                .map(|creation| {
                    if creation.skipped.is_empty() {
                        Response::line("PLAYLIST_CREATED")
                    } else {
                        Response::line(format!(
                            "PLAYLIST_CREATED skipped={}",
                            creation.skipped.join(",")
                        ))
                    }
                })
                .map_err(Into::into),
            Command::AddCollaborator { playlist, username } => playlists
                .add_collaborator(user, &playlist, &username)
                .map(|_| Response::line(format!("SUCCESS Added {} to {}", username, playlist)))
                .map_err(Into::into),
            Command::RemoveCollaborator { playlist, username } => playlists
                .remove_collaborator(user, &playlist, &username)
                .map(|_| {
                    Response::line(format!("SUCCESS Removed {} from {}", username, playlist))
                })
                .map_err(Into::into),
            Command::GetPlaylists => playlists
                .get_playlists(user)
                .map(|views| Response::Rows(views.iter().map(|v| v.to_wire_line()).collect()))
                .map_err(Into::into),
            Command::CheckPlaylist { name } => playlists
                .find_playlist(user, &name)
                .map(|found| match found {
                    Some(_) => Response::line("PLAYLIST_FOUND"),
                    None => Response::line("PLAYLIST_NOT_FOUND"),
                })
                .map_err(Into::into),
            Command::GetPlaylistSongs { name } => match playlists.find_playlist(user, &name) {
                Ok(Some(view)) => Ok(Response::Rows(
                    view.playlist.songs.iter().map(|s| s.to_wire_line()).collect(),
                )),
                Ok(None) => Err(PlaylistError::PlaylistNotFound(name).into()),
                Err(err) => Err(err.into()),
            },
            Command::DeletePlaylist { name } => playlists
                .delete_playlist(user, &name)
                .map(|_| Response::line("PLAYLIST_DELETED"))
                .map_err(Into::into),
            Command::AddSongToPlaylist { playlist, title } => playlists
                .add_song_to_playlist(user, &playlist, &title)
                .map(|outcome| match outcome {
                    AddSongOutcome::Added(song) => {
                        Response::line(format!("SUCCESS Added {} to {}", song.title, playlist))
                    }
                    AddSongOutcome::AlreadyPresent(song) => Response::line(format!(
                        "SUCCESS {} is already in {}",
                        song.title, playlist
                    )),
                })
                .map_err(Into::into),
            Command::RemoveSongFromPlaylist { playlist, title } => playlists
                .remove_song_from_playlist(user, &playlist, &title)
                .map(|song| {
                    Response::line(format!("SUCCESS Removed {} from {}", song.title, playlist))
                })
                .map_err(Into::into),
            Command::Follow { username } => social
                .follow(user, &username)
                .map(|followed| Response::line(format!("SUCCESS Following {}", followed)))
                .map_err(Into::into),
            Command::Unfollow { username } => social
                .unfollow(user, &username)
                .map(|_| Response::line(format!("SUCCESS Unfollowed {}", username)))
                .map_err(Into::into),
            Command::GetFollowing => social
                .following(user)
                .map(Response::Rows)
                .map_err(Into::into),
            Command::SetSharing { enabled } => social
                .set_sharing(user, enabled)
                .map(|_| {
                    Response::line(format!(
                        "SUCCESS Sharing {}",
                        if enabled { "on" } else { "off" }
                    ))
                })
                .map_err(Into::into),
            Command::GetSharedPlaylists { username } => social
                .shared_playlists(&username)
                .map(|(holder, shared)| {
                    Response::Rows(shared.iter().map(|p| p.to_wire_line(&holder)).collect())
                })
                .map_err(Into::into),
            Command::AccountInfo => social
                .account_info(user)
                .map(|info| Response::line(info.to_wire_line()))
                .map_err(Into::into),
            other => {
                error!("[{}] Command {:?} reached the library dispatcher", self.peer, other);
                Ok(Response::error("Command not available"))
            }
        };
        result.unwrap_or_else(|err| {
            debug!("[{}] {} failed: {}", self.peer, user, err);
            Response::error(err)
        })
    }

    fn shuffle_allowed(&self) -> bool {
        self.user.as_ref().map(|u| u.shuffle_allowed).unwrap_or(false)
    }

    /// Resolves a requested mode, remembering it for later loads. Returns the
    /// fallback reason when the request could not be honoured.
    fn choose_mode(&mut self, requested: &str) -> Option<String> {
        match select_mode(requested, self.shuffle_allowed()) {
            Ok(kind) => {
                self.preferred_mode = kind;
                None
            }
            Err(fallback) => {
                self.preferred_mode = PlaybackModeKind::Sequential;
                Some(fallback.to_string())
            }
        }
    }

    fn load_playlist(&mut self, user: &str, name: &str, mode: Option<String>) -> Response {
        let view = match self.state.playlist_manager.find_playlist(user, name) {
            Ok(Some(view)) => view,
            Ok(None) => return Response::error(PlaylistError::PlaylistNotFound(name.to_string())),
            Err(err) => return Response::error(err),
        };
        let fallback = mode.and_then(|mode| self.choose_mode(&mode));

        // Replacing the player stops whatever the previous one was playing.
        self.player = None;
        let renderer = self
            .state
            .make_renderer(&format!("{}@{}", user, self.peer));
        let count = view.playlist.songs.len();
        let player = PlaybackSession::load(
            view.playlist.name.clone(),
            view.playlist.songs,
            self.preferred_mode,
            renderer,
        );
        let line = format!(
            "SUCCESS Loaded {} with {} song(s) [mode={}]",
            player.playlist_name(),
            count,
            player.mode()
        );
        self.player = Some(player);
        match fallback {
            Some(reason) => Response::line(format!("{} MODE_FALLBACK {}", line, reason)),
            None => Response::line(line),
        }
    }

    fn set_playback_mode(&mut self, requested: &str) -> Response {
        let fallback = self.choose_mode(requested);
        if let Some(player) = self.player.as_mut() {
            player.set_mode(self.preferred_mode);
        }
        match fallback {
            None => Response::line(format!("SUCCESS Playback mode set to {}", self.preferred_mode)),
            Some(reason) => Response::line(format!(
                "MODE_FALLBACK {}; using {}",
                reason,
                PlaybackModeKind::Sequential
            )),
        }
    }

    fn player_command(&mut self, command: PlayerCommand) -> Response {
        // Exit always ends with nothing loaded.
        if command == PlayerCommand::Exit {
            let status = match self.player.take() {
                Some(player) => player.exit(),
                None => PlayerStatus::idle(true),
            };
            return Response::line(status.to_wire_line());
        }
        let status = match self.player.as_mut() {
            None => PlayerStatus::idle(command == PlayerCommand::Status),
            Some(player) => match command {
                PlayerCommand::Play => player.play(),
                PlayerCommand::Pause => player.pause(),
                PlayerCommand::Stop => player.stop(),
                PlayerCommand::Next => player.next(),
                PlayerCommand::Prev => player.previous(),
                PlayerCommand::Status | PlayerCommand::Exit => player.status(),
            },
        };
        Response::line(status.to_wire_line())
    }
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> io::Result<()> {
    writer.write_all(response.encode().as_bytes()).await?;
    writer.flush().await
}

/// Serves one connection until the client leaves, sends `QUIT`, or stays
/// silent past the idle timeout.
pub async fn run_session<S>(stream: S, state: ServerState, peer: String) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let idle_timeout = state.config.idle_timeout;
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut handler = SessionHandler::new(state, peer.clone());
    let mut line = String::new();

    loop {
        line.clear();
        let read = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, reader.read_line(&mut line)).await {
                Ok(read) => read,
                Err(_) => {
                    info!("[{}] Closing idle session", peer);
                    write_response(&mut writer, &Response::error("Idle timeout")).await?;
                    break;
                }
            },
            None => reader.read_line(&mut line).await,
        };
        let read = match read {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!("[{}] Received non UTF-8 line", peer);
                write_response(&mut writer, &Response::error("Invalid UTF-8 in command")).await?;
                continue;
            }
            Err(err) => return Err(err),
        };
        if read == 0 {
            debug!("[{}] Client closed the connection", peer);
            break;
        }

        let (response, flow) = handler.handle_line(&line);
        write_response(&mut writer, &response).await?;
        if flow == Flow::Close {
            break;
        }
    }

    if let Some(username) = handler.current_username() {
        debug!("[{}] Session of {} ended", peer, username);
    }
    Ok(())
}
