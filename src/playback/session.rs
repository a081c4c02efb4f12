use super::mode::{PlaybackMode, PlaybackModeKind};
use super::renderer::{MediaRenderer, RenderCommand};
use super::state::{transition, PlaybackState, PlayerEvent};
use super::track_list::{NodeId, TrackList};
use crate::catalog::Song;
use tracing::debug;

/// Snapshot reported after every player command.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    /// One-based link position of the current track, zero when there is none.
    pub position: usize,
    pub count: usize,
    pub song: Option<Song>,
    pub mode: Option<PlaybackModeKind>,
    pub changed: bool,
}

impl PlayerStatus {
    /// Status of a connection with nothing loaded.
    pub fn idle(changed: bool) -> Self {
        Self {
            state: PlaybackState::Stopped,
            position: 0,
            count: 0,
            song: None,
            mode: None,
            changed,
        }
    }

    pub fn to_wire_line(&self) -> String {
        let mut line = String::new();
        if !self.changed {
            line.push_str("UNCHANGED ");
        }
        line.push_str(&format!("{} {}/{}", self.state, self.position, self.count));
        if let Some(song) = &self.song {
            line.push_str(&format!(" {} - {}", song.title, song.artist));
        }
        if let Some(mode) = self.mode {
            line.push_str(&format!(" [mode={}]", mode));
        }
        line
    }
}

/// Player bound to one connection and one loaded playlist.
///
/// A fresh load sits before the first track: `play` or `next` moves onto the
/// track the mode starts with. Never persisted. Dropping the session stops the
/// renderer if something is still playing.
pub struct PlaybackSession {
    playlist_name: String,
    tracks: TrackList,
    current: Option<NodeId>,
    state: PlaybackState,
    mode: PlaybackMode,
    renderer: Box<dyn MediaRenderer>,
}

impl PlaybackSession {
    pub fn load(
        playlist_name: impl Into<String>,
        songs: Vec<Song>,
        mode: PlaybackModeKind,
        renderer: Box<dyn MediaRenderer>,
    ) -> Self {
        let tracks = TrackList::new(songs);
        let mode = PlaybackMode::for_list(mode, &tracks, None);
        Self::assemble(playlist_name.into(), tracks, mode, renderer)
    }

    /// Like [`PlaybackSession::load`] with a caller-provided strategy.
    pub fn load_with_mode(
        playlist_name: impl Into<String>,
        songs: Vec<Song>,
        mode: impl FnOnce(&TrackList) -> PlaybackMode,
        renderer: Box<dyn MediaRenderer>,
    ) -> Self {
        let tracks = TrackList::new(songs);
        let mode = mode(&tracks);
        Self::assemble(playlist_name.into(), tracks, mode, renderer)
    }

    fn assemble(
        playlist_name: String,
        tracks: TrackList,
        mode: PlaybackMode,
        renderer: Box<dyn MediaRenderer>,
    ) -> Self {
        debug!(
            "Loaded playlist {} with {} tracks in {} mode",
            playlist_name,
            tracks.len(),
            mode.kind()
        );
        Self {
            playlist_name,
            tracks,
            current: None,
            state: PlaybackState::Stopped,
            mode,
            renderer,
        }
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn mode(&self) -> PlaybackModeKind {
        self.mode.kind()
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current.and_then(|id| self.tracks.song(id))
    }

    pub fn status(&self) -> PlayerStatus {
        self.snapshot(true)
    }

    pub fn play(&mut self) -> PlayerStatus {
        let before = self.state;
        self.apply(PlayerEvent::Play);
        match (before, self.state) {
            (PlaybackState::Stopped, PlaybackState::Playing) => {
                if self.current.is_none() {
                    self.current = self.mode.first(&self.tracks);
                }
                self.render_current()
            }
            (PlaybackState::Paused, PlaybackState::Playing) => {
                self.renderer.render(RenderCommand::Resume)
            }
            _ => {}
        }
        self.snapshot(before != self.state)
    }

    pub fn pause(&mut self) -> PlayerStatus {
        let before = self.state;
        self.apply(PlayerEvent::Pause);
        if before != self.state {
            self.renderer.render(RenderCommand::Pause);
        }
        self.snapshot(before != self.state)
    }

    pub fn stop(&mut self) -> PlayerStatus {
        let before = self.state;
        self.apply(PlayerEvent::Stop);
        if before != self.state {
            self.renderer.render(RenderCommand::Stop);
        }
        self.snapshot(before != self.state)
    }

    pub fn next(&mut self) -> PlayerStatus {
        let target = match self.current {
            Some(current) => self.mode.next(&self.tracks, current),
            None => self.mode.first(&self.tracks),
        };
        self.move_to(target)
    }

    pub fn previous(&mut self) -> PlayerStatus {
        let target = match self.current {
            Some(current) => self.mode.previous(&self.tracks, current),
            None => None,
        };
        self.move_to(target)
    }

    /// Swaps the traversal strategy, keeping the current track.
    pub fn set_mode(&mut self, kind: PlaybackModeKind) {
        self.mode = PlaybackMode::for_list(kind, &self.tracks, self.current);
    }

    /// Tears the player down.
    pub fn exit(self) -> PlayerStatus {
        drop(self);
        PlayerStatus::idle(true)
    }

    fn apply(&mut self, event: PlayerEvent) {
        self.state = transition(self.state, event, !self.tracks.is_empty());
    }

    fn move_to(&mut self, target: Option<NodeId>) -> PlayerStatus {
        match target {
            Some(target) if Some(target) != self.current => {
                self.current = Some(target);
                if self.state == PlaybackState::Playing {
                    self.render_current();
                }
                self.snapshot(true)
            }
            _ => self.snapshot(false),
        }
    }

    fn render_current(&mut self) {
        if let Some(song) = self.current_song().cloned() {
            self.renderer.render(RenderCommand::Play(song));
        }
    }

    fn snapshot(&self, changed: bool) -> PlayerStatus {
        PlayerStatus {
            state: self.state,
            position: self.current.map(|id| id.position() + 1).unwrap_or(0),
            count: self.tracks.len(),
            song: self.current_song().cloned(),
            mode: Some(self.mode.kind()),
            changed,
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if self.state != PlaybackState::Stopped {
            self.state = PlaybackState::Stopped;
            self.renderer.render(RenderCommand::Stop);
        }
    }
}
