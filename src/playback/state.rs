use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "STOPPED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Paused => "PAUSED",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Play,
    Pause,
    Stop,
}

/// Transition table of the player. `has_tracks` is false when the loaded
/// playlist is empty, in which case nothing can start playing. Pairs not
/// listed leave the state unchanged.
pub fn transition(state: PlaybackState, event: PlayerEvent, has_tracks: bool) -> PlaybackState {
    use PlaybackState::*;
    use PlayerEvent::*;
    match (state, event) {
        (Stopped, Play) if has_tracks => Playing,
        (Paused, Play) => Playing,
        (Playing, Pause) => Paused,
        (Playing, Stop) | (Paused, Stop) => Stopped,
        (state, _) => state,
    }
}
