//! Traversal strategies deciding where `next` and `previous` land.

use super::track_list::{NodeId, TrackList};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackModeKind {
    #[default]
    Sequential,
    Repeat,
    Shuffle,
}

impl PlaybackModeKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SEQUENTIAL" => Some(Self::Sequential),
            "REPEAT" => Some(Self::Repeat),
            "SHUFFLE" => Some(Self::Shuffle),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "SEQUENTIAL",
            Self::Repeat => "REPEAT",
            Self::Shuffle => "SHUFFLE",
        }
    }
}

impl fmt::Display for PlaybackModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a requested mode was replaced by [`PlaybackModeKind::Sequential`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeFallback {
    Unknown(String),
    NotAllowed(PlaybackModeKind),
}

impl fmt::Display for ModeFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeFallback::Unknown(name) => write!(f, "Unknown playback mode {}", name),
            ModeFallback::NotAllowed(kind) => {
                write!(f, "{} is not available for this account", kind)
            }
        }
    }
}

/// Resolves a requested mode name against the account's shuffle capability.
pub fn select_mode(
    requested: &str,
    shuffle_allowed: bool,
) -> Result<PlaybackModeKind, ModeFallback> {
    match PlaybackModeKind::parse(requested) {
        None => Err(ModeFallback::Unknown(requested.to_string())),
        Some(PlaybackModeKind::Shuffle) if !shuffle_allowed => {
            Err(ModeFallback::NotAllowed(PlaybackModeKind::Shuffle))
        }
        Some(kind) => Ok(kind),
    }
}

/// Randomized visitation order over a track list.
///
/// A pass visits every track exactly once. Once a pass is exhausted, `next`
/// draws a fresh permutation whose first entry differs from the track that
/// just played (when there is more than one track). `previous` walks back
/// inside the current pass and stops at its first entry.
#[derive(Debug, Clone)]
pub struct ShuffleOrder {
    order: Vec<NodeId>,
    cursor: usize,
    rng: StdRng,
}

impl ShuffleOrder {
    pub fn new(list: &TrackList, current: Option<NodeId>) -> Self {
        Self::with_rng(list, current, StdRng::from_os_rng())
    }

    pub fn with_seed(list: &TrackList, current: Option<NodeId>, seed: u64) -> Self {
        Self::with_rng(list, current, StdRng::seed_from_u64(seed))
    }

    fn with_rng(list: &TrackList, current: Option<NodeId>, mut rng: StdRng) -> Self {
        let mut order = list.ids();
        order.shuffle(&mut rng);
        // A track already playing opens the pass.
        if let Some(current) = current {
            if let Some(index) = order.iter().position(|id| *id == current) {
                order.swap(0, index);
            }
        }
        Self {
            order,
            cursor: 0,
            rng,
        }
    }

    pub fn first(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    fn next(&mut self, current: NodeId) -> Option<NodeId> {
        if self.order.is_empty() {
            return None;
        }
        if self.cursor + 1 < self.order.len() {
            self.cursor += 1;
            return Some(self.order[self.cursor]);
        }
        self.order.shuffle(&mut self.rng);
        let last = self.order.len() - 1;
        if self.order[0] == current {
            self.order.swap(0, last);
        }
        self.cursor = 0;
        Some(self.order[0])
    }

    fn previous(&mut self) -> Option<NodeId> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.order[self.cursor])
    }
}

/// The active traversal strategy of a playback session.
#[derive(Debug, Clone)]
pub enum PlaybackMode {
    Sequential,
    Repeat,
    Shuffle(ShuffleOrder),
}

impl PlaybackMode {
    pub fn for_list(kind: PlaybackModeKind, list: &TrackList, current: Option<NodeId>) -> Self {
        match kind {
            PlaybackModeKind::Sequential => PlaybackMode::Sequential,
            PlaybackModeKind::Repeat => PlaybackMode::Repeat,
            PlaybackModeKind::Shuffle => PlaybackMode::Shuffle(ShuffleOrder::new(list, current)),
        }
    }

    pub fn kind(&self) -> PlaybackModeKind {
        match self {
            PlaybackMode::Sequential => PlaybackModeKind::Sequential,
            PlaybackMode::Repeat => PlaybackModeKind::Repeat,
            PlaybackMode::Shuffle(_) => PlaybackModeKind::Shuffle,
        }
    }

    /// Track a fresh load starts on.
    pub fn first(&self, list: &TrackList) -> Option<NodeId> {
        match self {
            PlaybackMode::Shuffle(order) => order.first(),
            _ => list.head(),
        }
    }

    /// Returns the node to move to, or `None` when the move is a no-op.
    pub fn next(&mut self, list: &TrackList, current: NodeId) -> Option<NodeId> {
        match self {
            PlaybackMode::Sequential => list.next(current),
            PlaybackMode::Repeat => list.next(current).or_else(|| list.head()),
            PlaybackMode::Shuffle(order) => order.next(current),
        }
    }

    pub fn previous(&mut self, list: &TrackList, current: NodeId) -> Option<NodeId> {
        match self {
            PlaybackMode::Sequential => list.prev(current),
            PlaybackMode::Repeat => list.prev(current).or_else(|| list.tail()),
            PlaybackMode::Shuffle(order) => order.previous(),
        }
    }
}
