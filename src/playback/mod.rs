mod mode;
mod renderer;
mod session;
mod state;
mod track_list;

pub use mode::{select_mode, ModeFallback, PlaybackMode, PlaybackModeKind, ShuffleOrder};
pub use renderer::{MediaRenderer, RecordingRenderer, RenderCommand, TracingRenderer};
pub use session::{PlaybackSession, PlayerStatus};
pub use state::{transition, PlaybackState, PlayerEvent};
pub use track_list::{NodeId, TrackList};
