use crate::catalog::Song;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Play(Song),
    Pause,
    Resume,
    Stop,
}

/// Receives what the player wants the audio output to do.
pub trait MediaRenderer: Send {
    fn render(&mut self, command: RenderCommand);
}

/// Default renderer, logs every command.
pub struct TracingRenderer {
    session: String,
}

impl TracingRenderer {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
        }
    }
}

impl MediaRenderer for TracingRenderer {
    fn render(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Play(song) => info!(
                "[{}] Rendering {} - {} from {}",
                self.session, song.title, song.artist, song.media_locator
            ),
            RenderCommand::Pause => info!("[{}] Rendering paused", self.session),
            RenderCommand::Resume => info!("[{}] Rendering resumed", self.session),
            RenderCommand::Stop => info!("[{}] Rendering stopped", self.session),
        }
    }
}

/// Records commands so callers can inspect them afterwards.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    commands: Arc<Mutex<Vec<RenderCommand>>>,
}

impl RecordingRenderer {
    pub fn commands(&self) -> Vec<RenderCommand> {
        self.commands
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl MediaRenderer for RecordingRenderer {
    fn render(&mut self, command: RenderCommand) {
        self.commands
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(command);
    }
}
