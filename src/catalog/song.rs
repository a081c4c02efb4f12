use serde::{Deserialize, Serialize};

/// A single audio entry. Playlists hold their own copies, the catalog is never
/// mutated through them.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    #[serde(rename = "duration")]
    pub duration_seconds: u32,
    #[serde(rename = "filePath")]
    pub media_locator: String,
}

impl Song {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        genre: impl Into<String>,
        duration_seconds: u32,
        media_locator: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            genre: genre.into(),
            duration_seconds,
            media_locator: media_locator.into(),
        }
    }

    /// Songs are matched by case-insensitive title. Two different recordings
    /// sharing a title collide.
    pub fn same_title(&self, title: &str) -> bool {
        normalize_title(&self.title) == normalize_title(title)
    }

    /// Fields with line breaks would split a wire line in two.
    pub fn has_line_break(&self) -> bool {
        [&self.title, &self.artist, &self.album, &self.genre]
            .iter()
            .any(|field| field.contains(['\n', '\r']))
    }

    /// Pipe-delimited representation used by the line protocol.
    pub fn to_wire_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.title, self.artist, self.album, self.genre, self.duration_seconds
        )
    }
}

pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
