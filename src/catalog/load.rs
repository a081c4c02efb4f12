//! Catalog loading functionality

use super::{Catalog, Song};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];
const UNKNOWN: &str = "Unknown";

#[derive(Debug)]
pub enum Problem {
    UnreadableEntry(String),
    DuplicateLocator(String),
    LineBreakInField(String),
}

/// Builds the catalog either from a JSON file holding an array of song
/// records, or from a directory laid out as `<artist>/<album>/<title>.<ext>`.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path = path.as_ref();
    let (songs, mut problems) = if path.is_dir() {
        scan_directory(path)
    } else if path.is_file() {
        (read_song_file(path)?, vec![])
    } else {
        bail!("Catalog path {} does not exist.", path.display());
    };

    let (songs, broken): (Vec<Song>, Vec<Song>) =
        songs.into_iter().partition(|song| !song.has_line_break());
    problems.extend(
        broken
            .into_iter()
            .map(|song| Problem::LineBreakInField(song.media_locator)),
    );

    if !problems.is_empty() {
        warn!("Found {} problems while loading the catalog:", problems.len());
        for problem in problems.iter() {
            warn!("- {:?}", problem);
        }
    }

    let catalog = Catalog::build(songs);
    info!("Catalog has {} songs", catalog.get_songs_count());
    Ok(catalog)
}

fn read_song_file(path: &Path) -> Result<Vec<Song>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file {}", path.display()))
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn dir_name(path: Option<&Path>, root: &Path) -> String {
    match path {
        Some(p) if p.starts_with(root) && p != root => p
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        _ => UNKNOWN.to_string(),
    }
}

fn scan_directory(root: &Path) -> (Vec<Song>, Vec<Problem>) {
    let mut songs = vec![];
    let mut problems = vec![];
    let mut seen = HashSet::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                problems.push(Problem::UnreadableEntry(err.to_string()));
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio_file(path) {
            continue;
        }

        let locator = path.to_string_lossy().to_string();
        if !seen.insert(locator.clone()) {
            problems.push(Problem::DuplicateLocator(locator));
            continue;
        }

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let album_dir = path.parent();
        let artist_dir = album_dir.and_then(|p| p.parent());

        songs.push(Song::new(
            title,
            dir_name(artist_dir, root),
            dir_name(album_dir, root),
            UNKNOWN,
            0,
            locator,
        ));
    }

    (songs, problems)
}
