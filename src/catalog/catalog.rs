use super::song::normalize_title;
use super::Song;
use std::collections::HashMap;

/// In-memory song index. Built once at startup, read-only afterwards, so it
/// can be shared between sessions without locking.
#[derive(Debug, Default)]
pub struct Catalog {
    songs: Vec<Song>,
    by_title: HashMap<String, Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Artist,
    Album,
    Genre,
}

impl SearchField {
    fn value_of<'a>(&self, song: &'a Song) -> &'a str {
        match self {
            SearchField::Title => &song.title,
            SearchField::Artist => &song.artist,
            SearchField::Album => &song.album,
            SearchField::Genre => &song.genre,
        }
    }
}

impl Catalog {
    pub fn build(songs: Vec<Song>) -> Catalog {
        let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, song) in songs.iter().enumerate() {
            by_title
                .entry(normalize_title(&song.title))
                .or_default()
                .push(index);
        }
        Catalog { songs, by_title }
    }

    pub fn get_songs_count(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn all_songs(&self) -> &[Song] {
        &self.songs
    }

    /// Case-insensitive substring search on a single field, in catalog order.
    pub fn search(&self, field: SearchField, query: &str) -> Vec<&Song> {
        let query = query.trim().to_lowercase();
        self.songs
            .iter()
            .filter(|song| field.value_of(song).to_lowercase().contains(&query))
            .collect()
    }

    pub fn find_exact_title(&self, title: &str) -> Option<&Song> {
        self.by_title
            .get(&normalize_title(title))
            .and_then(|indices| indices.first())
            .map(|index| &self.songs[*index])
    }

    /// Resolves a title the way playlist edits do: an exact (case-insensitive)
    /// match wins over any substring match, otherwise the first song whose
    /// title contains the query is returned.
    pub fn resolve_title(&self, title: &str) -> Option<&Song> {
        let query = normalize_title(title);
        if query.is_empty() {
            return None;
        }
        self.find_exact_title(&query).or_else(|| {
            self.songs
                .iter()
                .find(|song| song.title.to_lowercase().contains(&query))
        })
    }
}
