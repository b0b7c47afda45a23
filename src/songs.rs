//! Song catalog.
//!
//! The catalog is the source of the title vocabulary and answers song
//! information and thumbnail lookups.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub author: String,
    pub bpm: String,
    /// Chart levels, e.g. `"NOV 5 / ADV 12 / EXH 16 / MXM 18"`
    pub difficulty: String,
}

#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    songs: Vec<Song>,
}

impl SongCatalog {
    /// Loads a JSON array of songs.
    pub fn from_json(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read song catalog: {}", path.display()))?;
        let songs: Vec<Song> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse song catalog: {}", path.display()))?;
        Ok(Self { songs })
    }

    /// Loads the catalog, or an empty one (with a warning) when the file is
    /// missing or unreadable. Title matching then never succeeds.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_json(path) {
            Ok(catalog) => {
                if catalog.is_empty() {
                    log::warn!("Song catalog {} is empty. Titles will not be matched.", path.display());
                } else {
                    log::info!("Loaded {} songs from {}", catalog.len(), path.display());
                }
                catalog
            }
            Err(e) => {
                log::warn!("{:#}. Titles will not be matched.", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Distinct titles in catalog order.
    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = Vec::with_capacity(self.songs.len());
        for song in &self.songs {
            if !titles.contains(&song.title) {
                titles.push(song.title.clone());
            }
        }
        titles
    }

    /// First entry with exactly this title.
    pub fn find(&self, title: &str) -> Option<&Song> {
        self.songs.iter().find(|s| s.title == title)
    }
}

/// Lowercase hex SHA-256 of a song title; names its thumbnail directory.
pub fn title_digest(title: &str) -> String {
    Sha256::digest(title.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Where the thumbnail for `title` at `difficulty` is stored:
/// `<dir>/<sha256(title)>/<difficulty>.jpg`.
pub fn thumbnail_path(dir: &Path, title: &str, difficulty: &str) -> PathBuf {
    dir.join(title_digest(title)).join(format!("{}.jpg", difficulty))
}

/// The thumbnail path, if the file exists.
pub fn find_thumbnail(dir: &Path, title: &str, difficulty: &str) -> Result<PathBuf> {
    let path = thumbnail_path(dir, title, difficulty);
    if !path.is_file() {
        return Err(anyhow!(
            "Thumbnail not found for {} ({}): {}",
            title,
            difficulty,
            path.display()
        ));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    impl SongCatalog {
        fn from_songs(songs: Vec<Song>) -> Self {
            Self { songs }
        }
    }

    fn song(title: &str, author: &str) -> Song {
        Song {
            title: title.to_string(),
            author: author.to_string(),
            bpm: "180".to_string(),
            difficulty: "MXM 18".to_string(),
        }
    }

    #[test]
    fn test_titles_are_distinct_in_order() {
        let catalog = SongCatalog::from_songs(vec![
            song("GERBERA", "a"),
            song("HE4VEN", "b"),
            song("GERBERA", "c"),
        ]);
        assert_eq!(catalog.titles(), vec!["GERBERA", "HE4VEN"]);
    }

    #[test]
    fn test_find() {
        let catalog = SongCatalog::from_songs(vec![song("GERBERA", "a"), song("GERBERA", "c")]);
        assert_eq!(catalog.find("GERBERA").unwrap().author, "a");
        assert!(catalog.find("gerbera").is_none());
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("songs.json");
        std::fs::write(
            &path,
            r#"[{"title": "HE4VEN", "author": "USAO", "bpm": "200", "difficulty": "MXM 18"}]"#,
        )
        .unwrap();

        let catalog = SongCatalog::load_or_empty(&path);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find("HE4VEN").unwrap().bpm, "200");
    }

    #[test]
    fn test_title_digest() {
        assert_eq!(
            title_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(title_digest("GERBERA").len(), 64);
    }

    #[test]
    fn test_find_thumbnail() {
        let dir = tempdir().unwrap();
        let song_dir = dir.path().join(title_digest("HE4VEN"));
        std::fs::create_dir_all(&song_dir).unwrap();
        std::fs::write(song_dir.join("MXM.jpg"), b"jpeg").unwrap();

        let found = find_thumbnail(dir.path(), "HE4VEN", "MXM").unwrap();
        assert_eq!(found, song_dir.join("MXM.jpg"));

        assert!(find_thumbnail(dir.path(), "HE4VEN", "EXH").is_err());
        assert!(find_thumbnail(dir.path(), "GERBERA", "MXM").is_err());
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let dir = tempdir().unwrap();
        let catalog = SongCatalog::load_or_empty(&dir.path().join("none.json"));
        assert!(catalog.is_empty());
        assert!(catalog.titles().is_empty());
    }
}
