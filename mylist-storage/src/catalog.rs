//! In-memory content catalog.
//!
//! Implements [`ContentLookup`] over maps of movies, shows, episodes and
//! users. Used by tests and by development servers seeded from a JSON file.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mylist_core::{
    ContentId, ContentLookup, ContentMetadata, EpisodeId, EpisodeMetadata, LookupError, UserId,
};
use serde::Deserialize;

/// Error type for loading catalog fixtures.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    id: ContentId,
    #[serde(flatten)]
    metadata: ContentMetadata,
}

#[derive(Debug, Deserialize)]
struct EpisodeEntry {
    id: EpisodeId,
    #[serde(flatten)]
    metadata: EpisodeMetadata,
}

/// On-disk catalog format.
///
/// ```json
/// {
///   "users": ["0190..."],
///   "movies": [{"id": "0190...", "title": "Inception", "genres": ["Sci-Fi"]}],
///   "shows": [{"id": "0190...", "title": "Dark"}],
///   "episodes": [{"id": "0190...", "showId": "0190...", "title": "Secrets"}]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFixture {
    users: Vec<UserId>,
    movies: Vec<ContentEntry>,
    shows: Vec<ContentEntry>,
    episodes: Vec<EpisodeEntry>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    users: HashSet<UserId>,
    movies: HashMap<ContentId, ContentMetadata>,
    shows: HashMap<ContentId, ContentMetadata>,
    episodes: HashMap<EpisodeId, EpisodeMetadata>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    inner: Arc<RwLock<CatalogInner>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let fixture: CatalogFixture = serde_json::from_str(json)?;
        let inner = CatalogInner {
            users: fixture.users.into_iter().collect(),
            movies: fixture
                .movies
                .into_iter()
                .map(|e| (e.id, e.metadata))
                .collect(),
            shows: fixture
                .shows
                .into_iter()
                .map(|e| (e.id, e.metadata))
                .collect(),
            episodes: fixture
                .episodes
                .into_iter()
                .map(|e| (e.id, e.metadata))
                .collect(),
        };
        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn add_user(&self, user_id: UserId) {
        if let Ok(mut inner) = self.inner.write() {
            inner.users.insert(user_id);
        }
    }

    pub fn add_movie(&self, id: ContentId, metadata: ContentMetadata) {
        if let Ok(mut inner) = self.inner.write() {
            inner.movies.insert(id, metadata);
        }
    }

    pub fn add_show(&self, id: ContentId, metadata: ContentMetadata) {
        if let Ok(mut inner) = self.inner.write() {
            inner.shows.insert(id, metadata);
        }
    }

    pub fn add_episode(&self, id: EpisodeId, metadata: EpisodeMetadata) {
        if let Ok(mut inner) = self.inner.write() {
            inner.episodes.insert(id, metadata);
        }
    }

    /// Change a movie's catalog entry in place, as a content editor would.
    pub fn rename_movie(&self, id: ContentId, title: impl Into<String>) -> bool {
        match self.inner.write() {
            Ok(mut inner) => match inner.movies.get_mut(&id) {
                Some(metadata) => {
                    metadata.title = title.into();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogInner) -> T) -> Result<T, LookupError> {
        self.inner
            .read()
            .map(|inner| f(&inner))
            .map_err(|_| LookupError::Backend {
                reason: "catalog lock poisoned".to_string(),
            })
    }
}

#[async_trait]
impl ContentLookup for InMemoryCatalog {
    async fn user_exists(&self, user_id: UserId) -> Result<bool, LookupError> {
        self.read(|inner| inner.users.contains(&user_id))
    }

    async fn find_movie(&self, id: ContentId) -> Result<Option<ContentMetadata>, LookupError> {
        self.read(|inner| inner.movies.get(&id).cloned())
    }

    async fn find_show(&self, id: ContentId) -> Result<Option<ContentMetadata>, LookupError> {
        self.read(|inner| inner.shows.get(&id).cloned())
    }

    async fn find_episode(&self, id: EpisodeId) -> Result<Option<EpisodeMetadata>, LookupError> {
        self.read(|inner| inner.episodes.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mylist_core::EntityIdType;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "users": ["01900000-0000-7000-8000-000000000001"],
        "movies": [{
            "id": "01900000-0000-7000-8000-00000000000a",
            "title": "Inception",
            "genres": ["Sci-Fi"],
            "posterUrl": "https://img.example/inception.jpg"
        }],
        "shows": [{"id": "01900000-0000-7000-8000-00000000000b", "title": "Dark"}],
        "episodes": [{
            "id": "01900000-0000-7000-8000-00000000000c",
            "showId": "01900000-0000-7000-8000-00000000000b",
            "title": "Secrets",
            "season": 1,
            "number": 1
        }]
    }"#;

    #[tokio::test]
    async fn test_from_json() {
        let catalog = InMemoryCatalog::from_json(FIXTURE).unwrap();
        let user: UserId = "01900000-0000-7000-8000-000000000001".parse().unwrap();
        let movie: ContentId = "01900000-0000-7000-8000-00000000000a".parse().unwrap();
        let show: ContentId = "01900000-0000-7000-8000-00000000000b".parse().unwrap();
        let episode: EpisodeId = "01900000-0000-7000-8000-00000000000c".parse().unwrap();

        assert!(catalog.user_exists(user).await.unwrap());
        let inception = catalog.find_movie(movie).await.unwrap().unwrap();
        assert_eq!(inception.title, "Inception");
        assert_eq!(
            inception.poster_url.as_deref(),
            Some("https://img.example/inception.jpg")
        );
        assert!(catalog.find_movie(show).await.unwrap().is_none());
        assert_eq!(
            catalog.find_episode(episode).await.unwrap().unwrap().show_id,
            show
        );
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let catalog = InMemoryCatalog::load(file.path()).unwrap();
        let show: ContentId = "01900000-0000-7000-8000-00000000000b".parse().unwrap();
        assert!(catalog.find_show(show).await.unwrap().is_some());
    }

    #[test]
    fn test_malformed_fixture() {
        assert!(matches!(
            InMemoryCatalog::from_json("{\"users\": [\"nope\"]}"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_builder_methods() {
        let catalog = InMemoryCatalog::new();
        let user = UserId::now_v7();
        let movie = ContentId::now_v7();
        assert!(!catalog.user_exists(user).await.unwrap());

        catalog.add_user(user);
        catalog.add_movie(
            movie,
            ContentMetadata {
                title: "Heat".to_string(),
                poster_url: None,
                genres: vec![],
                description: None,
            },
        );
        assert!(catalog.user_exists(user).await.unwrap());
        assert!(catalog.rename_movie(movie, "Heat (1995)"));
        assert_eq!(
            catalog.find_movie(movie).await.unwrap().unwrap().title,
            "Heat (1995)"
        );
    }
}
