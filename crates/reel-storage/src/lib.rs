//! Storage collaborator for movie records.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use reel_types::{movie::Movie, ReelError, Result};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Read side of movie persistence: single lookup and full enumeration.
#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Movie>>;
    /// Lazily enumerate every stored movie. Faults surface as `Err` items.
    fn find_all(&self) -> BoxStream<'static, Result<Movie>>;
}

#[async_trait]
impl<R: MovieRepository + ?Sized> MovieRepository for Arc<R> {
    async fn find_by_id(&self, id: &str) -> Result<Option<Movie>> {
        (**self).find_by_id(id).await
    }

    fn find_all(&self) -> BoxStream<'static, Result<Movie>> {
        (**self).find_all()
    }
}

/// In-process store keyed by movie id. Enumeration yields movies in id order.
#[derive(Clone, Default)]
pub struct InMemoryMovieRepository {
    movies: Arc<RwLock<BTreeMap<String, Movie>>>,
}

impl InMemoryMovieRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movies(movies: impl IntoIterator<Item = Movie>) -> Self {
        let map = movies
            .into_iter()
            .map(|movie| (movie.id.clone(), movie))
            .collect();
        Self {
            movies: Arc::new(RwLock::new(map)),
        }
    }

    /// Load a JSON array of movies. Later entries replace earlier ones with
    /// the same id.
    pub fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            storage_error(format!(
                "unable to read seed file {}: {err}",
                path_ref.display()
            ))
        })?;
        let movies: Vec<Movie> = serde_json::from_str(&contents).map_err(|err| {
            storage_error(format!(
                "failed to parse seed file {}: {err}",
                path_ref.display()
            ))
        })?;
        info!("Loaded {} movies from {:?}", movies.len(), path_ref);
        Ok(Self::with_movies(movies))
    }

    pub async fn insert(&self, movie: Movie) {
        self.movies.write().await.insert(movie.id.clone(), movie);
    }

    pub async fn len(&self) -> usize {
        self.movies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.movies.read().await.is_empty()
    }
}

#[async_trait]
impl MovieRepository for InMemoryMovieRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Movie>> {
        let found = self.movies.read().await.get(id).cloned();
        debug!(id, found = found.is_some(), "movie lookup");
        Ok(found)
    }

    fn find_all(&self) -> BoxStream<'static, Result<Movie>> {
        let movies = Arc::clone(&self.movies);
        async_stream::stream! {
            let snapshot: Vec<Movie> = movies.read().await.values().cloned().collect();
            debug!(count = snapshot.len(), "enumerating movies");
            for movie in snapshot {
                yield Ok::<_, ReelError>(movie);
            }
        }
        .boxed()
    }
}

pub fn storage_error(message: impl Into<String>) -> ReelError {
    ReelError::Storage(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn catalogue() -> Vec<Movie> {
        vec![
            Movie::new("m2", "Nosferatu"),
            Movie::new("m1", "Metropolis"),
            Movie::new("m3", "Sunrise"),
        ]
    }

    #[tokio::test]
    async fn find_by_id_returns_stored_movie() {
        let repo = InMemoryMovieRepository::with_movies(catalogue());
        let movie = repo.find_by_id("m1").await.expect("lookup");
        assert_eq!(movie, Some(Movie::new("m1", "Metropolis")));
    }

    #[tokio::test]
    async fn find_by_id_missing_is_none() {
        let repo = InMemoryMovieRepository::with_movies(catalogue());
        assert_eq!(repo.find_by_id("nope").await.expect("lookup"), None);
        assert_eq!(repo.find_by_id("").await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn find_all_enumerates_in_id_order() {
        let repo = InMemoryMovieRepository::with_movies(catalogue());
        let ids: Vec<String> = repo
            .find_all()
            .map_ok(|movie| movie.id)
            .try_collect()
            .await
            .expect("enumerate");
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn find_all_is_lazy_until_polled() {
        let repo = InMemoryMovieRepository::new();
        let stream = repo.find_all();
        repo.insert(Movie::new("late", "Added after find_all")).await;
        let movies: Vec<Movie> = stream.try_collect().await.expect("enumerate");
        assert_eq!(movies.len(), 1);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn seed_file_round_trip() {
        let path = std::env::temp_dir().join("reel-seed-test.json");
        let doc = serde_json::to_string(&catalogue()).expect("serialize seed");
        fs::write(&path, doc).expect("write seed");

        let repo = InMemoryMovieRepository::from_seed_file(&path).expect("load seed");
        assert_eq!(repo.len().await, 3);
        assert!(!repo.is_empty().await);
        fs::remove_file(&path).expect("cleanup seed");
    }

    #[test]
    fn malformed_seed_file_is_storage_error() {
        let path = std::env::temp_dir().join("reel-seed-malformed.json");
        fs::write(&path, "{ not json").expect("write seed");
        let err = InMemoryMovieRepository::from_seed_file(&path)
            .err()
            .expect("parse failure");
        assert!(matches!(err, ReelError::Storage(_)));
        fs::remove_file(&path).expect("cleanup seed");
    }
}
