//! Movie query and event service.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use futures::stream::BoxStream;
use reel_storage::MovieRepository;
use reel_types::{
    clock::{Clock, SystemClock},
    config::StreamConfig,
    movie::Movie,
    Result,
};
use tracing::debug;

mod stream;

pub use stream::EventStream;

#[async_trait]
pub trait MovieService: Send + Sync {
    async fn get_movie_by_id(&self, id: &str) -> Result<Option<Movie>>;
    fn get_all_movies(&self) -> BoxStream<'static, Result<Movie>>;
    /// Open a fresh, infinite event stream for `movie_id`. The id is not
    /// checked against storage.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, since the generator is
    /// spawned onto the current one.
    fn events(&self, movie_id: &str) -> EventStream;
}

/// Service backed by a [`MovieRepository`]. Lookups pass straight through;
/// event streams are generated locally on the tokio runtime.
pub struct MovieServiceImpl<R>
where
    R: MovieRepository,
{
    repository: R,
    clock: Arc<dyn Clock>,
    stream: StreamConfig,
    active: Arc<AtomicUsize>,
}

impl<R> MovieServiceImpl<R>
where
    R: MovieRepository,
{
    pub fn new(repository: R) -> Self {
        Self::with_config(repository, StreamConfig::default())
    }

    pub fn with_config(repository: R, stream: StreamConfig) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
            stream,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of generator tasks currently alive.
    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

#[async_trait]
impl<R> MovieService for MovieServiceImpl<R>
where
    R: MovieRepository,
{
    async fn get_movie_by_id(&self, id: &str) -> Result<Option<Movie>> {
        self.repository.find_by_id(id).await
    }

    fn get_all_movies(&self) -> BoxStream<'static, Result<Movie>> {
        self.repository.find_all()
    }

    fn events(&self, movie_id: &str) -> EventStream {
        debug!(movie_id, "opening event stream");
        stream::spawn_generator(
            movie_id,
            Arc::clone(&self.clock),
            &self.stream,
            Arc::clone(&self.active),
        )
    }
}
