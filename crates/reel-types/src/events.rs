use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Synthetic live-update record emitted once per tick for a movie id.
///
/// The id is whatever the caller asked for; nothing checks that a movie with
/// that id exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieEvent {
    movie_id: String,
    timestamp: DateTime<Utc>,
}

impl MovieEvent {
    pub fn new(movie_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            movie_id: movie_id.into(),
            timestamp,
        }
    }

    pub fn movie_id(&self) -> &str {
        &self.movie_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
