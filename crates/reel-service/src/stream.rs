use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::{ready, Context, Poll},
    time::Duration,
};

use futures::{Stream, StreamExt};
use reel_types::{clock::Clock, config::StreamConfig, events::MovieEvent};
use tokio::{
    sync::mpsc,
    time::{sleep_until, Instant, Sleep},
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Infinite, paced sequence of [`MovieEvent`]s for one movie id.
///
/// Backed by its own generator task. Dropping the stream or calling
/// [`EventStream::cancel`] stops the task and releases its timer.
///
/// Two deliveries are always at least one pace apart, also when the channel
/// holds several buffered events for a slow reader.
pub struct EventStream {
    movie_id: String,
    inner: ReceiverStream<MovieEvent>,
    token: CancellationToken,
    pace: Duration,
    gate: Option<Pin<Box<Sleep>>>,
}

impl EventStream {
    pub fn movie_id(&self) -> &str {
        &self.movie_id
    }

    /// Stop the generator. Nothing is yielded after this, even if an event
    /// was already buffered.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Stream for EventStream {
    type Item = MovieEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.token.is_cancelled() {
            return Poll::Ready(None);
        }
        if let Some(gate) = this.gate.as_mut() {
            ready!(gate.as_mut().poll(cx));
        }

        let next = ready!(this.inner.poll_next_unpin(cx));
        if next.is_some() {
            let deadline = Instant::now() + this.pace;
            match this.gate.as_mut() {
                Some(gate) => gate.as_mut().reset(deadline),
                None => this.gate = Some(Box::pin(sleep_until(deadline))),
            }
        }
        Poll::Ready(next)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Keeps the live-generator gauge in step with task lifetime, including
/// runtime shutdown and panics inside the task.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Start a generator task for `movie_id` on the current tokio runtime.
///
/// Each round waits for room in the channel, produces one event stamped with
/// `clock.now()`, holds it until `config.pace()` has elapsed, then hands it
/// over. With the default buffer of one, room only opens once the consumer
/// has taken the previous event, so deliveries never bunch up behind a slow
/// reader.
pub(crate) fn spawn_generator(
    movie_id: &str,
    clock: Arc<dyn Clock>,
    config: &StreamConfig,
    active: Arc<AtomicUsize>,
) -> EventStream {
    let (tx, rx) = mpsc::channel(config.buffer.max(1));
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let pace = config.pace();
    let pace_ms = config.pace_ms;
    let id = movie_id.to_owned();
    let guard = ActiveGuard::enter(active);

    tokio::spawn(async move {
        let _guard = guard;
        info!(movie_id = %id, pace_ms, "event stream started");
        let mut emitted: u64 = 0;

        loop {
            let permit = tokio::select! {
                biased;
                _ = cancelled.cancelled() => break,
                permit = tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let event = MovieEvent::new(id.clone(), clock.now());
            let deadline = Instant::now() + pace;

            tokio::select! {
                biased;
                _ = cancelled.cancelled() => break,
                _ = sleep_until(deadline) => {}
            }

            permit.send(event);
            emitted += 1;
            debug!(movie_id = %id, emitted, "event delivered");
        }

        info!(movie_id = %id, emitted, "event stream terminated");
    });

    EventStream {
        movie_id: movie_id.to_owned(),
        inner: ReceiverStream::new(rx),
        token,
        pace,
        gate: None,
    }
}
