//! Debounced, cancelable household search.
//!
//! Every keystroke bumps a shared generation counter and is handed to a
//! single worker thread. The worker waits for the input to go quiet for the
//! debounce window, then runs one request tagged with that generation. Any
//! outcome whose generation is no longer the latest is dropped, so an older
//! query can never overwrite the results of a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{ApiError, Result};
use crate::models::Family;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Cancellation handle for one search request. It trips as soon as a newer
/// keystroke moves the generation counter.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl CancelToken {
    /// A token that never trips, for one-shot searches.
    pub fn never() -> Self {
        Self {
            generation: 0,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.generation
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ApiError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Where the coordinator sends its requests.
pub trait SearchBackend: Send + Sync + 'static {
    fn search(&self, query: &str, cancel: &CancelToken) -> Result<Vec<Family>>;
}

impl<B: SearchBackend + ?Sized> SearchBackend for Arc<B> {
    fn search(&self, query: &str, cancel: &CancelToken) -> Result<Vec<Family>> {
        (**self).search(query, cancel)
    }
}

/// Keystroke sent to the worker thread.
#[derive(Debug, Clone)]
struct SearchQuery {
    generation: u64,
    text: String,
}

/// Outcome sent back by the worker thread.
#[derive(Debug)]
struct SearchOutcome {
    generation: u64,
    text: String,
    result: Result<Vec<Family>>,
    duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Pending { generation: u64, query: String },
    Fulfilled { generation: u64, query: String },
    Failed { generation: u64, query: String, message: String },
}

/// What happened to a single outcome when it reached the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Applied,
    /// A newer keystroke arrived before this outcome was applied.
    Superseded,
    /// The request noticed its own cancellation.
    Aborted,
}

/// A failure on the surviving request, to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchNotice {
    pub query: String,
    pub message: String,
}

pub struct SearchCoordinator {
    query_tx: Sender<SearchQuery>,
    result_rx: Receiver<SearchOutcome>,
    latest: Arc<AtomicU64>,
    state: SearchState,
    results: Vec<Family>,
    last_duration: Duration,
    _worker: JoinHandle<()>,
}

impl SearchCoordinator {
    pub fn new<B: SearchBackend>(backend: B, debounce: Duration) -> Self {
        let (query_tx, query_rx) = mpsc::channel::<SearchQuery>();
        let (result_tx, result_rx) = mpsc::channel::<SearchOutcome>();
        let latest = Arc::new(AtomicU64::new(0));

        let worker = spawn_worker(backend, debounce, latest.clone(), query_rx, result_tx);

        Self {
            query_tx,
            result_rx,
            latest,
            state: SearchState::Idle,
            results: Vec::new(),
            last_duration: Duration::ZERO,
            _worker: worker,
        }
    }

    /// Record a keystroke. Cancels any pending or in-flight request and
    /// returns the new generation.
    pub fn input(&mut self, text: impl Into<String>) -> u64 {
        let text = text.into();
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state = SearchState::Pending {
            generation,
            query: text.clone(),
        };
        let _ = self.query_tx.send(SearchQuery { generation, text });
        generation
    }

    /// Apply outcomes from the worker without blocking. Returns a notice for
    /// each genuine failure of a surviving request.
    pub fn poll(&mut self) -> Vec<SearchNotice> {
        let mut notices = Vec::new();
        while let Ok(outcome) = self.result_rx.try_recv() {
            if let (Fate::Applied, Some(notice)) = self.apply(outcome) {
                notices.push(notice);
            }
        }
        notices
    }

    /// Block until the latest generation has settled or `timeout` elapses.
    /// The flag is false if the deadline passed first.
    pub fn wait_settled(&mut self, timeout: Duration) -> (bool, Vec<SearchNotice>) {
        let deadline = Instant::now() + timeout;
        let mut notices = Vec::new();
        while self.is_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return (false, notices);
            }
            match self.result_rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    if let (Fate::Applied, Some(notice)) = self.apply(outcome) {
                        notices.push(notice);
                    }
                }
                Err(_) => return (false, notices),
            }
        }
        (true, notices)
    }

    fn apply(&mut self, outcome: SearchOutcome) -> (Fate, Option<SearchNotice>) {
        let current = self.latest.load(Ordering::SeqCst);
        if outcome.generation != current {
            log::debug!(
                "Dropping superseded search #{} ({:?})",
                outcome.generation,
                outcome.text
            );
            return (Fate::Superseded, None);
        }

        match outcome.result {
            Ok(results) => {
                log::debug!(
                    "Search #{} ({:?}) returned {} result(s) in {:?}",
                    outcome.generation,
                    outcome.text,
                    results.len(),
                    outcome.duration
                );
                self.results = results;
                self.last_duration = outcome.duration;
                self.state = SearchState::Fulfilled {
                    generation: outcome.generation,
                    query: outcome.text,
                };
                (Fate::Applied, None)
            }
            Err(ApiError::Cancelled) => (Fate::Aborted, None),
            Err(e) => {
                let message = e.to_string();
                log::warn!("Search for {:?} failed: {message}", outcome.text);
                self.results.clear();
                self.last_duration = outcome.duration;
                self.state = SearchState::Failed {
                    generation: outcome.generation,
                    query: outcome.text.clone(),
                    message: message.clone(),
                };
                (
                    Fate::Applied,
                    Some(SearchNotice {
                        query: outcome.text,
                        message,
                    }),
                )
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SearchState::Pending { .. })
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Results of the most recent applied query.
    pub fn results(&self) -> &[Family] {
        &self.results
    }

    pub fn last_duration(&self) -> Duration {
        self.last_duration
    }

    pub fn generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

fn spawn_worker<B: SearchBackend>(
    backend: B,
    debounce: Duration,
    latest: Arc<AtomicU64>,
    query_rx: Receiver<SearchQuery>,
    result_tx: Sender<SearchOutcome>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(mut query) = query_rx.recv() {
            // Wait for the input to go quiet; every keystroke restarts the window
            loop {
                match query_rx.recv_timeout(debounce) {
                    Ok(next) => query = next,
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }

            let cancel = CancelToken {
                generation: query.generation,
                latest: latest.clone(),
            };
            // A keystroke may have landed between the timeout and now
            if cancel.is_cancelled() {
                continue;
            }

            let start = Instant::now();
            let result = backend
                .search(&query.text, &cancel)
                .and_then(|results| cancel.check().map(|_| results));

            let outcome = SearchOutcome {
                generation: query.generation,
                text: query.text,
                result,
                duration: start.elapsed(),
            };
            if result_tx.send(outcome).is_err() {
                return;
            }
        }
    })
}
