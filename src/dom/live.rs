use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::dom::html::HtmlDocument;
use crate::error::FormError;
use crate::form::config::ExtractConfig;
use crate::form::extractor::extract_fields;
use crate::form::field_model::FieldDescriptor;

/// A page whose markup changes over time.
///
/// Every call to [`LiveDocument::update`] bumps the revision and notifies all
/// registered observers. Observers are registered through
/// [`LiveDocument::observe`] and removed when the returned guard drops.
pub struct LiveDocument {
    state: Mutex<LiveState>,
}

struct LiveState {
    source: String,
    revision: u64,
    next_observer: u64,
    observers: Vec<(u64, Sender<u64>)>,
}

/// Registration handle for change notifications on a `LiveDocument`.
pub struct Observer<'a> {
    id: u64,
    doc: &'a LiveDocument,
    rx: Receiver<u64>,
}

impl LiveDocument {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(LiveState {
                source: source.into(),
                revision: 0,
                next_observer: 0,
                observers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the markup and notify observers.
    pub fn update(&self, source: impl Into<String>) {
        let mut state = self.lock();
        state.source = source.into();
        state.revision += 1;
        let revision = state.revision;
        // Receivers that went away without deregistering are pruned here.
        state.observers.retain(|(_, tx)| tx.send(revision).is_ok());
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Current markup.
    pub fn source(&self) -> String {
        self.lock().source.clone()
    }

    /// Parse the current markup into a standalone document.
    pub fn snapshot(&self) -> HtmlDocument {
        HtmlDocument::parse(&self.source())
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    pub fn observe(&self) -> Observer<'_> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.lock();
        let id = state.next_observer;
        state.next_observer += 1;
        state.observers.push((id, tx));
        Observer { id, doc: self, rx }
    }

    /// Block until an element with `identifier` as its `id` or `name` exists,
    /// or `timeout` elapses.
    ///
    /// The observer is registered before the first check so no update between
    /// check and wait is missed. It is released on every return path.
    pub fn wait_for_field(&self, identifier: &str, timeout: Duration) -> Result<(), FormError> {
        let observer = self.observe();
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            if self.snapshot().contains_identifier(identifier) {
                debug!(identifier, waited_ms = started.elapsed().as_millis() as u64, "field appeared");
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match observer.wait(remaining) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        drop(observer);
        Err(FormError::Timeout {
            identifier: identifier.to_string(),
            waited: started.elapsed(),
        })
    }

    /// Wait for `identifier`, then run one extraction pass over the page.
    pub fn extract_when_ready(
        &self,
        identifier: &str,
        timeout: Duration,
        config: &ExtractConfig,
    ) -> Result<Vec<FieldDescriptor>, FormError> {
        self.wait_for_field(identifier, timeout)?;
        let page = self.snapshot();
        extract_fields(&page.tree(), None, config)
    }
}

impl Observer<'_> {
    /// Wait for the next revision, at most `timeout`.
    pub fn wait(&self, timeout: Duration) -> Result<u64, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

impl Drop for Observer<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.doc.lock().observers.retain(|(oid, _)| *oid != id);
    }
}
