//! Test doubles for consumer connections
//!
//! `MockConnection` records every delivered payload and how many times it
//! was closed, without any socket behind it.

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::fanout::ConsumerConnection;
use crate::ws::TransportError;

/// Observable state shared between a mock connection and the test
#[derive(Default)]
pub struct MockState {
    delivered: Mutex<Vec<String>>,
    closed: AtomicUsize,
    broken: bool,
}

impl MockState {
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory consumer connection
pub struct MockConnection {
    state: Arc<MockState>,
}

impl MockConnection {
    /// A healthy connection
    pub fn new() -> (Self, Arc<MockState>) {
        Self::with_state(MockState::default())
    }

    /// A connection whose every delivery fails
    pub fn broken() -> (Self, Arc<MockState>) {
        Self::with_state(MockState {
            broken: true,
            ..MockState::default()
        })
    }

    fn with_state(state: MockState) -> (Self, Arc<MockState>) {
        let state = Arc::new(state);
        (Self { state: state.clone() }, state)
    }
}

impl ConsumerConnection for MockConnection {
    fn deliver(&self, payload: &Arc<str>) -> Result<(), TransportError> {
        if self.state.broken {
            return Err(TransportError::Closed);
        }
        self.state.delivered.lock().push(payload.to_string());
        Ok(())
    }

    fn deliver_when_ready(&self, payload: Arc<str>) -> BoxFuture<'static, Result<(), TransportError>> {
        futures_util::future::ready(self.deliver(&payload)).boxed()
    }

    fn close(self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}
