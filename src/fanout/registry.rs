//! Consumer connection registry
//!
//! Handles are issued from a monotonic counter under the same lock that
//! guards the map, so they are strictly increasing for the process lifetime.
//! The fan-out pass walks the map under that lock and applies removals only
//! after every entry has been visited.

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ws::TransportError;

/// Registry key of one consumer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outbound side of a consumer connection as seen by the registry
///
/// `deliver` is called with the registry lock held and must not block.
pub trait ConsumerConnection: Send + Sync {
    /// Hand one encoded payload to the connection
    ///
    /// `TransportError::Backlogged` means the connection is alive but behind;
    /// the caller should retry through `deliver_when_ready`.
    fn deliver(&self, payload: &Arc<str>) -> Result<(), TransportError>;

    /// Deliver once the connection has room
    ///
    /// The returned future owns what it needs, so it can be awaited after the
    /// registry lock is released.
    fn deliver_when_ready(&self, payload: Arc<str>) -> BoxFuture<'static, Result<(), TransportError>>;

    /// Release the underlying transport
    ///
    /// Takes ownership, so a connection is closed at most once.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// What the visitor wants done with an entry after the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Remove,
}

struct Inner<C> {
    connections: HashMap<Handle, C>,
    counter: u64,
}

/// Lock-guarded map of handle to consumer connection
pub struct ConnectionRegistry<C> {
    inner: Mutex<Inner<C>>,
}

impl<C: ConsumerConnection> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                connections: HashMap::new(),
                counter: 0,
            }),
        }
    }

    /// Add a connection and return its handle
    pub fn register(&self, conn: C) -> Handle {
        let mut inner = self.inner.lock();
        inner.counter += 1;
        let handle = Handle(inner.counter);
        inner.connections.insert(handle, conn);
        crate::log_consumer!(tracing::Level::INFO, %handle, "Opened consumer connection");
        handle
    }

    /// Close and remove a connection
    ///
    /// Returns `false` if the handle is unknown, which is not an error.
    pub fn unregister(&self, handle: Handle) -> bool {
        let removed = self.inner.lock().connections.remove(&handle);
        match removed {
            Some(conn) => {
                conn.close();
                crate::log_consumer!(tracing::Level::INFO, %handle, "Removed consumer connection");
                true
            }
            None => false,
        }
    }

    /// Visit every entry under the lock
    ///
    /// Entries the visitor marks `Verdict::Remove` are closed and removed
    /// after the full pass, still under the lock. Returns the removed
    /// handles.
    pub fn for_each<F>(&self, mut visit: F) -> Vec<Handle>
    where
        F: FnMut(Handle, &C) -> Verdict,
    {
        let mut inner = self.inner.lock();

        let marked: Vec<Handle> = inner
            .connections
            .iter()
            .filter_map(|(handle, conn)| match visit(*handle, conn) {
                Verdict::Keep => None,
                Verdict::Remove => Some(*handle),
            })
            .collect();

        for handle in &marked {
            if let Some(conn) = inner.connections.remove(handle) {
                conn.close();
            }
        }
        marked
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.inner.lock().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of current handles in ascending order
    #[cfg(test)]
    pub(crate) fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.inner.lock().connections.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.inner.lock().connections.contains_key(&handle)
    }
}

impl<C: ConsumerConnection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
