//! # Connection Bookkeeping
//!
//! The stream manager's mutable state. Owned exclusively by the manager,
//! mutated only under its lock, never persisted - rebuilt from the
//! subscription store and verification registry on restart.

use relay_types::ExternalId;
use std::collections::BTreeSet;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// The live connection, modeled as a tagged variant instead of nullable
/// fields: either there is no connection, or there is one with a known
/// follow-set and a reader task draining it.
pub(crate) enum Connection {
    /// No upstream connection.
    Idle,
    /// A live filter stream.
    Connected {
        /// The follow-set the connection was opened with.
        set: BTreeSet<ExternalId>,
        /// Task consuming the connection's signal stream.
        reader: JoinHandle<()>,
    },
}

pub(crate) struct StreamState {
    pub connection: Connection,
    /// Earliest instant the next reconnect attempt may run; `None` before
    /// the first attempt.
    pub next_attempt: Option<Instant>,
    /// Ticks since the last executed reconnect.
    pub skip_counter: u32,
    /// End of the post-connect window in which "end" signals are ignored.
    pub grace_until: Option<Instant>,
    /// Connection generation; stale reader tasks compare against it before
    /// touching the state.
    pub epoch: u64,
}

impl StreamState {
    pub fn new() -> Self {
        Self {
            connection: Connection::Idle,
            next_attempt: None,
            skip_counter: 0,
            grace_until: None,
            epoch: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected { .. })
    }

    pub fn connected_set(&self) -> Option<&BTreeSet<ExternalId>> {
        match &self.connection {
            Connection::Idle => None,
            Connection::Connected { set, .. } => Some(set),
        }
    }

    /// Abort the reader task (dropping the stream closes the connection)
    /// and return to `Idle`.
    pub fn teardown(&mut self) {
        if let Connection::Connected { reader, .. } =
            std::mem::replace(&mut self.connection, Connection::Idle)
        {
            reader.abort();
        }
    }

    /// Whether `now` is inside the post-connect grace window.
    pub fn in_grace(&self, now: Instant) -> bool {
        self.grace_until.is_some_and(|until| now < until)
    }
}
