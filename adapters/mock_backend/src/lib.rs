#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mock authoritative backend for Colony Wars.
//!
//! A [`MockBackend`] owns one [`colony_wars_simulation::Simulation`] on behalf
//! of a single identity. Every call and tick is followed by a save through the
//! [`Persistence`] adapter and a publish of the touched tables on the
//! [`EventBus`]. Several backends sharing one [`Storage`] see each other's
//! colonies only after reloading, and never see each other's private rows.

use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use colony_wars_core::{Rejection, Timestamp};

mod backend;
mod bus;
mod config;
mod persistence;
mod storage;

pub use backend::{Backend, MockBackend, INITIAL_TABLES};
pub use bus::{EventBus, Listener, TableSnapshot};
pub use config::{generate_identity, BackendConfig, DEFAULT_STORAGE_KEY, IDENTITY_KEY};
pub use persistence::Persistence;
pub use storage::{FileStorage, MemoryStorage, Storage};

/// Failures reading or writing persisted state.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A storage file could not be read or written.
    #[error("storage I/O failed for {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The world could not be encoded.
    #[error("state encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    /// Another holder of the storage panicked mid-write.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Failures of a named backend call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The backend has not been connected yet.
    #[error("backend is not connected")]
    NotConnected,
    /// The method is unknown or its arguments do not match it.
    #[error("cannot decode call `{method}`: {source}")]
    Decode {
        /// Requested method name.
        method: String,
        /// Decoding failure.
        source: serde_json::Error,
    },
    /// The world refused the command.
    #[error("command rejected: {0}")]
    Rejected(Rejection),
    /// The command ran but its result could not be saved.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn wall_clock() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    Timestamp::from_millis(millis)
}
