//! Adapter connection state tracking.
//!
//! Every adapter owns one [`ConnectionTracker`]. It moves from `Disconnected` to
//! `Connected` on the first successful request and to `Faulted` on a
//! connection-level failure. `Faulted` is terminal.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info};

use crate::errors::{Result, SearchIndexError};
use crate::types::ConnectionState;

const DISCONNECTED: u8 = 0;
const CONNECTED: u8 = 1;
const FAULTED: u8 = 2;

/// Connection state machine plus the administrative lock shared by an adapter's
/// operations.
///
/// Regular operations hold the lock shared; `optimize` holds it exclusively so
/// that it runs alone on the adapter.
#[derive(Debug)]
pub struct ConnectionTracker {
    engine: &'static str,
    state: AtomicU8,
    admin_lock: RwLock<()>,
}

impl ConnectionTracker {
    pub fn new(engine: &'static str) -> Self {
        Self {
            engine,
            state: AtomicU8::new(DISCONNECTED),
            admin_lock: RwLock::new(()),
        }
    }

    /// Tracker for a backend that needs no connection, starting `Connected`.
    pub fn connectionless(engine: &'static str) -> Self {
        Self {
            engine,
            state: AtomicU8::new(CONNECTED),
            admin_lock: RwLock::new(()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::SeqCst) {
            CONNECTED => ConnectionState::Connected,
            FAULTED => ConnectionState::Faulted,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Fail fast with `ConnectionError` once the adapter is faulted.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.state() == ConnectionState::Faulted {
            return Err(SearchIndexError::connection(format!(
                "{} adapter is faulted; reconstruct the search index to reconnect",
                self.engine
            )));
        }
        Ok(())
    }

    /// Record a successful round trip.
    pub fn mark_connected(&self) {
        if self
            .state
            .compare_exchange(DISCONNECTED, CONNECTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!(engine = self.engine, "Search backend connected");
        }
    }

    /// Record a connection-level failure. Terminal.
    pub fn mark_faulted(&self, reason: &str) {
        let previous = self.state.swap(FAULTED, Ordering::SeqCst);
        if previous != FAULTED {
            error!(engine = self.engine, reason = %reason, "Search backend faulted");
        }
    }

    /// Update the state from the outcome of a request and pass the outcome on.
    ///
    /// Connection errors fault the adapter; transient and caller errors leave the
    /// state unchanged.
    pub fn observe<T>(&self, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Ok(_) => self.mark_connected(),
            Err(SearchIndexError::ConnectionError(reason)) => self.mark_faulted(reason),
            Err(_) => {}
        }
        outcome
    }

    /// Shared access for a regular operation.
    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.admin_lock.read().await
    }

    /// Exclusive access for an administrative operation.
    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.admin_lock.write().await
    }
}
