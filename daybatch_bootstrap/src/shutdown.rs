// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Propagates shutdown intent across the run. A [`CancellationToken`] is a
//! cheap cloneable handle the stage engines race against their own work;
//! the [`ShutdownCoordinator`] owns the root token, wires process signals
//! into it, and enforces a grace period when waiting for workers to wind
//! down.
//!
//! Signals (SIGINT, SIGTERM) cancel the token; the extract engine observes
//! the cancellation, asks its in-flight extractors to stop, runs their
//! `cleanup`, and surfaces a `Cancelled` stage error. The process lock is
//! released by `Drop` on the way out regardless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Default grace period for graceful shutdown
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Cancellation token for signaling shutdown.
///
/// Lightweight clone-able token that can be passed to async tasks.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    /// Create a new, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token, waking all waiters
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Check if cancelled (non-blocking)
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for cancellation (async). Returns immediately if already
    /// cancelled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            // Register the waiter before re-checking, so a cancel between
            // the check and the await cannot be missed.
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Coordinates shutdown across application components.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
        }
    }

    /// Clone the root token for worker tasks
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Initiate shutdown: cancel the root token
    pub fn initiate_shutdown(&self) {
        self.token.cancel();
    }

    /// Spawns the signal listener task: SIGINT and SIGTERM cancel the
    /// root token. Returns the join handle so the caller may abort the
    /// listener once the run ends normally.
    pub fn install_signal_handlers(&self) -> tokio::task::JoinHandle<()> {
        let token = self.token();
        tokio::spawn(async move {
            let interrupted = wait_for_termination_signal().await;
            if interrupted {
                tracing::warn!(category = "lifecycle", event = "signal_received", "shutdown signal received, cancelling run");
                token.cancel();
            }
        })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

/// Waits for SIGINT or SIGTERM; resolves true when one arrived.
#[cfg(unix)]
async fn wait_for_termination_signal() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            tracing::error!(category = "lifecycle", event = "signal_install_failed", error_details = %err, "cannot install SIGTERM handler");
            return false;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.is_ok(),
        _ = sigterm.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() -> bool {
    tokio::signal::ctrl_c().await.is_ok()
}
