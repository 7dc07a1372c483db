/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::error::TaskError;
use crate::response::Response;
use crate::session::HttpSession;

struct ResultSlot {
    result: OnceLock<Result<Response, TaskError>>,
    done: watch::Sender<bool>,
}

/// Resolves the slot exactly once, even when the task future is dropped
/// mid-flight: an abort lands here as a cancellation error.
struct ResolveGuard {
    slot: Arc<ResultSlot>,
}

impl ResolveGuard {
    fn resolve(self, result: Result<Response, TaskError>) {
        let _ = self.slot.result.set(result);
        // Drop publishes completion
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        let _ = self.slot.result.set(Err(TaskError::Canceled));
        let _ = self.slot.done.send(true);
    }
}

/// A handle to one concurrently executing request.
///
/// The underlying task resolves the result exactly once; the result can
/// be read any number of times afterwards. Dropping the handle does not
/// cancel the task.
#[derive(Clone)]
pub struct AsyncRequest {
    slot: Arc<ResultSlot>,
    done_rx: watch::Receiver<bool>,
    abort: AbortHandle,
}

impl AsyncRequest {
    /// Launch a session as an independently scheduled task.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(session: HttpSession) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        let slot = Arc::new(ResultSlot {
            result: OnceLock::new(),
            done: done_tx,
        });

        let guard = ResolveGuard { slot: slot.clone() };
        let handle = tokio::spawn(async move {
            let mut session = session;
            let result = session.perform().await;
            guard.resolve(result);
        });

        AsyncRequest {
            slot,
            done_rx,
            abort: handle.abort_handle(),
        }
    }

    /// Non-blocking readiness check.
    pub fn is_done(&self) -> bool {
        self.slot.result.get().is_some()
    }

    /// Suspend until the task completes, then return its resolved value.
    /// Never panics on a failed request; the error comes back as a value
    /// (use `?` to re-raise it instead).
    pub async fn result(&self) -> Result<Response, TaskError> {
        let mut done_rx = self.done_rx.clone();
        let _ = done_rx.wait_for(|done| *done).await;
        match self.slot.result.get() {
            Some(result) => result.clone(),
            None => Err(TaskError::Canceled),
        }
    }

    /// Register a callback fired exactly once with the resolved value.
    /// When the task has already completed, it fires right away.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&Result<Response, TaskError>) + Send + 'static,
    {
        let slot = self.slot.clone();
        let mut done_rx = self.done_rx.clone();
        tokio::spawn(async move {
            let _ = done_rx.wait_for(|done| *done).await;
            if let Some(result) = slot.result.get() {
                callback(result);
            }
        });
    }

    /// Cooperatively cancel the task. The future resolves to a
    /// cancellation error, the same way a network failure would land.
    pub fn abort(&self) {
        self.abort.abort();
    }
}

impl std::fmt::Debug for AsyncRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRequest")
            .field("done", &self.is_done())
            .finish()
    }
}
