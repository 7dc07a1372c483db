/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::response::ResponseParseError;
use crate::url::UrlParseError;

/// A failure captured inside a request task and delivered as the
/// resolved value of its future.
///
/// Everything that can go wrong after a task is spawned lands here:
/// network failures, timeouts, protocol violations and cooperative
/// cancellation. It is `Clone` so a future's result can be read any
/// number of times; io errors are held behind `Arc` for that reason.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("dns resolve failed: {0}")]
    ResolveFailed(Arc<io::Error>),
    #[error("connect failed: {0}")]
    ConnectFailed(Arc<io::Error>),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("invalid tls server name {0:?}")]
    InvalidTlsName(String),
    #[error("tls handshake failed: {0}")]
    TlsHandshakeFailed(Arc<io::Error>),
    #[error("write failed: {0}")]
    WriteFailed(Arc<io::Error>),
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),
    #[error("read failed: {0}")]
    ReadFailed(Arc<io::Error>),
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] ResponseParseError),
    #[error("invalid redirect location: {0}")]
    InvalidRedirectLocation(#[from] UrlParseError),
    #[error("task canceled")]
    Canceled,
}

impl TaskError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TaskError::ConnectTimeout(_) | TaskError::ReadTimeout(_)
        )
    }
}
