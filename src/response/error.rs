/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use thiserror::Error;

use crate::parse::LineParseError;

#[derive(Debug, Clone, Error)]
pub enum ResponseParseError {
    #[error("remote closed before a full header block arrived")]
    RemoteClosed,
    #[error("too large header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("invalid status line: {0}")]
    InvalidStatusLine(#[from] LineParseError),
    #[error("unknown status code {0}")]
    UnknownStatusCode(u16),
}
