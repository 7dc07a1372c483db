/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

mod error;
pub use error::LineParseError;

mod status_line;
pub use status_line::StatusLine;
