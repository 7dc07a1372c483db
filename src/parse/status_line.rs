/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use atoi::FromRadix10;
use http::Version;

use super::LineParseError;

pub struct StatusLine<'a> {
    pub version: Version,
    pub code: u16,
    pub reason: &'a str,
}

impl<'a> StatusLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<StatusLine<'a>, LineParseError> {
        const MINIMAL_LENGTH: usize = 13; // HTTP/1.x XYZ\n

        if buf.len() < MINIMAL_LENGTH {
            return Err(LineParseError::NotLongEnough);
        }

        let Some(p) = memchr::memchr(b' ', buf) else {
            return Err(LineParseError::NoDelimiterFound(' '));
        };
        let version = match &buf[0..p] {
            b"HTTP/1.0" => Version::HTTP_10,
            b"HTTP/1.1" => Version::HTTP_11,
            _ => return Err(LineParseError::InvalidVersion),
        };

        let left = &buf[p + 1..];
        let (code, len) = u16::from_radix_10(left);
        if len < 3 {
            return Err(LineParseError::InvalidStatusCode);
        }

        if left.len() < len + 1 {
            return Err(LineParseError::NotLongEnough);
        }
        let reason = std::str::from_utf8(&left[len + 1..])?.trim();

        Ok(StatusLine {
            version,
            code,
            reason,
        })
    }
}
