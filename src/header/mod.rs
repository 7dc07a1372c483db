/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use std::fmt;
use std::io::Write;

/// A header value, kept as either a string or an integer until
/// serialization stringifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Str(String),
    Int(u64),
}

impl HeaderValue {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            HeaderValue::Int(n) => Some(*n),
            HeaderValue::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Str(s) => f.write_str(s),
            HeaderValue::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Str(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Str(v)
    }
}

impl From<u64> for HeaderValue {
    fn from(v: u64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<usize> for HeaderValue {
    fn from(v: usize) -> Self {
        HeaderValue::Int(v as u64)
    }
}

/// An ordered header collection.
///
/// Insertion order is preserved for serialization. Name lookup is
/// ASCII-case-insensitive, matching the wire protocol's field-name rule.
/// Multiple wire lines with the same name merge into one comma-joined
/// value, so the collection never holds duplicate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    /// Parse a CRLF-separated header block. Anything at or after the
    /// `\r\n\r\n` terminator is ignored, as are lines without a colon.
    pub fn from_bytes(block: &[u8]) -> Self {
        let block = match memchr::memmem::find(block, b"\r\n\r\n") {
            Some(p) => &block[..p],
            None => block,
        };

        let mut headers = Headers::new();
        for line in block.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let Ok(line) = std::str::from_utf8(line) else {
                continue;
            };
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            headers.add_wire_value(name.trim(), value.trim());
        }
        headers
    }

    fn add_wire_value(&mut self, name: &str, value: &str) {
        if let Some(i) = self.position_of(name) {
            // multiple message-header fields, RFC 9110 section 5.2
            let merged = format!("{},{}", self.entries[i].1, value);
            self.entries[i].1 = HeaderValue::Str(merged);
            return;
        }
        let value = if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            match value.parse::<u64>() {
                Ok(n) => HeaderValue::Int(n),
                Err(_) => HeaderValue::Str(value.to_string()),
            }
        } else {
            HeaderValue::Str(value.to_string())
        };
        self.entries.push((name.to_string(), value));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::<u8>::with_capacity(self.entries.len() * 32 + 2);
        for (name, value) in &self.entries {
            let _ = write!(buf, "{name}: {value}\r\n");
        }
        buf.extend_from_slice(b"\r\n");
        buf
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position_of(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.position_of(name).map(|i| &self.entries[i].1)
    }

    pub fn get_or(&self, name: &str, default: &str) -> String {
        match self.get(name) {
            Some(v) => v.to_string(),
            None => default.to_string(),
        }
    }

    /// Insert or replace. An existing entry keeps its position.
    pub fn set<V: Into<HeaderValue>>(&mut self, name: &str, value: V) {
        match self.position_of(name) {
            Some(i) => self.entries[i].1 = value.into(),
            None => self.entries.push((name.to_string(), value.into())),
        }
    }

    /// Insert only when no entry with this name exists, so a
    /// caller-supplied header is never clobbered.
    pub fn set_if_absent<V: Into<HeaderValue>>(&mut self, name: &str, value: V) {
        if !self.contains(name) {
            self.entries.push((name.to_string(), value.into()));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.position_of(name).map(|i| self.entries.remove(i).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<N: Into<String>, V: Into<HeaderValue>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (n, v) in iter {
            headers.set(&n.into(), v);
        }
        headers
    }
}
