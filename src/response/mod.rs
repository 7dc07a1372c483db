/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use bytes::Bytes;
use encoding_rs::Encoding;
use http::{StatusCode, Version};
use serde::de::DeserializeOwned;

use crate::body::BodyType;
use crate::charset::{ChardetngDetector, CharsetDetect};
use crate::header::Headers;
use crate::parse::StatusLine;
use crate::request::{Method, RequestBuilder};

mod error;
pub use error::ResponseParseError;

/// Bodies up to this size are detected in one shot; larger ones are fed
/// to the detector in windows.
const ONE_SHOT_DETECT_MAX: usize = 10 * 1024;
const DETECT_WINDOW: usize = 4 * 1024;

/// The parsed status line and header block of a response, before the
/// body has been read. Framing of the body is derived from here.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
}

impl ResponseHead {
    /// Parse the head block a session isolated: one status line followed
    /// by header lines. The status code must belong to the known set.
    pub fn parse(head: &[u8]) -> Result<Self, ResponseParseError> {
        let (status_line, header_block) = match memchr::memchr(b'\n', head) {
            Some(p) => (&head[..=p], &head[p + 1..]),
            None => (head, &head[head.len()..]),
        };

        let line = StatusLine::parse(status_line)?;
        let status = StatusCode::from_u16(line.code)
            .map_err(|_| ResponseParseError::UnknownStatusCode(line.code))?;
        if status.canonical_reason().is_none() {
            return Err(ResponseParseError::UnknownStatusCode(line.code));
        }

        Ok(ResponseHead {
            version: line.version,
            status,
            reason: line.reason.to_string(),
            headers: Headers::from_bytes(header_block),
        })
    }

    /// Derive the body framing, in priority order: chunked transfer,
    /// then Content-Length, then read-to-close. HEAD responses and
    /// 1xx/204/304 codes carry no body at all.
    pub fn body_type(&self, method: Method) -> Option<BodyType> {
        let code = self.status.as_u16();
        if method == Method::Head || code < 200 || code == 204 || code == 304 {
            return None;
        }

        if let Some(v) = self.headers.get("Transfer-Encoding") {
            let v = v.to_string().to_ascii_lowercase();
            if v.split(',').any(|t| t.trim() == "chunked") {
                return Some(BodyType::Chunked);
            }
        }

        if let Some(v) = self.headers.get("Content-Length") {
            if let Some(n) = v.as_int() {
                return if n > 0 {
                    Some(BodyType::ContentLength(n))
                } else {
                    None
                };
            }
        }

        Some(BodyType::ReadUntilEnd)
    }
}

/// A completed HTTP exchange: status, headers, raw body bytes and the
/// request description (including its redirect chain) that produced it.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct Response {
    request: RequestBuilder,
    head: ResponseHead,
    body: Bytes,
}

impl Response {
    pub(crate) fn new(request: RequestBuilder, head: ResponseHead, body: Bytes) -> Self {
        Response {
            request,
            head,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    pub fn code(&self) -> u16 {
        self.head.status.as_u16()
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn reason(&self) -> &str {
        &self.head.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    /// The request that produced this response, with the redirect chain
    /// it accumulated.
    pub fn request(&self) -> &RequestBuilder {
        &self.request
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Whether this status asks for a redirect (strictly between 300
    /// and 400).
    pub fn is_redirect(&self) -> bool {
        let code = self.head.status.as_u16();
        code > 300 && code < 400
    }

    pub fn content_type(&self) -> Option<String> {
        self.head.headers.get("Content-Type").map(|v| v.to_string())
    }

    /// The charset label declared in Content-Type, lowercased.
    pub fn charset(&self) -> Option<String> {
        let content_type = self.content_type()?;
        for param in content_type.split(';').skip(1) {
            if let Some((key, value)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("charset") {
                    return Some(value.trim().trim_matches('"').to_ascii_lowercase());
                }
            }
        }
        None
    }

    pub fn is_text(&self) -> bool {
        self.content_type()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("text/"))
            .unwrap_or(false)
    }

    /// Decode a `text/*` body to a string using the default detector.
    /// Returns `None` when the body is not text or no decoding could be
    /// trusted; the raw bytes stay available through [`Response::body`].
    pub fn text(&self) -> Option<String> {
        self.text_with(&ChardetngDetector)
    }

    /// Like [`Response::text`] but with a caller-supplied detector.
    ///
    /// The declared charset is tried first; when it is missing, unknown
    /// or decodes with errors, detection runs over the body (one shot
    /// for small bodies, windowed for large ones) and its guess is used
    /// only when the confidence rounds up to accepted.
    pub fn text_with(&self, detector: &dyn CharsetDetect) -> Option<String> {
        if !self.is_text() {
            return None;
        }

        if let Some(label) = self.charset() {
            if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
                let (text, _, malformed) = encoding.decode(&self.body);
                if !malformed {
                    return Some(text.into_owned());
                }
            }
        }

        let detected = if self.body.len() < ONE_SHOT_DETECT_MAX {
            detector.detect(&self.body)
        } else {
            let mut feeder = detector.feeder();
            let mut early = None;
            for window in self.body.chunks(DETECT_WINDOW) {
                if let Some(d) = feeder.feed(window) {
                    early = Some(d);
                    break;
                }
            }
            match early {
                Some(d) => Some(d),
                None => feeder.finish(),
            }
        }?;

        if detected.confidence < 0.5 {
            return None;
        }
        let (text, _, _) = detected.encoding.decode(&self.body);
        Some(text.into_owned())
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
