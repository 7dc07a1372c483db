/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

//! Heuristic charset detection used when a text response declares no
//! usable charset. Pluggable so callers can swap the detector.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// A detector's best guess plus a confidence score in `0.0..=1.0`.
#[derive(Debug, Clone, Copy)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,
    pub confidence: f32,
}

/// One-shot detection over a whole buffer, or incremental detection via
/// a [`CharsetFeeder`] for bodies too large to scan in one pass.
pub trait CharsetDetect: Send + Sync {
    fn detect(&self, buf: &[u8]) -> Option<DetectedEncoding>;

    fn feeder(&self) -> Box<dyn CharsetFeeder>;
}

/// Incremental detection: feed windows of data until a confident guess
/// appears, then stop early.
pub trait CharsetFeeder: Send {
    /// Feed one window. Returns a guess as soon as the detector is
    /// confident, `None` while it still wants more data.
    fn feed(&mut self, chunk: &[u8]) -> Option<DetectedEncoding>;

    /// Signal end of data and return the final guess.
    fn finish(self: Box<Self>) -> Option<DetectedEncoding>;
}

/// The default detector, backed by `chardetng`.
///
/// `chardetng` reports whether its guess outranks a plain-ASCII reading
/// rather than a numeric score; that flag maps to confidence 1.0 or 0.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChardetngDetector;

impl CharsetDetect for ChardetngDetector {
    fn detect(&self, buf: &[u8]) -> Option<DetectedEncoding> {
        let mut detector = EncodingDetector::new();
        detector.feed(buf, true);
        let (encoding, confident) = detector.guess_assess(None, true);
        Some(DetectedEncoding {
            encoding,
            confidence: if confident { 1.0 } else { 0.0 },
        })
    }

    fn feeder(&self) -> Box<dyn CharsetFeeder> {
        Box::new(ChardetngFeeder {
            detector: EncodingDetector::new(),
        })
    }
}

struct ChardetngFeeder {
    detector: EncodingDetector,
}

impl CharsetFeeder for ChardetngFeeder {
    fn feed(&mut self, chunk: &[u8]) -> Option<DetectedEncoding> {
        self.detector.feed(chunk, false);
        let (encoding, confident) = self.detector.guess_assess(None, true);
        confident.then_some(DetectedEncoding {
            encoding,
            confidence: 1.0,
        })
    }

    fn finish(mut self: Box<Self>) -> Option<DetectedEncoding> {
        self.detector.feed(b"", true);
        let (encoding, confident) = self.detector.guess_assess(None, true);
        Some(DetectedEncoding {
            encoding,
            confidence: if confident { 1.0 } else { 0.0 },
        })
    }
}
