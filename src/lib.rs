/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

//! An async HTTP/1.1 client built directly on raw sockets.
//!
//! `volley` parses URLs, renders request bytes, drives the wire exchange
//! itself (TLS, chunked transfer decoding, redirect following) and
//! dispatches every request as an independent tokio task, so many
//! requests can be in flight concurrently and joined later.
//!
//! The connection is always closed after one logical exchange; there is
//! no pooling, no HTTP/2 and no cookie handling.
//!
//! ```no_run
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut client = volley::Client::new();
//! let first = client.get("http://example.com/").unwrap();
//! let second = client.get("http://example.org/").unwrap();
//! client.collect().await;
//!
//! match first.result().await {
//!     Ok(rsp) => println!("{}: {} body bytes", rsp.code(), rsp.body().len()),
//!     Err(e) => eprintln!("request failed: {e}"),
//! }
//! # let _ = second;
//! # }
//! ```

mod error;
pub use error::TaskError;

pub mod charset;

mod parse;
pub use parse::{LineParseError, StatusLine};

mod url;
pub use url::{Scheme, Url, UrlParseError};

mod header;
pub use header::{HeaderValue, Headers};

mod request;
pub use request::{Method, Redirect, RequestBuilder, RequestError};

mod body;
pub use body::BodyType;

mod response;
pub use response::{Response, ResponseHead, ResponseParseError};

mod session;
pub use session::{HttpSession, SessionConfig, SessionState};

mod client;
pub use client::{AsyncRequest, Client, send, send_with};
pub use client::{connect, delete, get, head, options, patch, post, put, trace};
