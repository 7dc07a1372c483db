/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use log::debug;

use crate::request::{Method, RequestBuilder, RequestError};
use crate::session::{HttpSession, SessionConfig};

mod future;
pub use future::AsyncRequest;

/// Dispatches requests as concurrent tasks and tracks their futures.
///
/// Every request issued through a client joins its tracked set;
/// [`Client::collect`] is a join barrier over exactly that set and
/// clears it. On drop, still-outstanding tasks are aborted so nothing
/// outlives the client's scope; aborted futures resolve to a
/// cancellation error.
#[derive(Debug, Default)]
pub struct Client {
    config: SessionConfig,
    tracked: Vec<AsyncRequest>,
}

macro_rules! verb_method {
    ($name:ident, $method:expr) => {
        pub fn $name(&mut self, url: &str) -> Result<AsyncRequest, RequestError> {
            Ok(self.request(RequestBuilder::new(url)?.method($method)))
        }
    };
}

impl Client {
    pub fn new() -> Self {
        Client::default()
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Client {
            config,
            tracked: Vec::new(),
        }
    }

    /// Dispatch a prepared request and track its future.
    pub fn request(&mut self, request: RequestBuilder) -> AsyncRequest {
        let session = HttpSession::new(request, self.config.clone());
        let req = AsyncRequest::spawn(session);
        self.tracked.push(req.clone());
        req
    }

    verb_method!(get, Method::Get);
    verb_method!(post, Method::Post);
    verb_method!(put, Method::Put);
    verb_method!(delete, Method::Delete);
    verb_method!(connect, Method::Connect);
    verb_method!(trace, Method::Trace);
    verb_method!(patch, Method::Patch);
    verb_method!(options, Method::Options);
    verb_method!(head, Method::Head);

    pub fn outstanding(&self) -> usize {
        self.tracked.len()
    }

    /// Block until every tracked future has completed, then clear the
    /// tracked set. A second call with nothing new issued is a no-op.
    pub async fn collect(&mut self) {
        let tracked = std::mem::take(&mut self.tracked);
        if tracked.is_empty() {
            return;
        }
        debug!("collecting {} outstanding requests", tracked.len());
        for req in tracked {
            let _ = req.result().await;
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for req in &self.tracked {
            req.abort();
        }
    }
}

macro_rules! verb_fn {
    ($name:ident, $method:expr) => {
        /// Dispatch a one-shot request with the default configuration.
        /// The returned future is not tracked by any client.
        pub fn $name(url: &str) -> Result<AsyncRequest, RequestError> {
            Ok(send(RequestBuilder::new(url)?.method($method)))
        }
    };
}

/// Dispatch a prepared request outside of any client.
pub fn send(request: RequestBuilder) -> AsyncRequest {
    send_with(request, SessionConfig::default())
}

pub fn send_with(request: RequestBuilder, config: SessionConfig) -> AsyncRequest {
    AsyncRequest::spawn(HttpSession::new(request, config))
}

verb_fn!(get, Method::Get);
verb_fn!(post, Method::Post);
verb_fn!(put, Method::Put);
verb_fn!(delete, Method::Delete);
verb_fn!(connect, Method::Connect);
verb_fn!(trace, Method::Trace);
verb_fn!(patch, Method::Patch);
verb_fn!(options, Method::Options);
verb_fn!(head, Method::Head);
