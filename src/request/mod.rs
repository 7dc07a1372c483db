/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::header::Headers;
use crate::url::{Url, UrlParseError};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] UrlParseError),
    #[error("invalid http method {0:?}")]
    InvalidMethod(String),
    #[error("failed to encode json body: {0}")]
    JsonEncode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Connect,
    Trace,
    Patch,
    Options,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        }
    }
}

impl FromStr for Method {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "TRACE" => Ok(Method::Trace),
            "PATCH" => Ok(Method::Patch),
            "OPTIONS" => Ok(Method::Options),
            "HEAD" => Ok(Method::Head),
            _ => Err(RequestError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One followed redirect within a logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub source: Url,
    pub destination: Url,
    pub code: StatusCode,
}

/// Composes method, URL, headers and body into the wire bytes of one
/// request attempt, and records the redirects followed so far.
///
/// The redirect chain is append-only: its length bounds how many more
/// redirects a session may follow for this logical request.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    headers: Headers,
    body: Bytes,
    version: String,
    redirect_chain: Vec<Redirect>,
}

impl RequestBuilder {
    pub fn new(url: &str) -> Result<Self, RequestError> {
        Ok(Self::from_url(Url::parse(url)?))
    }

    pub fn from_url(url: Url) -> Self {
        RequestBuilder {
            method: Method::Get,
            url,
            headers: Headers::new(),
            body: Bytes::new(),
            version: "1.1".to_string(),
            redirect_chain: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header<V: Into<crate::header::HeaderValue>>(mut self, name: &str, value: V) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body. A non-empty body derives `Content-Length`;
    /// an empty one removes any existing `Content-Length`.
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.set_body(body.into());
        self
    }

    /// JSON-encode a value as the body and default the Content-Type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, RequestError> {
        let encoded = serde_json::to_vec(value)?;
        self.set_body(Bytes::from(encoded));
        self.headers
            .set_if_absent("Content-Type", "application/json; charset=UTF-8");
        Ok(self)
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    fn set_body(&mut self, body: Bytes) {
        self.body = body;
        if self.body.is_empty() {
            self.headers.remove("Content-Length");
        } else {
            self.headers.set("Content-Length", self.body.len());
        }
    }

    pub fn append_body(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let mut body = Vec::with_capacity(self.body.len() + chunk.len());
        body.extend_from_slice(&self.body);
        body.extend_from_slice(chunk);
        self.set_body(Bytes::from(body));
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn get_method(&self) -> Method {
        self.method
    }

    pub fn get_headers(&self) -> &Headers {
        &self.headers
    }

    pub fn get_body(&self) -> &Bytes {
        &self.body
    }

    pub fn redirect_chain(&self) -> &[Redirect] {
        &self.redirect_chain
    }

    /// Move this request to a redirect target and record the hop.
    ///
    /// A location starting with `/` is an absolute path on the current
    /// host; anything else is reparsed as a full URL.
    pub fn redirect_to(&mut self, code: StatusCode, location: &str) -> Result<(), UrlParseError> {
        let source = self.url.clone();
        if location.starts_with('/') {
            let (mut path, mut query) = match location.split_once('?') {
                Some((p, q)) => (p.to_string(), q.to_string()),
                None => (location.to_string(), String::new()),
            };
            // The fragment follows whichever of path/query currently holds it
            let mut fragment = String::new();
            if let Some((q, f)) = query.split_once('#') {
                fragment = f.to_string();
                query = q.to_string();
            } else if let Some((p, f)) = path.split_once('#') {
                fragment = f.to_string();
                path = p.to_string();
            }
            self.url.set_path(&path);
            self.url.set_query(&query);
            self.url.set_fragment(&fragment);
        } else {
            self.url = Url::parse(location)?;
        }
        self.redirect_chain.push(Redirect {
            source,
            destination: self.url.clone(),
            code,
        });
        Ok(())
    }

    /// Render the wire bytes of this request. A missing `Host` is
    /// injected from the URL and `Connection: close` is defaulted.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut headers = self.headers.clone();
        headers.set_if_absent("Host", self.url.host_header());
        headers.set_if_absent("Connection", "close");

        let mut buf = Vec::<u8>::with_capacity(256 + self.body.len());
        let _ = write!(
            buf,
            "{} {} HTTP/{}\r\n",
            self.method,
            self.url.request_target(),
            self.version
        );
        buf.extend_from_slice(&headers.to_bytes());
        if !self.body.is_empty() {
            buf.extend_from_slice(&self.body);
        }
        buf
    }
}
