/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, warn};
use rustls::ClientConfig;
use rustls_pki_types::ServerName;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::body::{BodyType, read_body};
use crate::error::TaskError;
use crate::request::RequestBuilder;
use crate::response::{Response, ResponseHead, ResponseParseError};
use crate::url::Scheme;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bounds the connect step and every framed read step. Read-to-close
    /// bodies are exempt: they end when the peer closes.
    pub timeout: Duration,
    pub follow_redirects: bool,
    /// Once the redirect chain reaches this length, further redirect
    /// responses are returned unfollowed.
    pub redirects_limit: usize,
    pub max_header_size: usize,
    pub body_line_max_len: usize,
    pub read_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            timeout: Duration::from_secs(5),
            follow_redirects: true,
            redirects_limit: 5,
            max_header_size: 64 * 1024,
            body_line_max_len: 1024,
            read_buffer_size: 8 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Connected,
    Sent,
    ReadingHeaders,
    ReadingBody,
    Done,
    Failed,
}

/// The protocol state machine for one logical request.
///
/// Owns its socket exclusively: every exit path (success, error, a
/// redirect retry) drops the connection before going on. Network
/// failures never escape [`HttpSession::perform`]; they come back as
/// [`TaskError`] values.
pub struct HttpSession {
    request: RequestBuilder,
    config: SessionConfig,
    state: SessionState,
}

impl HttpSession {
    pub fn new(request: RequestBuilder, config: SessionConfig) -> Self {
        HttpSession {
            request,
            config,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the request to completion. Afterwards [`HttpSession::state`]
    /// reports `Done` or `Failed`.
    pub async fn perform(&mut self) -> Result<Response, TaskError> {
        loop {
            let rsp = match self.attempt().await {
                Ok(rsp) => rsp,
                Err(e) => {
                    self.state = SessionState::Failed;
                    warn!("request to {} failed: {e}", self.request.url());
                    return Err(e);
                }
            };

            if self.config.follow_redirects
                && rsp.is_redirect()
                && self.request.redirect_chain().len() < self.config.redirects_limit
            {
                let Some(location) = rsp.headers().get("Location").map(|v| v.to_string()) else {
                    warn!("redirect response {} carries no Location header", rsp.code());
                    self.state = SessionState::Done;
                    return Ok(rsp);
                };
                debug!("following redirect {} to {location}", rsp.code());
                if let Err(e) = self.request.redirect_to(rsp.status(), &location) {
                    self.state = SessionState::Failed;
                    return Err(TaskError::InvalidRedirectLocation(e));
                }
                self.state = SessionState::Init;
                continue;
            }

            self.state = SessionState::Done;
            return Ok(rsp);
        }
    }

    /// One connect-send-read exchange. The stream is dropped on return,
    /// closing the connection.
    async fn attempt(&mut self) -> Result<Response, TaskError> {
        let host = self.request.url().host().to_string();
        let port = self.request.url().port();
        let scheme = self.request.url().scheme();

        let stream = self.connect(&host, port).await?;
        self.state = SessionState::Connected;
        debug!("connected to {host}:{port}");

        match scheme {
            Scheme::Http => self.exchange(stream).await,
            Scheme::Https => {
                let stream = self.tls_connect(stream, &host).await?;
                self.exchange(stream).await
            }
        }
    }

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, TaskError> {
        let connect = async {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
                .await
                .map_err(|e| TaskError::ResolveFailed(Arc::new(e)))?
                .collect();

            let mut last_err: Option<io::Error> = None;
            for addr in addrs {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => last_err = Some(e),
                }
            }
            Err(match last_err {
                Some(e) => TaskError::ConnectFailed(Arc::new(e)),
                None => TaskError::ResolveFailed(Arc::new(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no address resolved",
                ))),
            })
        };

        match tokio::time::timeout(self.config.timeout, connect).await {
            Ok(r) => r,
            Err(_) => Err(TaskError::ConnectTimeout(self.config.timeout)),
        }
    }

    async fn tls_connect(
        &self,
        stream: TcpStream,
        host: &str,
    ) -> Result<TlsStream<TcpStream>, TaskError> {
        let name = ServerName::try_from(host.to_string())
            .map_err(|_| TaskError::InvalidTlsName(host.to_string()))?;
        let connector = TlsConnector::from(default_tls_config());
        match tokio::time::timeout(self.config.timeout, connector.connect(name, stream)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(TaskError::TlsHandshakeFailed(Arc::new(e))),
            Err(_) => Err(TaskError::ConnectTimeout(self.config.timeout)),
        }
    }

    async fn exchange<S>(&mut self, mut stream: S) -> Result<Response, TaskError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let wire = self.request.to_bytes();
        stream
            .write_all(&wire)
            .await
            .map_err(|e| TaskError::WriteFailed(Arc::new(e)))?;
        stream
            .flush()
            .await
            .map_err(|e| TaskError::WriteFailed(Arc::new(e)))?;
        self.state = SessionState::Sent;
        debug!("sent {} request bytes", wire.len());

        let mut reader = BufReader::with_capacity(self.config.read_buffer_size, stream);

        self.state = SessionState::ReadingHeaders;
        let mut head_buf = Vec::<u8>::with_capacity(1024);
        match tokio::time::timeout(
            self.config.timeout,
            read_head(&mut reader, self.config.max_header_size, &mut head_buf),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(TaskError::ReadTimeout(self.config.timeout)),
        }
        let head = ResponseHead::parse(&head_buf)?;
        debug!("got response status {}", head.status);

        self.state = SessionState::ReadingBody;
        let mut body = Vec::<u8>::new();
        if let Some(body_type) = head.body_type(self.request.get_method()) {
            let line_max = self.config.body_line_max_len;
            if body_type == BodyType::ReadUntilEnd {
                read_body(&mut reader, body_type, line_max, &mut body)
                    .await
                    .map_err(|e| TaskError::ReadFailed(Arc::new(e)))?;
            } else {
                match tokio::time::timeout(
                    self.config.timeout,
                    read_body(&mut reader, body_type, line_max, &mut body),
                )
                .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => return Err(TaskError::ReadFailed(Arc::new(e))),
                    Err(_) => return Err(TaskError::ReadTimeout(self.config.timeout)),
                }
            }
        }

        Ok(Response::new(
            self.request.clone(),
            head,
            bytes::Bytes::from(body),
        ))
    }
}

/// Accumulate status and header lines until the blank line that ends the
/// head block.
async fn read_head<R>(reader: &mut R, max_size: usize, buf: &mut Vec<u8>) -> Result<(), TaskError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line_start = buf.len();
        let nr = reader
            .read_until(b'\n', buf)
            .await
            .map_err(|e| TaskError::ReadFailed(Arc::new(e)))?;
        if nr == 0 {
            return Err(TaskError::InvalidResponse(ResponseParseError::RemoteClosed));
        }
        if buf.len() > max_size {
            return Err(TaskError::InvalidResponse(ResponseParseError::TooLargeHeader(max_size)));
        }
        let line = &buf[line_start..];
        if line == b"\r\n" || line == b"\n" {
            return Ok(());
        }
    }
}

fn default_tls_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    CONFIG
        .get_or_init(|| {
            let mut roots = rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth(),
            )
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.follow_redirects);
        assert_eq!(config.redirects_limit, 5);
    }

    #[test]
    fn new_session_starts_in_init() {
        let request = RequestBuilder::new("http://example.com/").unwrap();
        let session = HttpSession::new(request, SessionConfig::default());
        assert_eq!(session.state(), SessionState::Init);
    }

    #[tokio::test]
    async fn state_is_done_after_success() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                .await
                .unwrap();
        });

        let request = RequestBuilder::new(&format!("http://{addr}/")).unwrap();
        let mut session = HttpSession::new(request, SessionConfig::default());
        let rsp = session.perform().await.unwrap();
        assert_eq!(rsp.code(), 200);
        assert_eq!(session.state(), SessionState::Done);
    }

    #[tokio::test]
    async fn state_is_failed_after_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = RequestBuilder::new(&format!("http://{addr}/")).unwrap();
        let mut session = HttpSession::new(request, SessionConfig::default());
        assert!(session.perform().await.is_err());
        assert_eq!(session.state(), SessionState::Failed);
    }
}
