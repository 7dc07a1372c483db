/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use volley::{Client, Method, RequestBuilder, SessionConfig, TaskError};

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &[u8]) -> usize {
    for line in head.split(|&b| b == b'\n') {
        let line = String::from_utf8_lossy(line);
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse().unwrap_or(0);
            }
        }
    }
    0
}

/// Read one full request off the stream: the head block plus as many
/// body bytes as its Content-Length announces.
async fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 2048];
    loop {
        let n = stream.read(&mut tmp).await.unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(head_end) = find_blank_line(&buf) {
            let len = content_length(&buf[..head_end]);
            if buf.len() >= head_end + 4 + len {
                return buf;
            }
        }
    }
}

/// Serve one scripted response per accepted connection, in order, then
/// stop listening.
async fn spawn_server(responses: Vec<Vec<u8>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for rsp in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_request(&mut stream).await;
            stream.write_all(&rsp).await.unwrap();
            let _ = stream.shutdown().await;
        }
    });
    addr
}

#[tokio::test]
async fn get_with_content_length() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 5\r\n\r\nhello".to_vec(),
    ])
    .await;

    let mut client = Client::new();
    let req = client.get(&format!("http://{addr}/")).unwrap();
    client.collect().await;

    let rsp = req.result().await.unwrap();
    assert_eq!(rsp.code(), 200);
    assert_eq!(rsp.reason(), "OK");
    assert_eq!(rsp.body().as_ref(), b"hello");
    assert_eq!(rsp.text().as_deref(), Some("hello"));
}

#[tokio::test]
async fn get_with_chunked_body() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n"
            .to_vec(),
    ])
    .await;

    let rsp = volley::get(&format!("http://{addr}/"))
        .unwrap()
        .result()
        .await
        .unwrap();
    assert_eq!(rsp.body().as_ref(), b"Wikipedia");
}

#[tokio::test]
async fn get_read_until_close() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nstream until the end".to_vec(),
    ])
    .await;

    let rsp = volley::get(&format!("http://{addr}/"))
        .unwrap()
        .result()
        .await
        .unwrap();
    assert_eq!(rsp.body().as_ref(), b"stream until the end");
}

#[tokio::test]
async fn post_body_is_sent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let req = read_request(&mut stream).await;
        let head_end = find_blank_line(&req).unwrap();
        let body = req[head_end + 4..].to_vec();
        let rsp = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );
        stream.write_all(rsp.as_bytes()).await.unwrap();
        stream.write_all(&body).await.unwrap();
        let _ = stream.shutdown().await;
    });

    let request = RequestBuilder::new(&format!("http://{addr}/echo"))
        .unwrap()
        .method(Method::Post)
        .body("ping pong");
    let rsp = volley::send(request).result().await.unwrap();
    assert_eq!(rsp.code(), 200);
    assert_eq!(rsp.body().as_ref(), b"ping pong");
}

#[tokio::test]
async fn redirects_are_followed() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 302 Found\r\nLocation: /two\r\nContent-Length: 0\r\n\r\n".to_vec(),
        b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ndone".to_vec(),
    ])
    .await;

    let rsp = volley::get(&format!("http://{addr}/one"))
        .unwrap()
        .result()
        .await
        .unwrap();
    assert_eq!(rsp.code(), 200);
    assert_eq!(rsp.body().as_ref(), b"done");

    let chain = rsp.request().redirect_chain();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].source.path(), "/one");
    assert_eq!(chain[0].destination.path(), "/two");
    assert_eq!(chain[0].code.as_u16(), 302);
}

#[tokio::test]
async fn redirect_limit_returns_last_redirect() {
    let hop = |n: usize| {
        format!("HTTP/1.1 302 Found\r\nLocation: /hop{n}\r\nContent-Length: 0\r\n\r\n").into_bytes()
    };
    let addr = spawn_server((1..=6).map(hop).collect()).await;

    let rsp = volley::get(&format!("http://{addr}/start"))
        .unwrap()
        .result()
        .await
        .unwrap();
    assert_eq!(rsp.code(), 302);
    assert_eq!(rsp.request().redirect_chain().len(), 5);
}

#[tokio::test]
async fn redirects_can_be_disabled() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 301 Moved Permanently\r\nLocation: /elsewhere\r\nContent-Length: 0\r\n\r\n"
            .to_vec(),
    ])
    .await;

    let config = SessionConfig {
        follow_redirects: false,
        ..SessionConfig::default()
    };
    let request = RequestBuilder::new(&format!("http://{addr}/")).unwrap();
    let rsp = volley::send_with(request, config).result().await.unwrap();
    assert_eq!(rsp.code(), 301);
    assert!(rsp.request().redirect_chain().is_empty());
}

#[tokio::test]
async fn collect_joins_all_tracked_requests() {
    let rsp = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec();
    let addr = spawn_server(vec![rsp.clone(), rsp.clone(), rsp]).await;

    let mut client = Client::new();
    let url = format!("http://{addr}/");
    let reqs = vec![
        client.get(&url).unwrap(),
        client.get(&url).unwrap(),
        client.get(&url).unwrap(),
    ];
    assert_eq!(client.outstanding(), 3);

    client.collect().await;
    assert_eq!(client.outstanding(), 0);
    for req in &reqs {
        assert!(req.is_done());
        assert_eq!(req.result().await.unwrap().code(), 200);
    }

    // nothing new issued since, so this returns immediately
    client.collect().await;
}

#[tokio::test]
async fn result_can_be_read_more_than_once() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec(),
    ])
    .await;

    let req = volley::get(&format!("http://{addr}/")).unwrap();
    let first = req.result().await.unwrap();
    let second = req.result().await.unwrap();
    assert_eq!(first.code(), second.code());
    assert_eq!(first.body(), second.body());
}

#[tokio::test]
async fn connect_refused_resolves_to_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = volley::get(&format!("http://{addr}/"))
        .unwrap()
        .result()
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::ConnectFailed(_)));
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // hold the connection open without answering
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(stream);
    });

    let config = SessionConfig {
        timeout: Duration::from_millis(200),
        ..SessionConfig::default()
    };
    let request = RequestBuilder::new(&format!("http://{addr}/")).unwrap();
    let err = volley::send_with(request, config)
        .result()
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::ReadTimeout(_)));
    assert!(err.is_timeout());
}

#[tokio::test]
async fn on_complete_fires_once_with_result() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec(),
    ])
    .await;

    let req = volley::get(&format!("http://{addr}/")).unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    req.on_complete(move |result| {
        let _ = tx.send(result.as_ref().map(|r| r.code()).map_err(|e| e.clone()));
    });

    let delivered = rx.await.unwrap();
    assert_eq!(delivered.unwrap(), 200);
}

#[tokio::test]
async fn on_complete_after_completion_fires_immediately() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec(),
    ])
    .await;

    let req = volley::get(&format!("http://{addr}/")).unwrap();
    let rsp = req.result().await.unwrap();
    assert_eq!(rsp.code(), 200);
    assert!(req.is_done());

    // registered after the fact, the callback still gets the result
    let (tx, rx) = tokio::sync::oneshot::channel();
    req.on_complete(move |result| {
        let _ = tx.send(result.as_ref().map(|r| r.code()).map_err(|e| e.clone()));
    });
    assert_eq!(rx.await.unwrap().unwrap(), 200);
}

#[tokio::test]
async fn abort_resolves_to_canceled() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(stream);
    });

    let req = volley::get(&format!("http://{addr}/")).unwrap();
    req.abort();
    let err = req.result().await.unwrap_err();
    assert!(matches!(err, TaskError::Canceled));
}

#[tokio::test]
async fn head_response_has_no_body() {
    let addr = spawn_server(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n".to_vec(),
    ])
    .await;

    let mut client = Client::new();
    let req = client.head(&format!("http://{addr}/")).unwrap();
    let rsp = req.result().await.unwrap();
    assert_eq!(rsp.code(), 200);
    assert!(rsp.body().is_empty());
}
