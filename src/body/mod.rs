/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 volley contributors
 */

use std::io;

use atoi::FromRadix16;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// How a response body is framed on the wire, in the priority order
/// mandated for HTTP/1.1: chunked transfer beats Content-Length, and a
/// missing length means read-to-close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Chunked,
    ContentLength(u64),
    ReadUntilEnd,
}

/// Read one framed body from `reader` into `buf`.
///
/// For chunked bodies the chunk framing is stripped and only payload
/// bytes are appended; trailer headers after the zero-size chunk are
/// consumed and discarded.
pub async fn read_body<R>(
    reader: &mut R,
    body_type: BodyType,
    line_max: usize,
    buf: &mut Vec<u8>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    match body_type {
        BodyType::Chunked => read_chunked(reader, line_max, buf).await,
        BodyType::ContentLength(n) => {
            let nr = reader.take(n).read_to_end(buf).await?;
            if (nr as u64) < n {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed before the full content-length arrived",
                ));
            }
            Ok(())
        }
        BodyType::ReadUntilEnd => match reader.read_to_end(buf).await {
            Ok(_) => Ok(()),
            // a peer that skips the TLS close_notify still ends the body
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        },
    }
}

async fn read_chunked<R>(reader: &mut R, line_max: usize, buf: &mut Vec<u8>) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::<u8>::with_capacity(32);
    loop {
        line.clear();
        let nr = reader.read_until(b'\n', &mut line).await?;
        if nr == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed while reading chunk size",
            ));
        }
        if line.len() > line_max {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "too long chunk size line",
            ));
        }

        let Some(chunk_size) = parse_chunk_size(&line) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid chunk size line",
            ));
        };
        if chunk_size == 0 {
            return discard_trailers(reader, line_max, &mut line).await;
        }

        let nr = (&mut *reader).take(chunk_size).read_to_end(buf).await?;
        if (nr as u64) < chunk_size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed inside a chunk",
            ));
        }
        read_chunk_end(reader).await?;
    }
}

/// The hex size leading a chunk-size line. A chunk extension after `;`
/// is ignored; the line must end in the size or extension, nothing else.
fn parse_chunk_size(line: &[u8]) -> Option<u64> {
    let (size, offset) = u64::from_radix_16(line);
    if offset == 0 {
        return None;
    }
    match line.get(offset) {
        Some(b'\r' | b'\n' | b';') => Some(size),
        _ => None,
    }
}

/// Consume the CRLF that terminates a chunk payload. A bare LF from a
/// sloppy server is tolerated.
async fn read_chunk_end<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut b = [0u8; 1];
    reader.read_exact(&mut b).await?;
    match b[0] {
        b'\n' => Ok(()),
        b'\r' => {
            reader.read_exact(&mut b).await?;
            if b[0] == b'\n' {
                Ok(())
            } else {
                Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid chunk end pair",
                ))
            }
        }
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "no chunk end whitespace found",
        )),
    }
}

async fn discard_trailers<R>(reader: &mut R, line_max: usize, line: &mut Vec<u8>) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        line.clear();
        let nr = reader.read_until(b'\n', line).await?;
        if nr == 0 {
            // connection close right after the last chunk is acceptable
            return Ok(());
        }
        if line.len() > line_max {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "too long trailer line",
            ));
        }
        if line.as_slice() == b"\r\n" || line.as_slice() == b"\n" {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::BufReader;
    use tokio_util::io::StreamReader;

    fn reader_for(content: &'static [u8]) -> BufReader<impl tokio::io::AsyncRead + Unpin> {
        let stream = tokio_stream::iter(vec![io::Result::Ok(Bytes::from_static(content))]);
        BufReader::new(StreamReader::new(stream))
    }

    #[test]
    fn chunk_size_line() {
        assert_eq!(parse_chunk_size(b"4\r\n"), Some(4));
        assert_eq!(parse_chunk_size(b"1F\r\n"), Some(0x1f));
        assert_eq!(parse_chunk_size(b"0\r\n"), Some(0));
        assert_eq!(parse_chunk_size(b"a; name=value\r\n"), Some(0xa));
        assert_eq!(parse_chunk_size(b"\r\n"), None);
        assert_eq!(parse_chunk_size(b"4"), None);
        assert_eq!(parse_chunk_size(b"4 \r\n"), None);
        assert_eq!(parse_chunk_size(b"xyz\r\n"), None);
    }

    #[tokio::test]
    async fn chunked_two_chunks() {
        let mut reader = reader_for(b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
        let mut body = Vec::new();
        read_body(&mut reader, BodyType::Chunked, 1024, &mut body)
            .await
            .unwrap();
        assert_eq!(body, b"Wikipedia");
    }

    #[tokio::test]
    async fn chunked_with_extension_and_trailer() {
        let mut reader =
            reader_for(b"4; ext=1\r\nWiki\r\n0\r\nExpires: never\r\nX-Sum: 1\r\n\r\nleftover");
        let mut body = Vec::new();
        read_body(&mut reader, BodyType::Chunked, 1024, &mut body)
            .await
            .unwrap();
        assert_eq!(body, b"Wiki");
    }

    #[tokio::test]
    async fn chunked_truncated() {
        let mut reader = reader_for(b"5\r\nWik");
        let mut body = Vec::new();
        let err = read_body(&mut reader, BodyType::Chunked, 1024, &mut body)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn chunked_invalid_size() {
        let mut reader = reader_for(b"xyz\r\n");
        let mut body = Vec::new();
        let err = read_body(&mut reader, BodyType::Chunked, 1024, &mut body)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn fixed_length() {
        let mut reader = reader_for(b"hello world");
        let mut body = Vec::new();
        read_body(&mut reader, BodyType::ContentLength(5), 1024, &mut body)
            .await
            .unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn fixed_length_short_read() {
        let mut reader = reader_for(b"hi");
        let mut body = Vec::new();
        let err = read_body(&mut reader, BodyType::ContentLength(5), 1024, &mut body)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn read_until_end() {
        let mut reader = reader_for(b"everything until close");
        let mut body = Vec::new();
        read_body(&mut reader, BodyType::ReadUntilEnd, 1024, &mut body)
            .await
            .unwrap();
        assert_eq!(body, b"everything until close");
    }
}
