use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use assert_matches::assert_matches;

use nwp_cache::error::NwpError;
use nwp_cache::index::ByteRange;
use nwp_cache::transport::{HttpTransport, Transport};

/// Answers a single request with `status` and `body`; the handle yields the raw request head.
fn serve_once(status: &'static str, body: &'static [u8]) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/rap.20240115/file.grib2", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buffer).unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buffer[..read]);
        }
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(body).unwrap();
        String::from_utf8_lossy(&request).to_lowercase()
    });
    (url, handle)
}

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(5)).unwrap()
}

#[test]
fn range_answered_with_whole_file_is_rejected() {
    let (url, server) = serve_once("200 OK", b"the whole file");
    let mut sink = Vec::new();
    let err = transport()
        .fetch_range(&url, ByteRange { start: 0, stop: Some(500) }, &mut sink)
        .unwrap_err();
    assert_matches!(err, NwpError::TransferStatus { status: 200, .. });
    assert!(sink.is_empty());
    assert!(server.join().unwrap().contains("range: bytes=0-499"));
}

#[test]
fn partial_content_is_streamed_into_sink() {
    let (url, server) = serve_once("206 Partial Content", b"GRIB");
    let mut sink = Vec::new();
    let bytes = transport()
        .fetch_range(&url, ByteRange { start: 1200, stop: None }, &mut sink)
        .unwrap();
    assert_eq!(bytes, 4);
    assert_eq!(sink, b"GRIB");
    assert!(server.join().unwrap().contains("range: bytes=1200-"));
}

#[test]
fn missing_index_is_a_status_error() {
    let (url, server) = serve_once("404 Not Found", b"");
    let err = transport().fetch_text(&format!("{url}.idx")).unwrap_err();
    assert_matches!(err, NwpError::TransferStatus { status: 404, .. });
    server.join().unwrap();
}

#[test]
fn index_text_is_returned() {
    let (url, server) = serve_once("200 OK", b"1:0:d=2024011512:REFC:entire atmosphere:anl:\n");
    let text = transport().fetch_text(&url).unwrap();
    assert!(text.starts_with("1:0:d=2024011512:REFC"));
    server.join().unwrap();
}
