//! Minimal one-shot HTTP stub for download and token exchange tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one HTTP response on an ephemeral local port.
///
/// Returns the base URL without a trailing slash. The stub accepts a single
/// connection, reads the request headers and replies with `status` and
/// `body`; a second request hits a closed port, which makes it easy to
/// assert that callers cache.
pub async fn spawn_one_shot_http(status: u16, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind stub listener");
    let addr = listener.local_addr().expect("stub listener has no address");

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            // Read until the end of the request headers; request content is
            // irrelevant to the stub.
            let mut buf = vec![0u8; 8192];
            let mut read = 0usize;
            loop {
                match stream.read(&mut buf[read..]).await {
                    Ok(0) => break,
                    Ok(n) => {
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                        if read == buf.len() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            let reason = match status {
                200 => "OK",
                202 => "Accepted",
                400 => "Bad Request",
                403 => "Forbidden",
                404 => "Not Found",
                500 => "Internal Server Error",
                _ => "Status",
            };
            let header = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason,
                body.len()
            );
            let _ = stream.write_all(header.as_bytes()).await;
            let _ = stream.write_all(&body).await;
            let _ = stream.flush().await;
        }
    });

    format!("http://{}", addr)
}
