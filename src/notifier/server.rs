// src/notifier/server.rs

//! Minimal static file server for interactive sessions.
//!
//! Serves the output root over HTTP/1.1, injects a small live-reload
//! script into every HTML page, and streams `reload` events to browsers
//! over Server-Sent Events at [`RELOAD_PATH`].

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::LiveReload;

/// SSE endpoint the injected script subscribes to.
pub const RELOAD_PATH: &str = "/__assetflow/reload";

const INDEX_FILE: &str = "index.html";

fn reload_script() -> String {
    format!(
        "<script>(function(){{var es=new EventSource('{RELOAD_PATH}');\
         es.addEventListener('reload',function(){{location.reload();}});}})();</script>"
    )
}

/// Where and what to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
}

/// Running server. Dropping the handle does not stop the server; call
/// [`ServerHandle::shutdown`] or let the process exit.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait until the accept loop ends (normally never).
    pub async fn wait(self) -> Result<()> {
        self.task.await.context("dev server task panicked")
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Bind and start serving in the background.
pub async fn spawn_server(options: ServeOptions, live: LiveReload) -> Result<ServerHandle> {
    let listener = TcpListener::bind((options.host.as_str(), options.port))
        .await
        .with_context(|| format!("binding dev server on {}:{}", options.host, options.port))?;
    let addr = listener.local_addr()?;
    info!(url = %format!("http://{addr}"), root = ?options.root, "dev server listening");

    let task = tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(error = %err, "dev server accept failed");
                    continue;
                }
            };
            let root = options.root.clone();
            let live = live.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, &root, live).await {
                    debug!(%peer, error = %err, "connection ended with error");
                }
            });
        }
    });

    Ok(ServerHandle { addr, task })
}

async fn handle_connection(stream: TcpStream, root: &Path, live: LiveReload) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    // Headers are not needed; drain them up to the blank line.
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 || line.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        writer.write_all(&response(400, "Bad Request", "text/plain", b"bad request")).await?;
        return Ok(());
    };
    debug!(method, target, "dev server request");

    if method != "GET" && method != "HEAD" {
        writer
            .write_all(&response(405, "Method Not Allowed", "text/plain", b"method not allowed"))
            .await?;
        return Ok(());
    }

    let path = target.split(['?', '#']).next().unwrap_or(target);
    if path == RELOAD_PATH {
        return stream_reloads(writer, live).await;
    }

    let reply = match resolve(root, &url_decode(path)) {
        Some(file) => match tokio::fs::read(&file).await {
            Ok(body) => {
                let content_type = content_type(&file);
                let body = if content_type == "text/html" {
                    inject_reload_script(&body)
                } else {
                    body
                };
                response(200, "OK", content_type, &body)
            }
            Err(_) => not_found(),
        },
        None => not_found(),
    };
    let reply = if method == "HEAD" { headers_only(reply) } else { reply };
    writer.write_all(&reply).await?;
    writer.flush().await?;
    Ok(())
}

async fn stream_reloads(mut writer: tokio::net::tcp::OwnedWriteHalf, live: LiveReload) -> Result<()> {
    let mut rx = live.subscribe();
    writer
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n: connected\n\n",
        )
        .await?;
    writer.flush().await?;

    loop {
        match rx.recv().await {
            Ok(event) => {
                let frame = format!("event: reload\ndata: {}\n\n", event.changed.len());
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
            // Missed some notifications; one reload covers all of them.
            Err(RecvError::Lagged(_)) => {
                writer.write_all(b"event: reload\ndata: 0\n\n").await?;
                writer.flush().await?;
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

/// Map a URL path onto a file below `root`. Paths escaping the root are
/// refused; directories resolve to their `index.html`.
fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let mut file = root.join(relative);
    if file.is_dir() {
        file = file.join(INDEX_FILE);
    }
    file.is_file().then_some(file)
}

fn inject_reload_script(body: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(body);
    let script = reload_script();
    let injected = if let Some(at) = html.rfind("</body>") {
        format!("{}{}{}", &html[..at], script, &html[at..])
    } else if let Some(at) = html.rfind("</html>") {
        format!("{}{}{}", &html[..at], script, &html[at..])
    } else {
        format!("{html}{script}")
    };
    injected.into_bytes()
}

fn response(status: u16, reason: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Drop the body, keeping `Content-Length` as it would be for `GET`.
fn headers_only(mut reply: Vec<u8>) -> Vec<u8> {
    if let Some(end) = reply.windows(4).position(|w| w == b"\r\n\r\n") {
        reply.truncate(end + 4);
    }
    reply
}

fn not_found() -> Vec<u8> {
    response(404, "Not Found", "text/plain", b"404 Not Found")
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        _ => "application/octet-stream",
    }
}

fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let escaped = (bytes[idx] == b'%')
            .then(|| bytes.get(idx + 1..idx + 3))
            .flatten()
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                out.push(byte);
                idx += 3;
            }
            None => {
                out.push(bytes[idx]);
                idx += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
