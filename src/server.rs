//! Dashboard HTTP server.
//!
//! Endpoints:
//!   GET  /                   - dashboard page
//!   GET  /api/health         - health check
//!   GET  /api/controls       - widget state
//!   GET  /api/views          - all views for the current state
//!   GET  /api/view/{kind}    - one view (merit_order | map | capacities)
//!   POST /api/input          - apply one input, returns the rebuilt views
//!   GET  /api/merit-order    - engine query (?countries=&mode=&carbon=)
//!
//! Connections are served one at a time on the calling task, so the session
//! needs no lock and every input is fully applied before the next request
//! is read. Each request must arrive within `READ_TIMEOUT`, with lines and
//! header count capped.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use url::Url;

use crate::config::parse_list;
use crate::logging::{log, log_request, obj, v_str, Domain, Level};
use crate::merit::{OperationMode, Selection};
use crate::page;
use crate::session::{Input, Session, CARBON_PRICE_BOUNDS};
use crate::views::ViewKind;

const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_LINE_BYTES: usize = 8 * 1024;
const MAX_HEADERS: usize = 100;
/// Time allowed for one whole request to arrive. Connections are served
/// one at a time, so a stalled client must not hold the loop.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            431 => "Request Header Fields Too Large",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Connection: close\r\n\
             Content-Length: {}\r\n\r\n{}",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(v) => Response::json(200, &v),
        Err(err) => Response::error(500, &err.to_string()),
    }
}

/// Routes one request. Pure apart from the session mutation for `/api/input`.
pub fn handle(session: &mut Session, method: &str, target: &str, body: &str) -> Response {
    let url = match Url::parse("http://localhost").and_then(|base| base.join(target)) {
        Ok(u) => u,
        Err(err) => return Response::error(400, &format!("bad request target: {}", err)),
    };

    match (method, url.path()) {
        ("GET", "/") | ("GET", "/index.html") => Response::html(page::render(&session.snapshot())),
        ("GET", "/api/health") => Response::json(200, &json!({ "status": "ok" })),
        ("GET", "/api/controls") => to_json(&session.snapshot()),
        ("GET", "/api/views") => to_json(&json!({
            "views": session.render_all(),
            "state_hash": format!("{:016x}", session.state_hash()),
        })),
        ("GET", path) if path.starts_with("/api/view/") => {
            match ViewKind::parse(&path["/api/view/".len()..]) {
                Some(kind) => to_json(&session.render(kind)),
                None => Response::error(404, "unknown view"),
            }
        }
        ("POST", "/api/input") => apply_input(session, body),
        ("GET", "/api/merit-order") => merit_query(session, &url),
        (_, "/" | "/api/health" | "/api/controls" | "/api/views" | "/api/input" | "/api/merit-order") => {
            Response::error(405, "method not allowed")
        }
        _ => Response::error(404, "not found"),
    }
}

fn apply_input(session: &mut Session, body: &str) -> Response {
    let input: Input = match serde_json::from_str(body) {
        Ok(i) => i,
        Err(err) => return Response::error(400, &format!("bad input: {}", err)),
    };
    match session.apply(input) {
        Ok(recompute) => to_json(&json!({
            "recompute": recompute,
            "controls": session.snapshot(),
        })),
        Err(err) => Response::error(400, &err.to_string()),
    }
}

fn merit_query(session: &Session, url: &Url) -> Response {
    let mut selection = Selection::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "countries" => selection.countries = parse_list(&value).into_iter().collect(),
            "mode" => match OperationMode::parse(&value) {
                Some(mode) => selection.mode = mode,
                None => return Response::error(400, &format!("unknown mode: {}", value)),
            },
            "carbon" => match value.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= CARBON_PRICE_BOUNDS.0 => selection.carbon_price = Some(v),
                _ => return Response::error(400, &format!("bad carbon price: {}", value)),
            },
            _ => {}
        }
    }
    to_json(&session.query(&selection))
}

/// Accept loop. Returns only if the listener cannot be bound.
pub async fn serve(addr: &str, mut session: Session) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    log(
        Level::Info,
        Domain::System,
        "listening",
        obj(&[("addr", v_str(addr)), ("msg", v_str(&format!("dashboard at http://{}", addr)))]),
    );

    loop {
        let (stream, _peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                log(Level::Warn, Domain::Http, "accept_failed", obj(&[("error", v_str(&err.to_string()))]));
                continue;
            }
        };
        if let Err(err) = handle_connection(stream, &mut session).await {
            log(Level::Warn, Domain::Http, "connection_failed", obj(&[("error", v_str(&err.to_string()))]));
        }
    }
}

/// Parsed request. The body is decoded lossily as UTF-8.
#[derive(Debug)]
struct Request {
    method: String,
    target: String,
    body: String,
}

#[derive(Debug)]
enum ReadError {
    TimedOut,
    LineTooLong,
    TooManyHeaders,
    BodyTooLarge(usize),
    Io(std::io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::TimedOut => write!(f, "request not received within {:?}", READ_TIMEOUT),
            ReadError::LineTooLong => write!(f, "request line or header longer than {} bytes", MAX_LINE_BYTES),
            ReadError::TooManyHeaders => write!(f, "more than {} headers", MAX_HEADERS),
            ReadError::BodyTooLarge(n) => write!(f, "body of {} bytes exceeds {}", n, MAX_BODY_BYTES),
            ReadError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ReadError {}

impl ReadError {
    /// Reply owed to the client, if the connection is still usable.
    fn response(&self) -> Option<Response> {
        match self {
            ReadError::TimedOut => Some(Response::error(408, &self.to_string())),
            ReadError::LineTooLong | ReadError::TooManyHeaders => Some(Response::error(431, &self.to_string())),
            ReadError::BodyTooLarge(_) => Some(Response::error(413, &self.to_string())),
            ReadError::Io(_) => None,
        }
    }
}

/// Reads one request, giving up after `wait`. `Ok(None)` means the peer
/// closed the connection before sending anything.
async fn read_request<R>(reader: &mut R, wait: Duration) -> Result<Option<Request>, ReadError>
where
    R: AsyncBufRead + Unpin,
{
    match timeout(wait, read_request_unbounded(reader)).await {
        Ok(result) => result,
        Err(_) => Err(ReadError::TimedOut),
    }
}

async fn read_line_capped<R>(reader: &mut R, line: &mut String) -> Result<usize, ReadError>
where
    R: AsyncBufRead + Unpin,
{
    let n = (&mut *reader)
        .take(MAX_LINE_BYTES as u64)
        .read_line(line)
        .await
        .map_err(ReadError::Io)?;
    if n == MAX_LINE_BYTES && !line.ends_with('\n') {
        return Err(ReadError::LineTooLong);
    }
    Ok(n)
}

async fn read_request_unbounded<R>(reader: &mut R) -> Result<Option<Request>, ReadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    if read_line_capped(reader, &mut request_line).await? == 0 {
        return Ok(None);
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("/").to_string();

    let mut content_length = 0usize;
    let mut headers = 0usize;
    loop {
        let mut line = String::new();
        if read_line_capped(reader, &mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        headers += 1;
        if headers > MAX_HEADERS {
            return Err(ReadError::TooManyHeaders);
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Err(ReadError::BodyTooLarge(content_length));
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await.map_err(ReadError::Io)?;
    Ok(Some(Request {
        method,
        target,
        body: String::from_utf8_lossy(&body).into_owned(),
    }))
}

async fn handle_connection(stream: TcpStream, session: &mut Session) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let started = Instant::now();
    let (method, target, response) = match read_request(&mut reader, READ_TIMEOUT).await {
        Ok(Some(req)) => {
            let response = handle(session, &req.method, &req.target, &req.body);
            (req.method, req.target, response)
        }
        Ok(None) => return Ok(()),
        Err(err) => match err.response() {
            Some(response) => ("-".to_string(), "-".to_string(), response),
            None => return Err(err.into()),
        },
    };

    write_half.write_all(response.to_http().as_bytes()).await?;
    write_half.flush().await?;
    log_request(
        &method,
        &target,
        response.status,
        started.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_framing_has_length_and_status() {
        let r = Response::json(200, &json!({"status": "ok"}));
        let raw = r.to_http();
        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("Content-Length: 15\r\n"));
        assert!(raw.ends_with("\r\n\r\n{\"status\":\"ok\"}"));
    }

    #[test]
    fn error_body_is_json() {
        let r = Response::error(404, "not found");
        assert_eq!(r.status, 404);
        let v: Value = serde_json::from_str(&r.body).unwrap();
        assert_eq!(v["error"], "not found");
        assert!(r.to_http().starts_with("HTTP/1.1 404 Not Found"));
    }

    #[tokio::test]
    async fn request_head_and_body_are_read() {
        let raw = b"POST /api/input HTTP/1.1\r\nHost: x\r\ncontent-length: 4\r\n\r\nabcd";
        let mut reader = BufReader::new(&raw[..]);
        let req = read_request(&mut reader, Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.target, "/api/input");
        assert_eq!(req.body, "abcd");
    }

    #[tokio::test]
    async fn closed_connection_reads_as_none() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(read_request(&mut reader, Duration::from_secs(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stalled_client_times_out() {
        // the writer half stays open and silent
        let (_client, server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(server);
        let err = read_request(&mut reader, Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, ReadError::TimedOut));
        assert_eq!(err.response().unwrap().status, 408);
    }

    #[tokio::test]
    async fn overlong_request_line_is_rejected() {
        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_LINE_BYTES));
        let mut reader = BufReader::new(raw.as_bytes());
        let err = read_request(&mut reader, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ReadError::LineTooLong));
        assert_eq!(err.response().unwrap().status, 431);
    }

    #[tokio::test]
    async fn oversized_body_is_refused_before_reading() {
        let raw = format!("POST /api/input HTTP/1.1\r\nContent-Length: {}\r\n\r\n", MAX_BODY_BYTES + 1);
        let mut reader = BufReader::new(raw.as_bytes());
        let err = read_request(&mut reader, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ReadError::BodyTooLarge(_)));
        assert!(err.response().unwrap().to_http().starts_with("HTTP/1.1 413 Payload Too Large"));
    }
}
