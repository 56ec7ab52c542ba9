//! CGI/1.1 process adapter.
//!
//! # Responsibilities
//! - Map a request to a CGI environment on top of a fixed overlay
//! - Stream the request body into the program's stdin
//! - Turn the program's header block into the response head and stream
//!   the rest of stdout as the body
//!
//! # Design Decisions
//! - The process inherits the server environment, then the overlay, then the
//!   per-request variables
//! - Invocation failures become 502 and are not retried
//! - The child is reaped in the background once its output is consumed

use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use futures_util::TryStreamExt;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::http::request::{
    decoded_path, remote_addr, request_host, request_uri, strip_port, transport,
};
use crate::http::response::bad_gateway;

const SERVER_SOFTWARE: &str = concat!("site-gateway/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum CgiError {
    #[error("spawn {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CGI process pipes unavailable")]
    Pipe,

    #[error("reading CGI output: {0}")]
    Io(#[from] io::Error),

    #[error("CGI program produced no output")]
    NoOutput,

    #[error("invalid CGI status {0:?}")]
    BadStatus(String),
}

/// Parsed CGI response head.
#[derive(Debug)]
pub struct CgiHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Runs one external program per request.
#[derive(Debug, Clone)]
pub struct CgiHandler {
    path: PathBuf,
    root: String,
    env: Vec<(String, String)>,
}

impl CgiHandler {
    /// `root` is the URL prefix the script is mounted at (e.g. `/code/`).
    pub fn new(path: impl Into<PathBuf>, root: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
            env: Vec::new(),
        }
    }

    /// Add a variable to the fixed environment overlay.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Request-derived CGI variables.
    pub fn environment(&self, req: &Request<Body>) -> Vec<(String, String)> {
        let uri = req.uri();
        let path = decoded_path(req).unwrap_or(Cow::Borrowed(uri.path()));
        let script_name = self.root.trim_end_matches('/');
        let path_info = if script_name.is_empty() {
            &*path
        } else {
            path.strip_prefix(script_name).unwrap_or(&*path)
        };

        let transport = transport(req);
        let host = request_host(req).unwrap_or_default();
        let server_name = strip_port(host);
        let server_port = host
            .strip_prefix(server_name)
            .and_then(|rest| rest.strip_prefix(':'))
            .filter(|port| !port.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| if transport.is_tls() { "443" } else { "80" }.to_string());

        let mut env = vec![
            ("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string()),
            ("SERVER_SOFTWARE".to_string(), SERVER_SOFTWARE.to_string()),
            ("SERVER_NAME".to_string(), server_name.to_string()),
            ("SERVER_PORT".to_string(), server_port),
            ("SERVER_PROTOCOL".to_string(), format!("{:?}", req.version())),
            ("REQUEST_METHOD".to_string(), req.method().to_string()),
            ("REQUEST_URI".to_string(), request_uri(req).to_string()),
            ("QUERY_STRING".to_string(), uri.query().unwrap_or_default().to_string()),
            ("SCRIPT_NAME".to_string(), script_name.to_string()),
            ("SCRIPT_FILENAME".to_string(), self.path.display().to_string()),
            ("PATH_INFO".to_string(), path_info.to_string()),
        ];

        if let Some(addr) = remote_addr(req) {
            env.push(("REMOTE_ADDR".to_string(), addr.ip().to_string()));
            env.push(("REMOTE_HOST".to_string(), addr.ip().to_string()));
            env.push(("REMOTE_PORT".to_string(), addr.port().to_string()));
        }
        if transport.is_tls() {
            env.push(("HTTPS".to_string(), "on".to_string()));
        }
        if let Some(ct) = req.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            env.push(("CONTENT_TYPE".to_string(), ct.to_string()));
        }
        if let Some(len) = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|len| *len > 0)
        {
            env.push(("CONTENT_LENGTH".to_string(), len.to_string()));
        }

        for name in req.headers().keys() {
            let key = name.as_str().to_ascii_uppercase().replace('-', "_");
            // httpoxy: never let a client set HTTP_PROXY
            if key == "PROXY" {
                continue;
            }
            let sep = if key == "COOKIE" { "; " } else { ", " };
            let value = req
                .headers()
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(sep);
            env.push((format!("HTTP_{}", key), value));
        }

        env
    }

    pub async fn serve(&self, req: Request<Body>) -> Response {
        match self.run(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(script = %self.path.display(), error = %e, "CGI error");
                bad_gateway()
            }
        }
    }

    async fn run(&self, req: Request<Body>) -> Result<Response, CgiError> {
        let request_env = self.environment(&req);

        let mut cmd = Command::new(&self.path);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .envs(request_env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| CgiError::Spawn {
            path: self.path.clone(),
            source,
        })?;

        let mut stdin = child.stdin.take().ok_or(CgiError::Pipe)?;
        let stdout = child.stdout.take().ok_or(CgiError::Pipe)?;

        let body = req.into_body().into_data_stream().map_err(io::Error::other);
        tokio::spawn(async move {
            let mut body = StreamReader::new(body);
            if let Err(e) = tokio::io::copy(&mut body, &mut stdin).await {
                tracing::debug!(error = %e, "Request body not fully delivered to CGI program");
            }
        });

        let mut reader = BufReader::new(stdout);
        let head = read_head(&mut reader).await?.ok_or(CgiError::NoOutput)?;

        let script = self.path.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    tracing::warn!(script = %script.display(), %status, "CGI program exited unsuccessfully");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(script = %script.display(), error = %e, "CGI wait failed"),
            }
        });

        let mut response = Response::new(Body::from_stream(ReaderStream::new(reader)));
        *response.status_mut() = head.status;
        *response.headers_mut() = head.headers;
        Ok(response)
    }
}

/// Read the header block up to the first blank line. `None` means the
/// program wrote nothing at all.
pub async fn read_head<R>(reader: &mut R) -> Result<Option<CgiHead>, CgiError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HeaderMap::new();
    let mut status = None;
    let mut saw_output = false;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        saw_output = true;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        let Some((name, value)) = trimmed.split_once(':') else {
            tracing::warn!(line = %trimmed, "Ignoring malformed CGI header line");
            continue;
        };
        let value = value.trim();

        if name.eq_ignore_ascii_case("status") {
            let code = value
                .get(..3)
                .and_then(|c| c.parse::<u16>().ok())
                .and_then(|c| StatusCode::from_u16(c).ok())
                .ok_or_else(|| CgiError::BadStatus(value.to_string()))?;
            status = Some(code);
            continue;
        }

        match (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(line = %trimmed, "Ignoring invalid CGI header"),
        }
    }

    if !saw_output {
        return Ok(None);
    }

    let status = status.unwrap_or(if headers.contains_key(header::LOCATION) {
        StatusCode::FOUND
    } else {
        StatusCode::OK
    });

    Ok(Some(CgiHead { status, headers }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Transport;

    async fn head(raw: &str) -> Result<Option<CgiHead>, CgiError> {
        let mut reader = BufReader::new(raw.as_bytes());
        read_head(&mut reader).await
    }

    #[tokio::test]
    async fn test_parse_status_and_headers() {
        let head = head("Status: 404 Not Found\r\nContent-Type: text/html\r\n\r\nbody")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(head.status, StatusCode::NOT_FOUND);
        assert_eq!(head.headers.get(header::CONTENT_TYPE).unwrap(), "text/html");
    }

    #[tokio::test]
    async fn test_location_implies_redirect() {
        let head = head("Location: http://example.org/\n\n").await.unwrap().unwrap();
        assert_eq!(head.status, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_empty_output() {
        assert!(head("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_status() {
        let err = head("Status: abc\n\n").await.unwrap_err();
        assert!(matches!(err, CgiError::BadStatus(_)));
    }

    #[test]
    fn test_environment() {
        let handler = CgiHandler::new("/usr/lib/cgi-bin/gitweb.cgi", "/code/");
        let mut req = Request::builder()
            .method("GET")
            .uri("/code/?p=camlistore.git;a=summary")
            .header("Host", "camlistore.org:8080")
            .header("Cookie", "a=1")
            .header("Proxy", "http://evil")
            .header("Accept", "text/html")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(Transport::Tls);

        let env: std::collections::HashMap<_, _> = handler.environment(&req).into_iter().collect();
        assert_eq!(env["QUERY_STRING"], "p=camlistore.git;a=summary");
        assert_eq!(env["SCRIPT_NAME"], "/code");
        assert_eq!(env["PATH_INFO"], "/");
        assert_eq!(env["SERVER_NAME"], "camlistore.org");
        assert_eq!(env["SERVER_PORT"], "8080");
        assert_eq!(env["SERVER_PROTOCOL"], "HTTP/1.1");
        assert_eq!(env["HTTPS"], "on");
        assert_eq!(env["HTTP_COOKIE"], "a=1");
        assert_eq!(env["HTTP_ACCEPT"], "text/html");
        assert!(!env.contains_key("HTTP_PROXY"));
        assert!(!env.contains_key("CONTENT_LENGTH"));
    }

    #[test]
    fn test_environment_decodes_path_info() {
        let handler = CgiHandler::new("/usr/lib/cgi-bin/gitweb.cgi", "/code/");
        let req = Request::builder()
            .method("POST")
            .uri("/code/my%20repo.git?a=b%20c")
            .header("Content-Length", "12")
            .body(Body::empty())
            .unwrap();

        let env: std::collections::HashMap<_, _> = handler.environment(&req).into_iter().collect();
        assert_eq!(env["PATH_INFO"], "/my repo.git");
        assert_eq!(env["QUERY_STRING"], "a=b%20c");
        assert_eq!(env["REQUEST_URI"], "/code/my%20repo.git?a=b%20c");
        assert_eq!(env["CONTENT_LENGTH"], "12");
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use http_body_util::BodyExt;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("test.cgi");
            std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_runs_program_with_overlay() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(
                dir.path(),
                "printf 'Content-Type: text/plain\\r\\n\\r\\n'\nprintf '%s|%s' \"$CAMWEB_ROOT\" \"$QUERY_STRING\"\n",
            );
            let handler = CgiHandler::new(path, "/code/").with_env("CAMWEB_ROOT", "/srv/site");

            let req = Request::builder()
                .uri("/code/?p=x;f=y")
                .body(Body::empty())
                .unwrap();
            let response = handler.serve(req).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"/srv/site|p=x;f=y");
        }

        #[tokio::test]
        async fn test_request_body_reaches_stdin() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(dir.path(), "printf 'Content-Type: text/plain\\n\\n'\ncat\n");
            let handler = CgiHandler::new(path, "/code/");

            let req = Request::builder()
                .method("POST")
                .uri("/code/")
                .body(Body::from("posted"))
                .unwrap();
            let response = handler.serve(req).await;
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"posted");
        }

        #[tokio::test]
        async fn test_large_body_is_streamed_to_stdin() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(
                dir.path(),
                "printf 'Content-Type: text/plain\\n\\n'\nprintf '%s:' \"$CONTENT_LENGTH\"\nwc -c | tr -d ' '\n",
            );
            let handler = CgiHandler::new(path, "/code/");

            const LEN: usize = 4 * 1024 * 1024;
            let chunks = (0..LEN / 8192)
                .map(|_| Ok::<_, std::io::Error>(vec![b'x'; 8192]))
                .collect::<Vec<_>>();
            let req = Request::builder()
                .method("POST")
                .uri("/code/")
                .header("Content-Length", LEN.to_string())
                .body(Body::from_stream(futures_util::stream::iter(chunks)))
                .unwrap();

            let response = handler.serve(req).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = response.into_body().collect().await.unwrap().to_bytes();
            let text = String::from_utf8(body.to_vec()).unwrap();
            assert_eq!(text.trim(), format!("{}:{}", LEN, LEN));
        }

        #[tokio::test]
        async fn test_missing_program_is_bad_gateway() {
            let handler = CgiHandler::new("/nonexistent/gitweb.cgi", "/code/");
            let req = Request::builder().uri("/code/").body(Body::empty()).unwrap();
            assert_eq!(handler.serve(req).await.status(), StatusCode::BAD_GATEWAY);
        }

        #[tokio::test]
        async fn test_silent_failure_is_bad_gateway() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(dir.path(), "exit 3\n");
            let handler = CgiHandler::new(path, "/code/");
            let req = Request::builder().uri("/code/").body(Body::empty()).unwrap();
            assert_eq!(handler.serve(req).await.status(), StatusCode::BAD_GATEWAY);
        }
    }
}
