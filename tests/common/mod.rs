//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use http_body_util::BodyExt;
use site_gateway::http::Transport;
use site_gateway::template::Templates;
use site_gateway::{HttpServer, SiteConfig};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const PAGE_TEMPLATE: &str = "<title>{{ title|html }}</title><main>{{ content }}</main>";
pub const ERROR_TEMPLATE: &str = "<p class=\"error\">{{ error|htmlesc }}</p>";

/// File the fixture CGI script touches whenever it runs.
pub const CGI_MARKER: &str = "cgi-invoked";

/// A site root on disk plus the configuration pointing at it.
pub struct Site {
    pub dir: TempDir,
    pub config: SiteConfig,
}

impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write(root, "tmpl/page.html", PAGE_TEMPLATE);
        write(root, "tmpl/error.html", ERROR_TEMPLATE);
        write(root, "content/index.html", "<h1>Camlistore</h1><p>home</p>");
        write(root, "content/docs/index.html", "<h1>Docs</h1><p>all the docs</p>");
        write(root, "content/plain.html", "<p>untitled</p>");
        write(root, "content/my page.html", "<h1>Spaced</h1>x");
        write(root, "static/robots.txt", "User-agent: *\nDisallow: /code/\n");
        write(root, "static/site.css", "body { margin: 0 }");
        write(root, "talks/2011/index.html", "slides");
        write(root, "gitweb-static/gitweb.css", "/* gitweb */");
        write(root, "secret.txt", "top secret");

        let mut config = SiteConfig::default();
        config.site.root = root.to_path_buf();
        config.gitweb.static_files = root.join("gitweb-static");
        config.gitweb.script = None;

        #[cfg(unix)]
        {
            let script = root.join("cgi/gitweb.cgi");
            write(
                root,
                "cgi/gitweb.cgi",
                &format!(
                    "#!/bin/sh\ntouch \"$CAMWEB_ROOT/{}\"\nprintf 'Content-Type: text/plain\\r\\n\\r\\n'\nprintf 'gitweb:%s' \"$QUERY_STRING\"\n",
                    CGI_MARKER
                ),
            );
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            config.gitweb.script = Some(script);
        }

        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn cgi_invoked(&self) -> bool {
        self.root().join(CGI_MARKER).exists()
    }

    pub fn server(&self) -> HttpServer {
        let templates = Templates::load(&self.root().join("tmpl")).unwrap();
        HttpServer::new(Arc::new(self.config.clone()), templates).unwrap()
    }

    pub fn app(&self, transport: Transport) -> axum::Router {
        self.server().app(transport)
    }
}

fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// Send one request through a router.
pub async fn send(app: axum::Router, host: &str, uri: &str, user_agent: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri).header(header::HOST, host);
    if let Some(agent) = user_agent {
        builder = builder.header(header::USER_AGENT, agent);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: axum::Router, uri: &str) -> Response {
    send(app, "camlistore.org", uri, None).await
}

pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Start a backend on an ephemeral port that answers every request with
/// its own request line as the body.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }
                        let head = String::from_utf8_lossy(&head);
                        let request_line = head.lines().next().unwrap_or_default().to_string();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Backend: echo\r\nConnection: close\r\n\r\n{}",
                            request_line.len(),
                            request_line
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
