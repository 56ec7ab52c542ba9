//! `/debugz/ip`: report the host's IPv4 address on one interface.

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct InterfaceAddr {
    program: String,
    interface: String,
}

impl InterfaceAddr {
    pub fn new(program: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            interface: interface.into(),
        }
    }

    async fn query(&self) -> Option<String> {
        let output = Command::new(&self.program)
            .args(["-f", "inet", "addr", "show", "dev", self.interface.as_str()])
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => {
                first_inet_addr(&String::from_utf8_lossy(&output.stdout)).map(str::to_string)
            }
            Ok(output) => {
                tracing::warn!(status = %output.status, interface = %self.interface, "ip command failed");
                None
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Could not run ip command");
                None
            }
        }
    }

    pub async fn serve(&self) -> Response {
        let body = self.query().await.unwrap_or_default();
        let mut response = body.into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Text between the first `inet ` and the following `/`.
pub fn first_inet_addr(output: &str) -> Option<&str> {
    let (_, rest) = output.split_once("inet ")?;
    let (addr, _) = rest.split_once('/')?;
    Some(addr)
}
