//! Response construction helpers.
//!
//! # Responsibilities
//! - Build redirects, filter rejections and upstream failures with minimal
//!   plain-text bodies
//! - Wrap rendered pages with an HTML content type
//!
//! # Design Decisions
//! - Redirects use 302 Found, matching what browsers expect for the
//!   canonical-host and URL-fix rewrites
//! - Upstream errors never echo the underlying error object

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use minijinja::HtmlEscape;

/// 302 redirect to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let body = format!("<a href=\"{}\">Found</a>.\n", HtmlEscape(location));
            let mut response = (StatusCode::FOUND, body).into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            response
        }
        Err(_) => {
            tracing::warn!(location = %location, "Redirect target is not a valid header value");
            bad_request()
        }
    }
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Bad request\n").into_response()
}

pub fn unauthorized(message: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, message).into_response()
}

pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed\n").into_response()
}

/// HTML page with the given status.
pub fn html_page(status: StatusCode, page: Vec<u8>) -> Response {
    let mut response = Response::new(Body::from(page));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}
