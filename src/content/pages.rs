//! Fallback path: content resolution plus page rendering.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;

use crate::backends::redirects::gitweb_shortcut;
use crate::content::resolver::ContentResolver;
use crate::http::request::decoded_path;
use crate::http::response::{bad_request, found, html_page};
use crate::template::Templates;

const GITWEB_SHORTCUT_PREFIX: &str = "gw/";

/// Serves every request no route claimed.
#[derive(Debug, Clone)]
pub struct ContentPages {
    resolver: ContentResolver,
    templates: Arc<Templates>,
    canonical_host: String,
    gitweb_repo: String,
}

impl ContentPages {
    pub fn new(
        resolver: ContentResolver,
        templates: Arc<Templates>,
        canonical_host: impl Into<String>,
        gitweb_repo: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            templates,
            canonical_host: canonical_host.into(),
            gitweb_repo: gitweb_repo.into(),
        }
    }

    pub async fn serve(&self, req: Request<Body>) -> Response {
        let Some(path) = decoded_path(&req) else {
            return bad_request();
        };
        let rel_path = path.strip_prefix('/').unwrap_or(&*path);

        if rel_path.contains("..") {
            return bad_request();
        }

        if let Some(target) = rel_path.strip_prefix(GITWEB_SHORTCUT_PREFIX) {
            return found(&gitweb_shortcut(&self.canonical_host, &self.gitweb_repo, target));
        }

        match self.resolver.resolve(rel_path).await {
            Ok(file) => {
                let title = file.title.as_deref().unwrap_or_default();
                let page = self.templates.render_page(title, "", &file.data);
                html_page(StatusCode::OK, page)
            }
            Err(e) if e.is_traversal() => bad_request(),
            Err(e) => {
                tracing::warn!(path = %rel_path, error = %e, "Content not found");
                let detail = self.templates.render_error(&e);
                let title = format!("File {}", e.page_path());
                let page = self.templates.render_page(&title, "", &detail);
                html_page(StatusCode::NOT_FOUND, page)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use http_body_util::BodyExt;
    use std::fs;

    fn pages() -> (tempfile::TempDir, ContentPages) {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(content.join("docs")).unwrap();
        fs::write(content.join("docs/index.html"), "<h1>Docs</h1><p>hi</p>").unwrap();
        let templates = Templates::from_sources(
            "[{{ title|html }}]{{ content }}".to_string(),
            "ERR {{ error|htmlesc }}".to_string(),
        )
        .unwrap();
        let pages = ContentPages::new(
            ContentResolver::new(content),
            Arc::new(templates),
            "camlistore.org",
            "camlistore.git",
        );
        (dir, pages)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_renders_page_with_title() {
        let (_dir, pages) = pages();
        let response = pages.serve(get("/docs/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "[Docs]<h1>Docs</h1><p>hi</p>");
    }

    #[tokio::test]
    async fn test_missing_page_uses_error_template() {
        let (_dir, pages) = pages();
        let response = pages.serve(get("/nonexistent/page")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let text = body(response).await;
        assert!(text.starts_with("[File nonexistent&#x2f;page]ERR "), "{}", text);
    }

    #[tokio::test]
    async fn test_traversal_is_bad_request() {
        let (_dir, pages) = pages();
        let response = pages.serve(get("/docs/../../etc/passwd")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_encoded_paths() {
        let (dir, pages) = pages();
        fs::write(dir.path().join("content/my page.html"), "<h1>Spaced</h1>x").unwrap();

        let response = pages.serve(get("/my%20page.html")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "[Spaced]<h1>Spaced</h1>x");

        for uri in ["/%2e%2e/secret", "/%ff.html"] {
            let response = pages.serve(get(uri)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_gitweb_shortcut() {
        let (_dir, pages) = pages();
        let response = pages.serve(get("/gw/server/go/main.go")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "http://camlistore.org/code/?p=camlistore.git;f=server/go/main.go;hb=master"
        );
    }
}
