//! Page and error template rendering.
//!
//! Templates run with auto-escaping off, so `{{ content }}` writes the page
//! body raw. Authors opt into escaping per fragment:
//!
//! - `{{ value|html }}` formats any value as text and HTML-escapes it
//! - `{{ value|htmlesc }}` escapes string or byte content
//!
//! Pre-rendered HTML (page bodies, rendered error fragments) is therefore
//! embedded once without double-escaping.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::value::Value;
use minijinja::{context, AutoEscape, Environment, HtmlEscape};
use thiserror::Error;

pub const PAGE_TEMPLATE: &str = "page.html";
pub const ERROR_TEMPLATE: &str = "error.html";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("ReadFile {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// The two templates every response page is built from.
pub struct Templates {
    env: Environment<'static>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}

impl Templates {
    /// Read `page.html` and `error.html` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| TemplateError::Read { path, source })
        };
        Self::from_sources(read(PAGE_TEMPLATE)?, read(ERROR_TEMPLATE)?)
    }

    /// Build from in-memory template sources.
    pub fn from_sources(page: String, error: String) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        // Both names escape the value's text form.
        env.add_filter("html", escape_filter);
        env.add_filter("htmlesc", escape_filter);

        for (name, source) in [(PAGE_TEMPLATE, page), (ERROR_TEMPLATE, error)] {
            env.add_template_owned(name, source)
                .map_err(|source| TemplateError::Parse {
                    name: name.to_string(),
                    source,
                })?;
        }

        Ok(Self { env })
    }

    /// Render the page template. `content` is trusted HTML and is written raw.
    ///
    /// Templates produce text, so content that is not UTF-8 has its invalid
    /// sequences replaced with U+FFFD.
    pub fn render_page(&self, title: &str, subtitle: &str, content: &[u8]) -> Vec<u8> {
        let content = match std::str::from_utf8(content) {
            Ok(text) => text.to_string(),
            Err(e) => {
                tracing::warn!(
                    title = %title,
                    valid_up_to = e.valid_up_to(),
                    "Page content is not UTF-8, replacing invalid bytes"
                );
                String::from_utf8_lossy(content).into_owned()
            }
        };
        let content = Value::from_safe_string(content);
        self.apply(
            PAGE_TEMPLATE,
            context! {
                title => title,
                subtitle => subtitle,
                content => content,
            },
        )
    }

    /// Render the error template for `err`.
    ///
    /// The error text may contain absolute file-system paths; the template
    /// decides how it is escaped.
    pub fn render_error(&self, err: &dyn Display) -> Vec<u8> {
        self.apply(ERROR_TEMPLATE, context! { error => err.to_string() })
    }

    /// Execute a template into a buffer. Execution errors are logged and
    /// whatever was written before the failure is returned.
    fn apply(&self, name: &str, ctx: Value) -> Vec<u8> {
        let mut buf = Vec::new();
        let result = self
            .env
            .get_template(name)
            .and_then(|tmpl| tmpl.render_to_write(ctx, &mut buf).map(|_| ()));
        if let Err(e) = result {
            tracing::error!(template = name, error = %e, "Template execution failed");
        }
        buf
    }
}

/// Text form of a value: strings and bytes verbatim, anything else formatted.
fn text_of(value: &Value) -> String {
    if let Some(s) = value.as_str() {
        return s.to_string();
    }
    if let Some(bytes) = value.as_bytes() {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    value.to_string()
}

fn escape_filter(value: Value) -> Value {
    Value::from_safe_string(HtmlEscape(&text_of(&value)).to_string())
}
