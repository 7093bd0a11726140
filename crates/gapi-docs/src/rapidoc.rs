//! RapiDoc documentation page.
//!
//! The page loads RapiDoc from a CDN and points it at the spec endpoint:
//!
//! ```
//! use gapi_docs::RapiDoc;
//!
//! let page = RapiDoc::new("/openapi.json").title("Users API");
//! assert!(page.html().contains(r#"spec-url="/openapi.json""#));
//! ```

use bytes::Bytes;

/// RapiDoc page configuration.
#[derive(Debug, Clone)]
pub struct RapiDoc {
    spec_url: String,
    title: String,
    favicon_url: Option<String>,
    theme: RapiDocTheme,
}

/// Colors of the RapiDoc page.
#[derive(Debug, Clone)]
pub struct RapiDocTheme {
    /// `light` or `dark`.
    pub mode: String,
    /// Accent color (hex).
    pub primary_color: String,
    /// Background color (hex).
    pub bg_color: String,
    /// Text color (hex).
    pub text_color: String,
}

impl Default for RapiDocTheme {
    fn default() -> Self {
        Self {
            mode: "dark".to_string(),
            primary_color: "#f54c47".to_string(),
            bg_color: "#222c3d".to_string(),
            text_color: "#fff".to_string(),
        }
    }
}

impl RapiDoc {
    /// Creates a page loading the document served at `spec_url`.
    #[must_use]
    pub fn new(spec_url: impl Into<String>) -> Self {
        Self {
            spec_url: spec_url.into(),
            title: "API Documentation".to_string(),
            favicon_url: None,
            theme: RapiDocTheme::default(),
        }
    }

    /// Set the page title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the favicon URL.
    #[must_use]
    pub fn favicon(mut self, url: impl Into<String>) -> Self {
        self.favicon_url = Some(url.into());
        self
    }

    /// Set the theme.
    #[must_use]
    pub fn theme(mut self, theme: RapiDocTheme) -> Self {
        self.theme = theme;
        self
    }

    /// URL of the OpenAPI document.
    #[must_use]
    pub fn spec_url(&self) -> &str {
        &self.spec_url
    }

    /// Renders the page.
    #[must_use]
    pub fn html(&self) -> String {
        let favicon = self
            .favicon_url
            .as_deref()
            .map(|url| {
                format!(
                    r#"<link rel="icon" type="image/x-icon" href="{}">"#,
                    html_escape(url)
                )
            })
            .unwrap_or_default();

        format!(
            r##"<!doctype html>
<html>
<head>
  <title>{title}</title>
  {favicon}
  <meta charset="utf-8">
  <style>
    rapi-doc::part(section-navbar-item section-navbar-tag) {{
      color: var(--primary-color);
    }}
  </style>
  <script type="module" src="https://unpkg.com/rapidoc/dist/rapidoc-min.js"></script>
</head>
<body>
  <rapi-doc
    spec-url="{spec_url}"
    theme="{mode}"
    primary-color="{primary_color}"
    bg-color="{bg_color}"
    text-color="{text_color}"
    show-header="false"
    render-style="read"
    schema-style="table"
  > </rapi-doc>
</body>
</html>"##,
            title = html_escape(&self.title),
            favicon = favicon,
            spec_url = html_escape(&self.spec_url),
            mode = self.theme.mode,
            primary_color = self.theme.primary_color,
            bg_color = self.theme.bg_color,
            text_color = self.theme.text_color,
        )
    }

    /// Renders the page as a response body.
    #[must_use]
    pub fn html_bytes(&self) -> Bytes {
        Bytes::from(self.html())
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_generation() {
        let html = RapiDoc::new("/openapi.json").title("Users").html();
        assert!(html.contains("<!doctype html>"));
        assert!(html.contains("<title>Users</title>"));
        assert!(html.contains(r#"spec-url="/openapi.json""#));
        assert!(html.contains(r#"theme="dark""#));
        assert!(!html.contains("rel=\"icon\""));
    }

    #[test]
    fn test_favicon() {
        let html = RapiDoc::new("/openapi.json")
            .favicon("https://example.com/icon.ico")
            .html();
        assert!(html.contains(r#"href="https://example.com/icon.ico""#));
    }

    #[test]
    fn test_title_is_escaped() {
        let html = RapiDoc::new("/spec").title("<script>").html();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<title><script>"));
    }

    #[test]
    fn test_custom_theme() {
        let page = RapiDoc::new("/spec").theme(RapiDocTheme {
            mode: "light".to_string(),
            primary_color: "#123456".to_string(),
            ..RapiDocTheme::default()
        });
        let html = page.html();
        assert!(html.contains("#123456"));
        assert!(html.contains(r#"theme="light""#));
        assert!(!page.html_bytes().is_empty());
        assert_eq!(page.spec_url(), "/spec");
    }
}
