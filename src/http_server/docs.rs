//! # API Documentation
//!
//! Serves an interactive Swagger UI page under `/docs` and the OpenAPI
//! document it renders under `/docs/openapi.json`.
//!
//! The document is either generated from the annotated handlers in this
//! crate ([`ApiDoc`]) or loaded from an external JSON file supplied at
//! startup. The page pulls the Swagger UI bundle from the CDN.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::OpenApi;

use super::errors::{not_found, ErrorEnvelope};

/// Route of the OpenAPI document, relative to the docs mount point
pub const SPEC_ROUTE: &str = "/openapi.json";

const SWAGGER_UI_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/4.15.5";

/// Generated OpenAPI document for the routes this crate owns
#[derive(OpenApi)]
#[openapi(
    info(
        title = "The Cookies API",
        description = "REST API server. Business routes live under `/v1`."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(super::routes::ping),
    components(schemas(ErrorEnvelope)),
    tags(
        (name = "health", description = "Liveness checks")
    )
)]
pub struct ApiDoc;

/// How the operation list is expanded on load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocExpansion {
    List,
    Full,
    None,
}

/// Options handed to `SwaggerUIBundle`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwaggerOptions {
    pub persist_authorization: bool,
    pub display_request_duration: bool,
    pub doc_expansion: DocExpansion,
    pub filter: bool,
    pub show_extensions: bool,
    pub show_common_extensions: bool,
}

impl Default for SwaggerOptions {
    fn default() -> Self {
        Self {
            persist_authorization: true,
            display_request_duration: true,
            doc_expansion: DocExpansion::None,
            filter: true,
            show_extensions: true,
            show_common_extensions: true,
        }
    }
}

/// Page-level customisation of the docs UI
#[derive(Debug, Clone)]
pub struct DocsPage {
    pub site_title: String,
    pub favicon: String,
    pub custom_css: String,
    pub options: SwaggerOptions,
}

impl Default for DocsPage {
    fn default() -> Self {
        Self {
            site_title: "The Cookies API Documentation".to_string(),
            favicon: "/favicon.ico".to_string(),
            custom_css: ".swagger-ui .topbar { display: none }".to_string(),
            options: SwaggerOptions::default(),
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

impl DocsPage {
    /// Render the HTML page pointing Swagger UI at `spec_url`
    pub fn render(&self, spec_url: &str) -> String {
        let mut config =
            serde_json::to_value(&self.options).unwrap_or_else(|_| Value::Object(Map::new()));
        if let Value::Object(map) = &mut config {
            map.insert("url".to_string(), Value::String(spec_url.to_string()));
            map.insert("dom_id".to_string(), Value::String("#swagger-ui".to_string()));
        }
        // Keep the inline script from being closed early by the payload.
        let config = config.to_string().replace("</", "<\\/");

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <link rel="icon" href="{favicon}">
  <link rel="stylesheet" href="{cdn}/swagger-ui.min.css">
  <link rel="stylesheet" href="{cdn}/swagger-ui-standalone-preset.min.css">
  <style>{css}</style>
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="{cdn}/swagger-ui-bundle.min.js"></script>
  <script src="{cdn}/swagger-ui-standalone-preset.min.js"></script>
  <script>
    window.onload = function () {{
      var config = {config};
      config.presets = [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset];
      config.plugins = [SwaggerUIBundle.plugins.DownloadUrl];
      config.layout = "StandaloneLayout";
      window.ui = SwaggerUIBundle(config);
    }};
  </script>
</body>
</html>
"#,
            title = escape_html(&self.site_title),
            favicon = escape_html(&self.favicon),
            cdn = SWAGGER_UI_CDN,
            css = self.custom_css.replace("</", "<\\/"),
            config = config,
        )
    }
}

/// Where the OpenAPI document comes from
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SpecSource {
    Generated(utoipa::openapi::OpenApi),
    External(Value),
}

/// Errors loading an external OpenAPI document
#[derive(Debug, thiserror::Error)]
pub enum DocsError {
    #[error("Failed to read OpenAPI document {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("OpenAPI document {path} is not valid JSON: {reason}")]
    Parse { path: String, reason: String },
}

/// Documentation served by the pipeline
#[derive(Debug, Clone)]
pub struct ApiDocs {
    spec: SpecSource,
    page: DocsPage,
}

impl ApiDocs {
    /// Docs for the generated document
    pub fn generated() -> Self {
        Self {
            spec: SpecSource::Generated(ApiDoc::openapi()),
            page: DocsPage::default(),
        }
    }

    /// Docs for an already-parsed external document
    pub fn external(spec: Value) -> Self {
        Self {
            spec: SpecSource::External(spec),
            page: DocsPage::default(),
        }
    }

    /// Load an external JSON document from disk
    pub fn from_file(path: &Path) -> Result<Self, DocsError> {
        let shown = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| DocsError::Read {
            path: shown.clone(),
            reason: e.to_string(),
        })?;
        let spec: Value = serde_json::from_str(&content).map_err(|e| DocsError::Parse {
            path: shown,
            reason: e.to_string(),
        })?;
        Ok(Self::external(spec))
    }

    pub fn with_page(mut self, page: DocsPage) -> Self {
        self.page = page;
        self
    }

    pub fn spec(&self) -> &SpecSource {
        &self.spec
    }

    pub fn page(&self) -> &DocsPage {
        &self.page
    }
}

impl Default for ApiDocs {
    fn default() -> Self {
        Self::generated()
    }
}

struct DocsState {
    spec: SpecSource,
    html: String,
}

async fn docs_page(State(state): State<Arc<DocsState>>) -> Html<String> {
    Html(state.html.clone())
}

async fn docs_spec(State(state): State<Arc<DocsState>>) -> Response {
    Json(&state.spec).into_response()
}

/// Routes serving the docs under `mount` (e.g. `/docs`)
///
/// Answers `mount/openapi.json` with the document and `mount` or any other
/// path below it with the page. Other methods on these paths go to the
/// not-found fallback.
pub fn docs_routes(docs: ApiDocs, mount: &str) -> Router {
    let mount = mount.trim_end_matches('/');
    let spec_url = format!("{}{}", mount, SPEC_ROUTE);
    let state = Arc::new(DocsState {
        html: docs.page.render(&spec_url),
        spec: docs.spec,
    });

    Router::new()
        .route(mount, get(docs_page).fallback(not_found))
        .route(&format!("{}/", mount), get(docs_page).fallback(not_found))
        .route(&format!("{}/index.html", mount), get(docs_page).fallback(not_found))
        .route(&spec_url, get(docs_spec).fallback(not_found))
        .route(&format!("{}/*rest", mount), get(docs_page).fallback(not_found))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_contains_title_and_options() {
        let html = DocsPage::default().render("/docs/openapi.json");

        assert!(html.contains("<title>The Cookies API Documentation</title>"));
        assert!(html.contains(r#""url":"/docs/openapi.json""#));
        assert!(html.contains(r#""persistAuthorization":true"#));
        assert!(html.contains(r#""displayRequestDuration":true"#));
        assert!(html.contains(r#""docExpansion":"none""#));
        assert!(html.contains(r#""filter":true"#));
        assert!(html.contains(r#""showExtensions":true"#));
        assert!(html.contains(r#""showCommonExtensions":true"#));
        assert!(html.contains(".swagger-ui .topbar { display: none }"));
        assert!(html.contains(r#"href="/favicon.ico""#));
    }

    #[test]
    fn test_title_is_escaped() {
        let page = DocsPage {
            site_title: "<script>alert(1)</script>".to_string(),
            ..DocsPage::default()
        };
        let html = page.render("/docs/openapi.json");
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<title><script>"));
    }

    #[test]
    fn test_generated_document_lists_liveness_route() {
        let spec = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(spec["info"]["title"], "The Cookies API");
        assert!(spec["paths"]["/"]["get"].is_object());
        assert!(spec["components"]["schemas"]["ErrorEnvelope"].is_object());
    }

    #[test]
    fn test_external_document_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openapi.json");
        std::fs::write(&path, r#"{"openapi":"3.0.0","info":{"title":"ext","version":"1"}}"#)
            .unwrap();

        let docs = ApiDocs::from_file(&path).unwrap();
        let value = serde_json::to_value(docs.spec()).unwrap();
        assert_eq!(value["info"]["title"], "ext");
    }

    #[test]
    fn test_external_document_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ApiDocs::from_file(&dir.path().join("missing.json")),
            Err(DocsError::Read { .. })
        ));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            ApiDocs::from_file(&path),
            Err(DocsError::Parse { .. })
        ));
    }
}
