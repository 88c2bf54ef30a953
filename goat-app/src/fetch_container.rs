//! A section whose content comes from a request.
//!
//! Rendering awaits the request, so this lives next to the controller rather
//! than in the synchronous component registry. A superseded request renders
//! the loading placeholder and a failed one renders the error view.

use serde_json::{json, Value};
use tracing::debug;

use goat::components::{error_node, loading_placeholder};
use goat::node::Node;

use crate::controller::AppController;
use crate::fetch::{FetchOptions, FetchOutcome};

#[derive(Debug, Clone)]
pub struct FetchContainer {
    name: String,
    url: String,
    options: FetchOptions,
    view: Option<Value>,
}

impl FetchContainer {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            options: FetchOptions::new(),
            view: None,
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Schema compiled with the response available as `$data/...`. Without
    /// one the response itself becomes the section content.
    pub fn with_view(mut self, view: Value) -> Self {
        self.view = Some(view);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn render(&self, app: &AppController) -> Node {
        match app.fetch(&self.url, self.options.clone()).await {
            FetchOutcome::Aborted => {
                debug!(name = %self.name, "fetch superseded, still loading");
                loading_placeholder(&self.name)
            }
            FetchOutcome::Failed(error) => error_node(&format!("Could not load {}", self.url), &error),
            FetchOutcome::Ok(data) => match &self.view {
                Some(view) => app.compile(view, &data),
                None => app.compile(&json!({ "name": self.name, "content": data }), &Value::Null),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::FetchError;
    use crate::fetch::{Request, Response, Transport};
    use async_trait::async_trait;
    use goat::html::to_html;
    use goat::node::RenderContext;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Canned {
        status: u16,
        text: &'static str,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, _request: Request) -> Result<Response, FetchError> {
            Ok(Response::new(self.status, self.text))
        }
    }

    fn app(dir: &TempDir, status: u16, text: &'static str) -> AppController {
        let config: AppConfig = serde_json::from_value(json!({
            "name": "docs",
            "api": "https://api.test/",
            "stateDir": dir.path(),
            "minLatencyMs": 0
        }))
        .unwrap();
        AppController::with_transport(config, Arc::new(Canned { status, text })).unwrap()
    }

    fn html(app: &AppController, node: &Node) -> String {
        to_html(node, &RenderContext::new(app.registry()))
    }

    #[tokio::test]
    async fn test_response_becomes_content() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, 200, r#"{"name": "terms", "tag": "p", "content": "Be nice"}"#);
        let node = FetchContainer::new("legal", "terms").render(&app).await;
        let out = html(&app, &node);
        assert!(out.contains(r#"class="legal-section""#));
        assert!(out.contains("Be nice"));
    }

    #[tokio::test]
    async fn test_view_reads_data() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, 200, r#"{"user": {"name": "Ada"}}"#);
        let container = FetchContainer::new("profile", "me")
            .with_view(json!({"name": "profile", "tag": "h2", "content": "$data/user/name"}));
        let out = html(&app, &container.render(&app).await);
        assert!(out.contains(">Ada</h2>"));
    }

    #[tokio::test]
    async fn test_failure_renders_error_view() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, 503, "");
        let node = FetchContainer::new("feed", "news").render(&app).await;
        assert!(html(&app, &node).contains("Could not load news"));
    }
}
