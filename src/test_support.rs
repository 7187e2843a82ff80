//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{ApiClient, ApiError, Format};
use crate::core::document::PageMetadata;
use crate::core::nav_tree::NavigationTree;
use crate::core::router::Host;
use crate::host::memory::{
    MemoryComponents, MemoryDom, MemoryLocation, RecordingAnnouncer, RecordingEngine, StepAnimator,
};

pub const ORIGIN: &str = "https://garber.test";

/// Canned API responses keyed by `(path, format)`. Anything else is a 404.
#[derive(Default)]
pub struct StaticApi {
    responses: HashMap<(String, Format), String>,
}

impl StaticApi {
    pub fn with(mut self, path: &str, format: Format, body: impl Into<String>) -> Self {
        self.responses.insert((path.to_string(), format), body.into());
        self
    }
}

#[async_trait]
impl ApiClient for StaticApi {
    async fn collection(&self, path: &str, format: Format) -> Result<String, ApiError> {
        self.responses
            .get(&(path.to_string(), format))
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                body: format!("no fixture for {path}"),
            })
    }
}

/// A tree where `/work/` owns `proj-a` and `proj-b`.
pub fn sample_tree() -> NavigationTree {
    NavigationTree::from_json(
        r#"{"appTree": [
            {"collection": {"id": "idx-work", "fullUrl": "/work/"},
             "items": [
                {"collection": {"id": "proj-a", "fullUrl": "/work/a/"}},
                {"collection": {"id": "proj-b", "fullUrl": "/work/b/"}}
             ]}
        ]}"#,
    )
    .expect("sample tree is valid JSON")
}

/// A full document with a `.js-page` container.
pub fn page_html(kind: &str, id: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>Page {id}</title></head><body><div class="js-page" data-type="{kind}" data-id="{id}">{body}</div></body></html>"#
    )
}

/// Concrete in-memory collaborators, kept typed so tests can inspect them.
pub struct TestHost {
    pub dom: Arc<MemoryDom>,
    pub location: Arc<MemoryLocation>,
    pub engine: Arc<RecordingEngine>,
    pub animator: Arc<StepAnimator>,
    pub components: Arc<MemoryComponents>,
    pub announcer: Arc<RecordingAnnouncer>,
    pub api: Arc<StaticApi>,
}

impl TestHost {
    pub fn with_parts(
        dom: Arc<MemoryDom>,
        pathname: &str,
        components: Arc<MemoryComponents>,
        announcer: Arc<RecordingAnnouncer>,
    ) -> Self {
        Self {
            dom,
            location: Arc::new(MemoryLocation::new(ORIGIN, pathname)),
            engine: Arc::new(RecordingEngine::new()),
            animator: Arc::new(StepAnimator::new(4)),
            components,
            announcer,
            api: Arc::new(StaticApi::default()),
        }
    }

    fn on_page(pathname: &str, page: PageMetadata) -> Self {
        Self::with_parts(
            Arc::new(MemoryDom::new(sample_tree(), page)),
            pathname,
            Arc::new(MemoryComponents::new(["/work/a/", "/work/b/"])),
            Arc::new(RecordingAnnouncer::new()),
        )
    }

    /// Sitting on an index page at `pathname`.
    pub fn index(pathname: &str) -> Self {
        Self::on_page(pathname, PageMetadata::new().with("type", "index").with("id", "idx"))
    }

    /// Sitting on a collection page with the given id.
    pub fn collection(pathname: &str, id: &str) -> Self {
        Self::on_page(
            pathname,
            PageMetadata::new().with("type", "collection").with("id", id),
        )
    }

    /// Index page whose animator parks tweens until `finish_all`.
    pub fn holding_animator(pathname: &str) -> Self {
        let mut host = Self::index(pathname);
        host.animator = Arc::new(StepAnimator::holding(4));
        host
    }

    pub fn with_api(mut self, api: StaticApi) -> Self {
        self.api = Arc::new(api);
        self
    }

    pub fn host(&self) -> Host {
        Host {
            dom: self.dom.clone(),
            location: self.location.clone(),
            engine: self.engine.clone(),
            animator: self.animator.clone(),
            components: self.components.clone(),
            announcer: self.announcer.clone(),
            api: self.api.clone(),
        }
    }
}
