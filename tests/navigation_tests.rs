use std::sync::Arc;

use pagerouter::api::HttpApiClient;
use pagerouter::core::cache::{CacheOptions, CacheSlot, DEFAULT_STORAGE_KEY, slugify};
use pagerouter::core::config::RouterSettings;
use pagerouter::core::document::PageMetadata;
use pagerouter::core::lifecycle::{Announcement, LifecycleEvent, NavPhase, PopOutcome};
use pagerouter::core::nav_tree::NavigationTree;
use pagerouter::core::storage::{FileStorage, MemoryStorage, SessionStorage};
use pagerouter::host::memory::{
    EngineCall, MemoryComponents, MemoryDom, MemoryLocation, RecordingAnnouncer, RecordingEngine,
    StepAnimator,
};
use pagerouter::host::{Dom, Element};
use pagerouter::{Host, NavigationController};
use serde_json::{Value, json};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

// ============================================================================
// Helper Functions
// ============================================================================

const TREE: &str = r#"{"appTree": [
    {"collection": {"id": "idx-work", "fullUrl": "/work/"},
     "items": [{"collection": {"id": "proj-a", "fullUrl": "/work/a/"}}]},
    {"collection": {"id": "idx-about", "fullUrl": "/about/"}}
]}"#;

fn page(kind: &str, id: &str, body: &str) -> String {
    format!(
        r#"<!doctype html><html><head><title>{id}</title></head><body><main><div class="js-page" data-type="{kind}" data-id="{id}">{body}</div></main></body></html>"#
    )
}

struct Site {
    dom: Arc<MemoryDom>,
    location: Arc<MemoryLocation>,
    engine: Arc<RecordingEngine>,
    components: Arc<MemoryComponents>,
    announcer: Arc<RecordingAnnouncer>,
    controller: NavigationController,
}

/// Controller sitting on `pathname`, fetching from `base_url`.
fn site(base_url: &str, pathname: &str, page_meta: PageMetadata) -> Site {
    let dom = Arc::new(MemoryDom::new(NavigationTree::from_json(TREE).unwrap(), page_meta));
    let location = Arc::new(MemoryLocation::new(base_url, pathname));
    let engine = Arc::new(RecordingEngine::new());
    let components = Arc::new(MemoryComponents::new(["/work/a/"]));
    let announcer = Arc::new(RecordingAnnouncer::new());
    let host = Host {
        dom: dom.clone(),
        location: location.clone(),
        engine: engine.clone(),
        animator: Arc::new(StepAnimator::new(8)),
        components: components.clone(),
        announcer: announcer.clone(),
        api: Arc::new(HttpApiClient::new(base_url)),
    };
    let controller = NavigationController::new(host, RouterSettings::default()).unwrap();
    Site {
        dom,
        location,
        engine,
        components,
        announcer,
        controller,
    }
}

fn project_page() -> PageMetadata {
    PageMetadata::new().with("type", "collection").with("id", "proj-a")
}

// ============================================================================
// Bootstrapping
// ============================================================================

#[tokio::test]
async fn test_project_page_boot_hydrates_root_index() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work/"))
        .and(query_param("format", "html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page("index", "idx-work", "<ul>tiles</ul>")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut site = site(&mock_server.uri(), "/work/a/", project_page());
    site.controller.init().await.unwrap();
    site.controller.handle(LifecycleEvent::InitializedPage).unwrap();

    assert_eq!(site.controller.root(), "/work/");
    assert_eq!(site.dom.snapshot().root_href.as_deref(), Some("/work/"));
    assert_eq!(
        site.announcer.published(),
        vec![Announcement::RootFragmentReady("<ul>tiles</ul>".into())]
    );
    assert!(site.controller.is_popstate_bound());
}

#[tokio::test]
async fn test_unknown_page_roots_at_site_root() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("index", "home", "home")))
        .mount(&mock_server)
        .await;

    let meta = PageMetadata::new().with("type", "collection").with("id", "orphan");
    let mut site = site(&mock_server.uri(), "/orphan/", meta);
    site.controller.init().await.unwrap();

    assert_eq!(site.controller.root(), "/");
}

#[tokio::test]
async fn test_root_index_failure_is_reported() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let mut site = site(&mock_server.uri(), "/work/a/", project_page());
    let result = site.controller.init().await;

    assert!(result.is_err());
    assert!(site.announcer.published().is_empty());
    // Routing still works off the resolved root.
    site.controller.route(site.controller.root());
    assert_eq!(site.engine.calls(), vec![EngineCall::Route("/work/".into())]);
}

// ============================================================================
// Navigation cycles
// ============================================================================

#[tokio::test]
async fn test_cycle_swaps_content_and_expires_state() {
    let mock_server = MockServer::start().await;
    let mut site = site(
        &mock_server.uri(),
        "/",
        PageMetadata::new().with("type", "index").with("id", "home"),
    );
    site.controller.init().await.unwrap();
    site.controller.handle(LifecycleEvent::InitializedPage).unwrap();

    site.controller.set_state("scroll", json!(120));

    site.controller.route("/work/a/");
    site.controller.handle(LifecycleEvent::TransitionOut).unwrap();
    assert!(site.dom.has_class(Element::Html, "is-routing"));
    site.controller
        .handle(LifecycleEvent::RefreshDocument {
            response: page("collection", "proj-a", "<article>A</article>"),
        })
        .unwrap();
    site.controller.handle(LifecycleEvent::TransitionIn).unwrap();

    assert!(!site.dom.has_class(Element::Html, "is-routing"));
    assert_eq!(site.dom.snapshot().page_markup, "<article>A</article>");
    assert_eq!(site.controller.page_metadata().id(), Some("proj-a"));
    assert_eq!(site.controller.phase(), NavPhase::Idle);
    assert_eq!(site.controller.get_state("scroll"), Some(&json!(120)));

    site.controller.push("/work/", || {});
    assert_eq!(site.controller.get_state("scroll"), None);
    assert_eq!(
        site.engine.calls(),
        vec![
            EngineCall::Route("/work/a/".into()),
            EngineCall::Silent("/work/".into())
        ]
    );
}

#[tokio::test]
async fn test_back_and_forward() {
    let mock_server = MockServer::start().await;
    let mut site = site(
        &mock_server.uri(),
        "/",
        PageMetadata::new().with("type", "index").with("id", "home"),
    );
    site.controller.init().await.unwrap();
    site.controller.handle(LifecycleEvent::InitializedPage).unwrap();

    // Forward into a project.
    site.location.set_pathname("/work/a/");
    assert_eq!(
        site.controller.handle_popstate(),
        PopOutcome::Detail {
            path: "/work/a/".into(),
            opened: true
        }
    );

    // Back out to the root: the detail view ends, but no extra route happens.
    site.location.set_pathname("/");
    assert_eq!(
        site.controller.handle_popstate(),
        PopOutcome::Simple {
            identifier: "garberco".into()
        }
    );
    assert_eq!(site.announcer.published(), vec![Announcement::DetailViewEnded]);
    assert!(site.engine.calls().is_empty());
    assert_eq!(site.dom.snapshot().main_id.as_deref(), Some("is-main--garberco"));
    assert_eq!(site.components.gallery_closes(), 2);
}

#[tokio::test]
async fn test_same_target_scrolls_root_panel() {
    let mock_server = MockServer::start().await;
    let mut site = site(
        &mock_server.uri(),
        "/work/",
        PageMetadata::new().with("type", "index").with("id", "idx-work"),
    );
    site.controller.init().await.unwrap();
    site.dom.set_root_panel_scroll_top(900.0);

    site.controller.handle(LifecycleEvent::SameTarget).unwrap();

    assert_eq!(site.dom.root_panel_scroll_top(), 0.0);
    assert!(!site.controller.is_scrolling());
}

#[tokio::test]
async fn test_full_index_payload() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work/"))
        .and(query_param("format", "json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"collection":{"id":"idx-work"},"items":[1,2]}"#),
        )
        .mount(&mock_server)
        .await;

    let mut site = site(
        &mock_server.uri(),
        "/work/",
        PageMetadata::new().with("type", "index").with("id", "idx-work"),
    );
    site.controller.init().await.unwrap();

    let mut items: Option<Value> = None;
    site.controller
        .load_full_index(|payload| items = payload.get("items").cloned())
        .await
        .unwrap();
    assert_eq!(items, Some(json!([1, 2])));
}

// ============================================================================
// Cache over real storage backends
// ============================================================================

#[test]
fn test_cache_round_trips_through_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let slot = CacheSlot::new();
    let cache = slot.get_or_init(CacheOptions::default(), storage.clone()).unwrap();

    cache.set("Some Key!", json!({"a": 1})).unwrap();

    let raw = storage.get_item(DEFAULT_STORAGE_KEY).unwrap();
    let stored: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored[slugify("Some Key!")], json!({"a": 1}));
}

#[test]
fn test_cache_scenario_returns_unmutated_copy() {
    let slot = CacheSlot::new();
    let cache = slot
        .get_or_init(CacheOptions::default(), Arc::new(MemoryStorage::new()))
        .unwrap();

    cache.set("Foo Bar", json!([1, 2, 3])).unwrap();
    let mut first = cache.get(Some("Foo Bar")).unwrap();
    first.as_array_mut().unwrap().clear();

    assert_eq!(cache.get(Some("Foo Bar")), Some(json!([1, 2, 3])));
}

#[test]
fn test_cache_in_memory_only_when_probe_fails() {
    let storage = Arc::new(MemoryStorage::rejecting());
    let slot = CacheSlot::new();
    let cache = slot.get_or_init(CacheOptions::default(), storage.clone()).unwrap();
    let writes_after_probe = storage.write_count();

    cache.set("k", json!("v")).unwrap();
    cache.save().unwrap();

    assert!(!cache.is_storage_supported());
    assert_eq!(storage.write_count(), writes_after_probe);
    assert_eq!(cache.get(Some("k")), Some(json!("v")));
}
