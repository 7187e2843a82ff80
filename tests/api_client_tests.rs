use pagerouter::api::{ApiClient, ApiError, Format, HttpApiClient};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

// ============================================================================
// HTML collection fetches
// ============================================================================

#[tokio::test]
async fn test_collection_html_sends_format_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/work/"))
        .and(query_param("format", "html"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<div class=\"js-page\">grid</div>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpApiClient::new(mock_server.uri());
    let body = client.collection("/work/", Format::Html).await.unwrap();

    assert_eq!(body, "<div class=\"js-page\">grid</div>");
}

#[tokio::test]
async fn test_collection_json_sends_format_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":[]}"#))
        .mount(&mock_server)
        .await;

    // Trailing slash on the base URL must not double up.
    let client = HttpApiClient::new(format!("{}/", mock_server.uri()));
    let body = client.collection("/", Format::Json).await.unwrap();

    assert_eq!(body, r#"{"items":[]}"#);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_collection_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let client = HttpApiClient::new(mock_server.uri());
    let result = client.collection("/missing/", Format::Html).await;

    match result {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_collection_network_error() {
    // Grab a free port, then release it so nothing is listening there.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let client = HttpApiClient::new(format!("http://{addr}"));
    let result = client.collection("/work/", Format::Html).await;

    assert!(matches!(result, Err(ApiError::Network(_))));
}
