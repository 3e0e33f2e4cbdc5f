//! Tests for the figshare HTTP backend against a mock API server.
//!
//! The backend uses a blocking client, so every call runs inside
//! `spawn_blocking` while the mock server keeps serving on the runtime.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use figshare_oai_harvester::config::ApiConfig;
use figshare_oai_harvester::dates::{DateOptions, HarvestWindow};
use figshare_oai_harvester::filter::translate;
use figshare_oai_harvester::{
    Catalog, CatalogConfig, CatalogError, FigshareClient, HarvestCatalog, ListRequest,
    SearchBackend,
};

fn api(base_url: String) -> ApiConfig {
    ApiConfig {
        base_url,
        token: Some("test-token".to_string()),
        timeout_secs: 5,
        retries: 1,
    }
}

fn article_json(id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Tide gauges",
        "description": "Hourly sea level",
        "citation": "Doe (2020): Tide gauges. figshare.",
        "defined_type_name": "dataset",
        "url_public_html": format!("https://figshare.com/articles/dataset/{id}"),
        "timeline": {"revision": "2020-04-01T08:00:00"}
    })
}

#[tokio::test]
async fn test_search_posts_query_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/articles/search"))
        .and(header("authorization", "token test-token"))
        .and(body_partial_json(json!({
            "search_for": ":group: Oceanography",
            "page": 2,
            "page_size": 5,
            "order": "modified_date",
            "order_direction": "desc",
            "modified_since": "2020-01-01"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, "junk", {"id": 2}])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    let items = tokio::task::spawn_blocking(move || {
        let client = FigshareClient::new(&api(base_url))?;
        let window = HarvestWindow::from_args(Some("2020-01-01"), None, &DateOptions::default())?;
        let query = translate(Some(":group: Oceanography"), window, "", None);
        client.search(&query, 2, 5)
    })
    .await
    .expect("task completes")
    .expect("search succeeds");

    let ids: Vec<Option<u64>> = items.iter().map(|i| i.id()).collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
}

#[tokio::test]
async fn test_article_found_and_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/articles/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(article_json(7)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/8"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    let (found, missing) = tokio::task::spawn_blocking(move || {
        let client = FigshareClient::new(&api(base_url))?;
        Ok::<_, CatalogError>((client.article(7)?, client.article(8)?))
    })
    .await
    .expect("task completes")
    .expect("requests succeed");

    assert_eq!(found.and_then(|item| item.id()), Some(7));
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_client_error_is_upstream_with_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/articles/search"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid search_for"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let client = FigshareClient::new(&api(base_url))?;
        client.search(&translate(None, HarvestWindow::unbounded(), "", None), 1, 10)
    })
    .await
    .expect("task completes");

    match result {
        Err(CatalogError::Upstream(message)) => {
            assert!(message.contains("400"));
            assert!(message.contains("Invalid search_for"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/articles/3"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(article_json(3)))
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    let item = tokio::task::spawn_blocking(move || {
        FigshareClient::new(&api(base_url))?.article(3)
    })
    .await
    .expect("task completes")
    .expect("retry succeeds");

    assert_eq!(item.and_then(|i| i.id()), Some(3));
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/articles/3"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let base_url = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || {
        FigshareClient::new(&api(base_url))?.article(3)
    })
    .await
    .expect("task completes");

    let err = result.expect_err("all attempts fail");
    assert!(matches!(err, CatalogError::RetriesExhausted { attempts: 2, .. }));
    assert!(err.is_upstream());
    assert_eq!(err.oai_code(), None);
}

#[tokio::test]
async fn test_catalog_over_http_backend() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/articles/search"))
        .and(body_partial_json(json!({"page": 1, "page_size": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 11}, {"id": 12}])))
        .mount(&mock_server)
        .await;
    for id in [11, 12] {
        Mock::given(method("GET"))
            .and(path(format!("/articles/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(article_json(id)))
            .mount(&mock_server)
            .await;
    }

    let base_url = mock_server.uri();
    let list = tokio::task::spawn_blocking(move || {
        let config = CatalogConfig::new("figshare.example.org")
            .with_max_list_size(2)
            .with_api_base_url(base_url);
        let client = FigshareClient::new(&config.api)?;
        let catalog = Catalog::new(config, client)?;
        catalog.list_records(&ListRequest::new("oai_dc"))
    })
    .await
    .expect("task completes")
    .expect("listing succeeds");

    assert_eq!(list.records.len(), 2);
    assert_eq!(
        list.records[1].header.identifier,
        "oai:figshare.example.org:article/12"
    );
    assert!(list.ticket.is_some());
    assert!(list.records[0].metadata.contains("<dc:title>Tide gauges</dc:title>"));
}
