//! Lazy fragment loading and enrichment of search results.

use pagefind_bridge::testing::{EngineScript, ScriptedLoader};
use pagefind_client::{ClientOptions, PagefindClient, SearchError, SearchOptions};
use serde_json::json;
use wiremock::MockServer;

use crate::helpers::{gzip, missing, options, serve, serve_index, signed, words};

fn guide_fragment() -> Vec<u8> {
    let fragment = json!({
        "url": "/guide/",
        "content": words(),
        "word_count": 30,
        "filters": {"tag": ["rust"]},
        "meta": {"title": "Guide"},
        "anchors": [
            {"element": "h2", "id": "install", "text": "Install", "location": 10}
        ]
    });
    gzip(&signed(fragment.to_string().as_bytes()))
}

async fn client(server: &MockServer, response: &str) -> PagefindClient {
    serve_index(server).await;
    let loader = ScriptedLoader::new(EngineScript {
        search_response: response.into(),
        ..Default::default()
    });
    let options = ClientOptions {
        base_url: "/docs/".into(),
        highlight_param: Some("hl".into()),
        ..options(server)
    };
    PagefindClient::initialize(options, &loader)
        .await
        .expect("init")
}

#[tokio::test]
async fn resolve_builds_excerpt_and_sub_results() {
    let server = MockServer::start().await;
    serve(&server, "fragment/en_p1.pf_fragment", guide_fragment(), 1).await;
    let client = client(&server, "1:en_p1@1@24>1>2,24>1>12:__PF_UNFILTERED_DELIM__").await;

    let response = client
        .search("Rust", &SearchOptions::default())
        .await
        .expect("search");
    let page = response.results[0].resolve().await.expect("resolve");

    assert_eq!(page.url, "/docs/guide/?hl=rust");
    assert_eq!(page.raw_url, "/guide/");
    assert_eq!(page.title(), Some("Guide"));
    assert_eq!(page.filters["tag"], vec!["rust"]);
    assert_eq!(page.locations, vec![2, 12]);
    assert_eq!(page.excerpt, "w1 <mark>w2</mark> w3 w4");

    assert_eq!(page.sub_results.len(), 2);
    let preamble = &page.sub_results[0];
    assert_eq!(preamble.title, "Guide");
    assert_eq!(preamble.url, "/docs/guide/?hl=rust");
    assert_eq!(preamble.excerpt, "w0 w1 <mark>w2</mark> w3");
    let install = &page.sub_results[1];
    assert_eq!(install.title, "Install");
    assert_eq!(install.url, "/docs/guide/?hl=rust#install");
    assert_eq!(install.locations, vec![12]);
    assert_eq!(install.excerpt, "w10 w11 <mark>w12</mark> w13");
}

#[tokio::test]
async fn fragments_load_only_when_resolved() {
    let server = MockServer::start().await;
    serve(&server, "fragment/en_p1.pf_fragment", guide_fragment(), 0).await;
    let client = client(&server, "1:en_p1@1@24>1>2:__PF_UNFILTERED_DELIM__").await;

    let response = client
        .search("rust", &SearchOptions::default())
        .await
        .expect("search");

    assert_eq!(response.results.len(), 1);
}

#[tokio::test]
async fn shared_fragment_is_fetched_once_and_enriched_per_result() {
    let server = MockServer::start().await;
    serve(&server, "fragment/en_p1.pf_fragment", guide_fragment(), 1).await;
    let client = client(
        &server,
        "2:en_p1@1@24>1>2 en_p1@0.5@24>1>25:__PF_UNFILTERED_DELIM__",
    )
    .await;

    let response = client
        .search("rust", &SearchOptions::default())
        .await
        .expect("search");
    let (first, second) = tokio::join!(
        response.results[0].resolve(),
        response.results[1].resolve()
    );
    let (first, second) = (first.expect("first"), second.expect("second"));

    assert_eq!(first.excerpt, "w0 w1 <mark>w2</mark> w3");
    assert_eq!(second.excerpt, "w24 <mark>w25</mark> w26 w27");
    assert_eq!(second.sub_results[0].title, "Install");

    let again = response.results[0].resolve().await.expect("again");
    assert_eq!(again, first);
}

#[tokio::test]
async fn missing_fragment_fails_resolve_only() {
    let server = MockServer::start().await;
    missing(&server, "fragment/en_gone.pf_fragment").await;
    let client = client(&server, "1:en_gone@1@24>1>0:__PF_UNFILTERED_DELIM__").await;

    let response = client
        .search("rust", &SearchOptions::default())
        .await
        .expect("search");
    let err = response.results[0].resolve().await.unwrap_err();

    assert!(matches!(err, SearchError::ChunkFetch(_)));
    assert!(err.to_string().contains("en_gone.pf_fragment"));
}
