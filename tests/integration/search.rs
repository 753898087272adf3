//! The search pipeline end to end.

use std::time::Duration;

use pagefind_bridge::testing::{EngineScript, ScriptedLoader, SearchCall};
use pagefind_bridge::BridgeError;
use pagefind_client::{ClientOptions, PagefindClient, SearchError, SearchOptions, Sort};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{available, gzip, missing, options, serve, serve_index, signed};

const RESPONSE: &str = "7:en_p1@1.5@48>1>3,24>0.5>9 en_p2@0.5@24>1>0:tag:rust:2\
                        __PF_UNFILTERED_DELIM__tag:rust:5__PF_VALUE_DELIM__go:2";

fn script() -> EngineScript {
    EngineScript {
        index_hashes: "en_a en_b".into(),
        filter_hashes: "en_f".into(),
        search_response: RESPONSE.into(),
        ..Default::default()
    }
}

/// Serve the two index chunks and the filter chunk, each fetched once.
async fn serve_chunks(server: &MockServer) {
    serve(server, "index/en_a.pf_index", gzip(&signed(b"index-a")), 1).await;
    serve(server, "index/en_b.pf_index", signed(b"index-b"), 1).await;
    serve(server, "filter/en_f.pf_filter", gzip(&signed(b"filter-f")), 1).await;
}

async fn client(server: &MockServer, loader: &ScriptedLoader) -> PagefindClient {
    serve_index(server).await;
    PagefindClient::initialize(options(server), loader)
        .await
        .expect("init")
}

#[tokio::test]
async fn search_loads_chunks_then_searches() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;

    let options = SearchOptions::default()
        .filter("tag", "rust")
        .sort(Sort::desc("date"))
        .sort(Sort::asc("title"));
    let response = client.search("  Rust, Async!  ", &options).await.expect("search");

    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["en_p1", "en_p2"]);
    assert!((response.results[0].score - 1.5).abs() < f64::EPSILON);
    assert_eq!(response.results[0].words, vec![3, 9]);
    assert!((response.results[0].weighted_locations[0].weight - 2.0).abs() < f64::EPSILON);
    assert_eq!(response.unfiltered_result_count, 7);
    assert_eq!(response.filters["tag"]["rust"], 2);
    assert_eq!(response.total_filters["tag"]["go"], 2);
    assert!(response.timings.total >= response.timings.search);

    let calls = loader.probe().calls();
    assert_eq!(calls.index_requests, vec!["rust async"]);
    assert_eq!(calls.filter_requests, vec![r#"{"tag":["rust"]}"#]);
    let mut index_chunks = calls.index_chunks.clone();
    index_chunks.sort();
    assert_eq!(index_chunks, vec![b"index-a".to_vec(), b"index-b".to_vec()]);
    assert_eq!(calls.filter_chunks, vec![b"filter-f".to_vec()]);
    assert_eq!(
        calls.searches,
        vec![SearchCall {
            query: "rust async".into(),
            filters: r#"{"tag":["rust"]}"#.into(),
            sort: "date:desc".into(),
            exact: false,
        }]
    );
    assert_eq!(calls.stale_handles, 0);
    assert_eq!(calls.returned_buffers, calls.freed_buffers);
}

#[tokio::test]
async fn empty_query_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/pagefind/(index|filter|fragment)/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;

    let response = client
        .search(r#"  "?!"  "#, &SearchOptions::default())
        .await
        .expect("search");

    assert!(response.results.is_empty());
    assert_eq!(response.unfiltered_result_count, 0);
    assert!(response.filters.is_empty());
    assert!(response.total_filters.is_empty());
    assert_eq!(response.timings.total, Duration::ZERO);
    let calls = loader.probe().calls();
    assert!(calls.index_requests.is_empty());
    assert!(calls.searches.is_empty());
}

#[tokio::test]
async fn concurrent_searches_share_chunk_loads() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;

    let options = SearchOptions::default();
    let (a, b, c) = tokio::join!(
        client.search("rust", &options),
        client.search("async", &options),
        client.search("rust", &options),
    );
    a.expect("a");
    b.expect("b");
    c.expect("c");

    let calls = loader.probe().calls();
    assert_eq!(calls.index_chunks.len(), 2);
    assert_eq!(calls.filter_chunks.len(), 1);
    assert_eq!(calls.searches.len(), 3);
    assert_eq!(calls.stale_handles, 0);
}

#[tokio::test]
async fn exact_phrase_is_flagged() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;

    client
        .search(r#" "Hello, World!" "#, &SearchOptions::default())
        .await
        .expect("search");

    let search = &loader.probe().calls().searches[0];
    assert_eq!(search.query, "hello world");
    assert!(search.exact);
    assert_eq!(search.sort, "");
    assert_eq!(search.filters, "{}");
}

#[tokio::test]
async fn index_weight_scales_scores() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    serve_index(&server).await;
    let loader = ScriptedLoader::new(script());
    let options = ClientOptions {
        index_weight: 2.0,
        ..options(&server)
    };
    let client = PagefindClient::initialize(options, &loader)
        .await
        .expect("init");

    let response = client
        .search("rust", &SearchOptions::default())
        .await
        .expect("search");

    assert!((response.results[0].score - 3.0).abs() < f64::EPSILON);
    assert!((response.results[1].score - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn malformed_response_is_surfaced() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    let loader = ScriptedLoader::new(EngineScript {
        search_response: "not a response".into(),
        ..script()
    });
    let client = client(&server, &loader).await;

    let err = client
        .search("rust", &SearchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::MalformedResponse(_)));
}

#[tokio::test]
async fn missing_chunk_fails_search_before_engine_search() {
    let server = MockServer::start().await;
    // The other loads may be abandoned once this one fails.
    available(&server, "index/en_a.pf_index", signed(b"index-a")).await;
    missing(&server, "index/en_b.pf_index").await;
    available(&server, "filter/en_f.pf_filter", signed(b"filter-f")).await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;

    let err = client
        .search("rust", &SearchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::ChunkFetch(_)));
    assert!(err.to_string().contains("en_b.pf_index"));
    assert!(loader.probe().calls().searches.is_empty());
}

#[tokio::test]
async fn engine_failure_during_search() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    let loader = ScriptedLoader::new(EngineScript {
        fail_search: true,
        ..script()
    });
    let client = client(&server, &loader).await;

    let err = client
        .search("rust", &SearchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Engine(BridgeError::Call(_))));
}

#[tokio::test]
async fn preload_loads_chunks_without_searching() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;
    let options = SearchOptions::default().filter("tag", "rust");

    client.preload("rust", &options).await.expect("preload");
    let calls = loader.probe().calls();
    assert_eq!(calls.index_chunks.len(), 2);
    assert_eq!(calls.filter_chunks.len(), 1);
    assert!(calls.searches.is_empty());

    client.search("rust", &options).await.expect("search");
    let calls = loader.probe().calls();
    assert_eq!(calls.index_chunks.len(), 2);
    assert_eq!(calls.searches.len(), 1);
}

#[tokio::test]
async fn empty_query_preload_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/pagefind/(index|filter|fragment)/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;

    client
        .preload("  \t ", &SearchOptions::default().filter("tag", "rust"))
        .await
        .expect("preload");

    let calls = loader.probe().calls();
    assert!(calls.index_requests.is_empty());
    assert!(calls.filter_requests.is_empty());
    assert!(calls.index_chunks.is_empty());
    assert!(calls.filter_chunks.is_empty());
    assert!(calls.searches.is_empty());
}

#[tokio::test]
async fn verbose_search_matches_quiet_search() {
    let server = MockServer::start().await;
    serve_chunks(&server).await;
    let loader = ScriptedLoader::new(script());
    let client = client(&server, &loader).await;

    let quiet = client
        .search("rust", &SearchOptions::default())
        .await
        .expect("quiet");
    let verbose = client
        .search("rust", &SearchOptions::default().verbose(true))
        .await
        .expect("verbose");

    assert_eq!(quiet.results.len(), verbose.results.len());
    assert_eq!(quiet.filters, verbose.filters);
}
