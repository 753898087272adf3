//! Client initialisation: manifest, language choice and engine start-up.

use pagefind_bridge::testing::{EngineScript, ScriptedLoader};
use pagefind_bridge::BridgeError;
use pagefind_client::{ClientOptions, PagefindClient, RankingWeights, SearchError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{missing, options, serve_index, serve_index_with, signed};

#[tokio::test]
async fn init_selects_largest_language() {
    let server = MockServer::start().await;
    serve_index(&server).await;
    let loader = ScriptedLoader::new(EngineScript::default());

    let client = PagefindClient::initialize(options(&server), &loader)
        .await
        .expect("init");

    assert_eq!(client.language(), Some("en"));
    let calls = loader.probe().calls();
    assert_eq!(calls.binaries, vec![b"engine-en".to_vec()]);
    assert_eq!(calls.meta, vec![b"meta-en".to_vec()]);
    assert!(calls.ranking.is_empty());
}

#[tokio::test]
async fn preferred_language_is_used() {
    let server = MockServer::start().await;
    serve_index(&server).await;
    let loader = ScriptedLoader::new(EngineScript::default());
    let options = ClientOptions {
        language: Some("de-AT".into()),
        ..options(&server)
    };

    let client = PagefindClient::initialize(options, &loader)
        .await
        .expect("init");

    assert_eq!(client.language(), Some("de"));
    assert_eq!(loader.probe().calls().meta, vec![b"meta-de".to_vec()]);
}

#[tokio::test]
async fn manifest_error_aborts_init() {
    let server = MockServer::start().await;
    missing(&server, "pagefind-entry.json").await;
    let loader = ScriptedLoader::new(EngineScript::default());

    let err = PagefindClient::initialize(options(&server), &loader)
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::ManifestFetch(_)));
    assert!(err.to_string().contains("pagefind-entry.json"));
    assert!(loader.probe().calls().binaries.is_empty());
}

#[tokio::test]
async fn manifest_without_languages_is_rejected() {
    let server = MockServer::start().await;
    serve_index_with(&server, r#"{"version": "1.1.1", "languages": {}}"#).await;
    let loader = ScriptedLoader::new(EngineScript::default());

    let err = PagefindClient::initialize(options(&server), &loader)
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::NoLanguageIndex(_)));
}

#[tokio::test]
async fn ranking_weights_reach_the_engine() {
    let server = MockServer::start().await;
    serve_index(&server).await;
    let loader = ScriptedLoader::new(EngineScript::default());
    let options = ClientOptions {
        ranking: Some(RankingWeights {
            term_similarity: Some(2.0),
            page_length: Some(0.5),
            ..Default::default()
        }),
        ..options(&server)
    };

    PagefindClient::initialize(options, &loader)
        .await
        .expect("init");

    let calls = loader.probe().calls();
    assert_eq!(
        calls.ranking,
        vec![
            r#"{"term_similarity":2.0,"page_length":0.5,"term_saturation":null,"term_frequency":null}"#
                .to_string()
        ]
    );
    assert_eq!(calls.stale_handles, 0);
}

#[tokio::test]
async fn rejected_meta_is_engine_error() {
    let server = MockServer::start().await;
    serve_index(&server).await;
    let loader = ScriptedLoader::new(EngineScript {
        reject_meta: true,
        ..Default::default()
    });

    let client = PagefindClient::new(options(&server)).expect("client");
    let err = client.init(&loader).await.unwrap_err();

    assert!(matches!(err, SearchError::Engine(BridgeError::NullHandle(_))));
    assert!(!client.is_initialized());
}

#[tokio::test]
async fn engine_that_fails_to_instantiate() {
    let server = MockServer::start().await;
    serve_index(&server).await;

    let err = PagefindClient::initialize(options(&server), &ScriptedLoader::failing())
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Engine(BridgeError::Instantiate(_))));
}

#[tokio::test]
async fn missing_engine_binary_is_chunk_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pagefind/pagefind-entry.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"languages": {"en": {"hash": "en_1", "page_count": 1}}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pagefind/pagefind.en_1.pf_meta"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(signed(b"meta")))
        .mount(&server)
        .await;
    missing(&server, "wasm.unknown.pagefind").await;
    let loader = ScriptedLoader::new(EngineScript::default());

    let err = PagefindClient::initialize(options(&server), &loader)
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::ChunkFetch(_)));
    assert!(err.to_string().contains("wasm.unknown.pagefind"));
}

#[tokio::test]
async fn second_init_is_a_no_op() {
    let server = MockServer::start().await;
    serve_index(&server).await;
    let loader = ScriptedLoader::new(EngineScript::default());
    let client = PagefindClient::new(options(&server)).expect("client");

    client.init(&loader).await.expect("first init");
    client.init(&loader).await.expect("second init");

    assert_eq!(loader.probe().calls().binaries.len(), 1);
}
