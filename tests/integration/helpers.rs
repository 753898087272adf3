//! Shared fixtures: a mock index server and client options pointing at it.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use pagefind_client::decompress::SIGNATURE;
use pagefind_client::ClientOptions;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Manifest with a large English index and a small German one.
pub(crate) const MANIFEST: &str = r#"{
    "version": "1.1.1",
    "languages": {
        "de": {"hash": "de_5e1a", "wasm": "de", "page_count": 3},
        "en": {"hash": "en_9f2c", "wasm": "en", "page_count": 10}
    }
}"#;

pub(crate) fn signed(payload: &[u8]) -> Vec<u8> {
    let mut out = SIGNATURE.to_vec();
    out.extend_from_slice(payload);
    out
}

pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Client options for the index served by `server`.
pub(crate) fn options(server: &MockServer) -> ClientOptions {
    ClientOptions {
        excerpt_length: 4,
        ..ClientOptions::with_base_path(format!("{}/pagefind", server.uri()))
    }
}

/// Serve `body` at `/pagefind/<file>`, expecting `hits` requests.
pub(crate) async fn serve(server: &MockServer, file: &str, body: Vec<u8>, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/pagefind/{file}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(hits)
        .mount(server)
        .await;
}

/// Serve `body` at `/pagefind/<file>` with no expectation on hits.
pub(crate) async fn available(server: &MockServer, file: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/pagefind/{file}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serve a 404 at `/pagefind/<file>`.
pub(crate) async fn missing(server: &MockServer, file: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/pagefind/{file}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// Serve `manifest` plus meta files and engine binaries for `en` and `de`.
///
/// Meta files arrive gzipped, binaries already decoded.
pub(crate) async fn serve_index_with(server: &MockServer, manifest: &str) {
    Mock::given(method("GET"))
        .and(path("/pagefind/pagefind-entry.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(manifest))
        .mount(server)
        .await;
    for (hash, id) in [("en_9f2c", "en"), ("de_5e1a", "de")] {
        Mock::given(method("GET"))
            .and(path(format!("/pagefind/pagefind.{hash}.pf_meta")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(gzip(&signed(format!("meta-{id}").as_bytes()))),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/pagefind/wasm.{id}.pagefind")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(signed(format!("engine-{id}").as_bytes())),
            )
            .mount(server)
            .await;
    }
}

pub(crate) async fn serve_index(server: &MockServer) {
    serve_index_with(server, MANIFEST).await;
}

/// Thirty words `w0 .. w29`.
pub(crate) fn words() -> String {
    (0..30).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}
