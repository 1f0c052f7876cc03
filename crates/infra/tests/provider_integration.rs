//! Lazy client provider

mod support;

use std::sync::Arc;

use esi_domain::CallOptions;
use esi_infra::{ClientOptions, EsiClientProvider, NoCache};
use serde_json::json;
use support::{factory, params, settings, swagger};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve_spec_once(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{version}/swagger.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(swagger(server, &format!("/{version}"))))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn client_is_built_lazily_and_reused() {
    let server = MockServer::start().await;
    serve_spec_once(&server, "latest").await;
    let (factory, _) = factory(settings(&server));
    let provider = EsiClientProvider::new(Arc::new(factory.with_cache(Arc::new(NoCache))), ClientOptions::new());

    assert!(!provider.is_initialized());
    let first = provider.client().await.unwrap();
    let second = provider.client().await.unwrap();

    assert!(provider.is_initialized());
    assert!(std::ptr::eq(first, second));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_builds_once() {
    let server = MockServer::start().await;
    serve_spec_once(&server, "latest").await;
    let (factory, _) = factory(settings(&server));
    let provider = Arc::new(EsiClientProvider::new(
        Arc::new(factory.with_cache(Arc::new(NoCache))),
        ClientOptions::new(),
    ));

    let clients = futures::future::join_all((0..8).map(|_| {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move {
            let client = provider.client().await.unwrap();
            client as *const esi_infra::EsiClient as usize
        })
    }))
    .await;

    let addresses: Vec<usize> = clients.into_iter().map(Result::unwrap).collect();
    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn options_reach_the_built_client() {
    let server = MockServer::start().await;
    serve_spec_once(&server, "v1").await;
    Mock::given(method("GET"))
        .and(path("/v1/status/"))
        .and(query_param("datasource", "dummy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"players": 3})))
        .expect(1)
        .mount(&server)
        .await;
    let (factory, _) = factory(settings(&server));
    let provider = EsiClientProvider::new(
        Arc::new(factory),
        ClientOptions::new().datasource("dummy").version("v1"),
    );

    let client = provider.client().await.unwrap();
    assert_eq!(client.authenticator().datasource(), "dummy");

    let value =
        client.call("Status", "get_status", params(&[])).unwrap().result(CallOptions::new()).await.unwrap();
    assert_eq!(value["players"], 3);
}
