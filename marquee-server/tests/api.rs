use std::{sync::Arc, time::Duration};

use axum::http::{StatusCode, header::CONTENT_TYPE};
use axum_test::TestServer;
use serde_json::{Value, json};

use marquee_core::{
    cache::{CacheStore, MemoryCache, TtlPolicy},
    extractor::{CandidateSource, ExitOutcome},
    pipeline::{ListPipeline, LookupSettings, PipelineSettings, TitleLookup},
    providers::MetadataResolver,
    testing::{ScriptedSource, StaticResolver},
};
use marquee_server::{AppState, Enrichment, create_app};

const LIST_URL: &str = "https://letterboxd.com/someone/list/favourites/";

struct Harness {
    server: TestServer,
    resolver: Arc<StaticResolver>,
}

fn harness(source: ScriptedSource, resolver: StaticResolver, lookup_deadline: Duration) -> Harness {
    let resolver = Arc::new(resolver);
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let source: Arc<dyn CandidateSource> = Arc::new(source);
    let shared: Arc<dyn MetadataResolver> = resolver.clone();

    let enrichment = Enrichment {
        pipeline: ListPipeline::new(
            source,
            Arc::clone(&shared),
            Arc::clone(&cache),
            PipelineSettings {
                run_deadline: Duration::from_secs(10),
                inter_item_delay: Duration::ZERO,
                ttl: TtlPolicy::default(),
            },
        ),
        lookup: TitleLookup::new(
            shared,
            cache,
            LookupSettings {
                deadline: lookup_deadline,
                ttl: TtlPolicy::default(),
            },
        ),
    };
    let state = AppState::new("letterboxd.com", "memory").with_enrichment(enrichment);

    Harness {
        server: TestServer::new(create_app(state)).expect("test server"),
        resolver,
    }
}

fn keyless_server() -> TestServer {
    TestServer::new(create_app(AppState::new("letterboxd.com", "memory")))
        .expect("test server")
}

fn sse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim_start()).expect("event json"))
        .collect()
}

fn of_type<'a>(events: &'a [Value], kind: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["type"] == kind).collect()
}

#[tokio::test]
async fn health_reports_cache_backend() {
    let server = keyless_server();

    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "ok", "cache": "memory" }));
}

#[tokio::test]
async fn list_stream_pushes_progress_items_and_completion() {
    let h = harness(
        ScriptedSource::new(["Heat (1995)", "Obscure Film", "Heat (1995)"]),
        StaticResolver::new().with_available("Heat", 949),
        Duration::from_secs(5),
    );

    let response = h
        .server
        .post("/api/v1/lists/stream")
        .json(&json!({ "listUrl": LIST_URL }))
        .await;
    response.assert_status_ok();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let events = sse_events(&response.text());
    assert_eq!(events.first().map(|e| e["type"].clone()), Some(json!("progress")));
    assert_eq!(events[0]["phase"], "extracting");

    let items = of_type(&events, "movie_found");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["movie"]["status"], "found");
    assert_eq!(items[1]["movie"]["status"], "not_found");

    let last = events.last().expect("terminal event");
    assert_eq!(last["type"], "complete");
    assert_eq!(
        last["stats"],
        json!({ "total": 2, "processed": 2, "cached": 0, "found": 1 })
    );
    assert!(of_type(&events, "error").is_empty());
}

#[tokio::test]
async fn second_run_is_served_from_cache() {
    let h = harness(
        ScriptedSource::new(["Heat (1995)", "Alien"]),
        StaticResolver::new()
            .with_available("Heat", 949)
            .with_unavailable("Alien", 348),
        Duration::from_secs(5),
    );
    let request = json!({ "listUrl": LIST_URL });

    h.server.post("/api/v1/lists/stream").json(&request).await.assert_status_ok();
    let response = h.server.post("/api/v1/lists/stream").json(&request).await;

    let events = sse_events(&response.text());
    let last = events.last().expect("terminal event");
    assert_eq!(last["stats"]["cached"], 2);
    assert_eq!(last["stats"]["found"], 1);
    assert_eq!(h.resolver.calls().len(), 2);
}

#[tokio::test]
async fn extractor_failure_ends_with_one_error_event() {
    let h = harness(
        ScriptedSource::new(["Heat (1995)"]).exiting_with(ExitOutcome::Failed { code: 2 }),
        StaticResolver::new().with_available("Heat", 949),
        Duration::from_secs(5),
    );

    let response = h
        .server
        .post("/api/v1/lists/stream")
        .json(&json!({ "listUrl": LIST_URL }))
        .await;
    response.assert_status_ok();

    let events = sse_events(&response.text());
    let errors = of_type(&events, "error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["message"], "Failed to extract movies from list");
    assert_eq!(events.last(), Some(errors[0]));
    assert!(of_type(&events, "complete").is_empty());
    assert!(h.resolver.calls().is_empty());
}

#[tokio::test]
async fn list_urls_are_validated() {
    let h = harness(
        ScriptedSource::new(["Heat"]),
        StaticResolver::new(),
        Duration::from_secs(5),
    );

    for body in [
        json!({}),
        json!({ "listUrl": "not a url" }),
        json!({ "listUrl": "ftp://letterboxd.com/list/" }),
        json!({ "listUrl": "https://example.com/someone/list/x/" }),
    ] {
        let response = h.server.post("/api/v1/lists/stream").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error = response.json::<Value>();
        assert_eq!(error["error"]["status"], 400);
        assert!(error["error"]["message"].is_string());
    }

    let response = h
        .server
        .post("/api/v1/lists/stream")
        .json(&json!({ "listUrl": "https://www.letterboxd.com/someone/list/x/" }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn missing_api_key_is_a_server_error() {
    let server = keyless_server();

    let response = server
        .post("/api/v1/lists/stream")
        .json(&json!({ "listUrl": LIST_URL }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "TMDB API key not configured"
    );

    let response = server
        .post("/api/v1/movies/resolve")
        .json(&json!({ "title": "Heat" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn resolve_title_caches_the_result() {
    let h = harness(
        ScriptedSource::new(Vec::<String>::new()),
        StaticResolver::new().with_available("Heat", 949),
        Duration::from_secs(5),
    );
    let request = json!({ "title": "Heat", "year": 1995 });

    let first = h.server.post("/api/v1/movies/resolve").json(&request).await;
    first.assert_status_ok();
    let first = first.json::<Value>();
    assert_eq!(first["cached"], false);
    assert_eq!(first["movie"]["status"], "found");
    assert_eq!(first["movie"]["releaseDate"], "1995-01-01");

    let second = h.server.post("/api/v1/movies/resolve").json(&request).await;
    assert_eq!(second.json::<Value>()["cached"], true);
    assert_eq!(h.resolver.calls(), vec!["Heat (1995)".to_string()]);
}

#[tokio::test]
async fn resolve_title_rejects_blank_titles() {
    let h = harness(
        ScriptedSource::new(Vec::<String>::new()),
        StaticResolver::new(),
        Duration::from_secs(5),
    );

    let response = h
        .server
        .post("/api/v1/movies/resolve")
        .json(&json!({ "title": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(h.resolver.calls().is_empty());
}

#[tokio::test]
async fn slow_resolution_times_out_with_408() {
    let h = harness(
        ScriptedSource::new(Vec::<String>::new()),
        StaticResolver::new()
            .with_available("Heat", 949)
            .with_latency(Duration::from_secs(10)),
        Duration::from_secs(1),
    );

    let response = h
        .server
        .post("/api/v1/movies/resolve")
        .json(&json!({ "title": "Heat" }))
        .await;
    response.assert_status(StatusCode::REQUEST_TIMEOUT);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Request timed out after 1 seconds"
    );
}
