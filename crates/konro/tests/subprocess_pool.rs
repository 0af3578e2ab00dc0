//! End-to-end flows for the subprocess-backed pool, driving the real
//! `konro-worker` binary over its stdio protocol.

use std::time::Duration;

use konro::{BackendKind, InstanceConfig, LlmPool, PoolOptions, WorkerId};
use serde_json::{Value, json};

fn worker_binary() -> &'static str {
    env!("CARGO_BIN_EXE_konro-worker")
}

fn scripted_config() -> InstanceConfig {
    InstanceConfig::new(BackendKind::Lookup, "scripted")
        .with_param("prompt_a", "response_a")
        .with_param("prompt_b", "response_b")
}

#[tokio::test(flavor = "multi_thread")]
async fn round_trip_over_the_stdio_protocol() {
    let mut pool = LlmPool::subprocess(worker_binary(), PoolOptions::default());
    let id = pool
        .prepare(scripted_config(), Some(WorkerId::from("w1")))
        .await
        .unwrap();
    pool.start(&id).await.unwrap();
    assert!(pool.is_running(&id).unwrap());

    let first = pool.generate(&id, "prompt_a").await.unwrap();
    assert_eq!(
        first.into_response().unwrap(),
        Value::String("response_a".into())
    );
    let second = pool.generate(&id, "prompt_b").await.unwrap();
    assert_eq!(
        second.into_response().unwrap(),
        Value::String("response_b".into())
    );

    pool.stop(&id).await.unwrap();
    assert!(!pool.is_running(&id).unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn structured_responses_survive_the_wire() {
    let config = InstanceConfig::new(BackendKind::Lookup, "scripted")
        .with_param("q", json!({"text": "hi", "tokens": 2}));
    let mut pool = LlmPool::subprocess(worker_binary(), PoolOptions::default());
    let id = pool.prepare(config, None).await.unwrap();
    pool.start(&id).await.unwrap();

    let outcome = pool.generate(&id, "q").await.unwrap();
    let response = outcome.into_response().unwrap();
    assert_eq!(response["text"], "hi");
    assert_eq!(response["tokens"], 2);

    pool.stop(&id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn start_then_stop_without_traffic_is_clean() {
    let mut pool = LlmPool::subprocess(worker_binary(), PoolOptions::default());
    let id = pool.prepare(scripted_config(), None).await.unwrap();
    pool.start(&id).await.unwrap();
    pool.stop(&id).await.unwrap();
    assert!(!pool.is_running(&id).unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_model_construction_surfaces_as_timeout_then_stop() {
    // A base URL that cannot parse makes the child exit 1 before it ever
    // answers, whether or not the ollama backend is compiled in.
    let config = InstanceConfig::new(BackendKind::Ollama, "gemma3n")
        .with_param("base_url", "not a url");
    let options = PoolOptions::default().with_generation_timeout(Duration::from_secs(2));
    let mut pool = LlmPool::subprocess(worker_binary(), options);
    let id = pool.prepare(config, None).await.unwrap();

    // Spawning succeeds; the failure happens inside the child.
    pool.start(&id).await.unwrap();
    assert!(pool.is_running(&id).unwrap());

    let outcome = pool.generate(&id, "anything").await.unwrap();
    assert!(outcome.timed_out());

    pool.stop(&id).await.unwrap();
    assert!(!pool.is_running(&id).unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn two_subprocess_workers_stay_independent() {
    let mut pool = LlmPool::subprocess(worker_binary(), PoolOptions::default());
    let a = pool.prepare(scripted_config(), None).await.unwrap();
    let b = pool
        .prepare(
            InstanceConfig::new(BackendKind::Lookup, "scripted").with_param("prompt_c", "response_c"),
            None,
        )
        .await
        .unwrap();
    pool.start(&a).await.unwrap();
    pool.start(&b).await.unwrap();

    let from_b = pool.generate(&b, "prompt_c").await.unwrap();
    assert_eq!(
        from_b.into_response().unwrap(),
        Value::String("response_c".into())
    );
    let from_a = pool.generate(&a, "prompt_a").await.unwrap();
    assert_eq!(
        from_a.into_response().unwrap(),
        Value::String("response_a".into())
    );

    pool.stop_all().await;
    assert!(!pool.is_running(&a).unwrap());
    assert!(!pool.is_running(&b).unwrap());
}
