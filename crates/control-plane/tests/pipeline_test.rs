// End-to-end tests: HTTP control plane + worker pool over real sockets
// Run with: cargo test -p calcflow-control-plane --test pipeline_test

use std::sync::Arc;
use std::time::Duration;

use calcflow_control_plane::auth::{AuthConfig, AuthMode, AuthState};
use calcflow_control_plane::storage::StorageBackend;
use calcflow_control_plane::{build_app, ServerConfig};
use calcflow_core::{ArithmeticEvaluator, Orchestrator, TaskQueueConfig};
use calcflow_worker::{
    HttpTaskSource, PollerConfig, TaskSource, WorkerError, WorkerPool, WorkerPoolConfig,
};
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn start(mode: AuthMode, queue: TaskQueueConfig) -> Self {
        let auth = AuthState::new(
            AuthConfig::with_secret(mode, "pipeline-test-secret"),
            StorageBackend::in_memory(),
        );
        let app = build_app(&ServerConfig::default(), Orchestrator::new(queue), auth);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            shutdown: Some(tx),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn worker_pool(server: &TestServer, computing_power: usize) -> WorkerPool {
    let source = HttpTaskSource::new(&server.base_url, Duration::from_secs(2)).unwrap();
    let config = WorkerPoolConfig::default()
        .with_worker_id("pipeline-worker")
        .with_computing_power(computing_power)
        .with_poller(
            PollerConfig::default()
                .with_min_interval(Duration::from_millis(20))
                .with_max_interval(Duration::from_millis(20)),
        )
        .with_shutdown_timeout(Duration::from_secs(5));
    WorkerPool::new(config, Arc::new(source), Arc::new(ArithmeticEvaluator))
}

async fn submit(client: &reqwest::Client, server: &TestServer, expr: &str) -> String {
    let response = client
        .post(server.url("/api/v1/calculate"))
        .json(&json!({ "expression": expr }))
        .send()
        .await
        .expect("Failed to submit expression");
    assert_eq!(response.status(), 201, "submitting {:?}", expr);
    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn wait_for_terminal(client: &reqwest::Client, server: &TestServer, id: &str) -> Value {
    for _ in 0..250 {
        let body: Value = client
            .get(server.url(&format!("/api/v1/expressions/{}", id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let expression = body["expression"].clone();
        if expression["status"] == "completed" || expression["status"] == "failed" {
            return expression;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expression {} never finished", id);
}

#[tokio::test]
async fn test_expressions_evaluated_by_remote_workers() {
    let server = TestServer::start(AuthMode::None, TaskQueueConfig::default()).await;
    let client = reqwest::Client::new();

    let six = submit(&client, &server, "2 + 2 * 2").await;
    let eight = submit(&client, &server, "(2 + 2) * 2").await;
    let div_zero = submit(&client, &server, "1 / 0").await;

    let pool = worker_pool(&server, 2);
    pool.start().unwrap();

    let record = wait_for_terminal(&client, &server, &six).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["result"], 6.0);

    let record = wait_for_terminal(&client, &server, &eight).await;
    assert_eq!(record["result"], 8.0);

    let record = wait_for_terminal(&client, &server, &div_zero).await;
    assert_eq!(record["status"], "failed");
    assert!(record["error"].as_str().unwrap().contains("zero"));
    assert!(record.get("result").is_none());

    pool.shutdown().await.unwrap();

    let list: Value = client
        .get(server.url("/api/v1/expressions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["expressions"].as_array().unwrap().len(), 3);

    let stats = pool.stats();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_invalid_expression_rejected_before_queueing() {
    let server = TestServer::start(AuthMode::None, TaskQueueConfig::default()).await;
    let client = reqwest::Client::new();

    for expr in ["2 + abc", "2 +", ""] {
        let response = client
            .post(server.url("/api/v1/calculate"))
            .json(&json!({ "expression": expr }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 422, "expression {:?}", expr);
    }

    let response = client.get(server.url("/internal/task")).send().await.unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_authenticated_pipeline() {
    let server = TestServer::start(AuthMode::Full, TaskQueueConfig::default()).await;
    let client = reqwest::Client::new();
    let credentials = json!({ "login": "alice", "password": "correct horse" });

    let response = client
        .post(server.url("/api/v1/register"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(server.url("/api/v1/login"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let token: Value = response.json().await.unwrap();
    let token = token["token"].as_str().unwrap().to_string();

    // No token, no submission
    let response = client
        .post(server.url("/api/v1/calculate"))
        .json(&json!({ "expression": "1 + 1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(server.url("/api/v1/calculate"))
        .bearer_auth(&token)
        .json(&json!({ "expression": "10 / 4" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let id: Value = response.json().await.unwrap();
    let id = id["id"].as_str().unwrap().to_string();

    // Workers talk to the unauthenticated internal endpoint
    let pool = worker_pool(&server, 1);
    pool.start().unwrap();

    let mut status = Value::Null;
    for _ in 0..250 {
        let body: Value = client
            .get(server.url(&format!("/api/v1/expressions/{}", id)))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["expression"]["status"] == "completed" {
            assert_eq!(body["expression"]["result"], 2.5);
            status = body["expression"]["status"].clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    pool.shutdown().await.unwrap();
    assert_eq!(status, "completed");
}

#[tokio::test]
async fn test_stale_report_rejected_over_http() {
    let server = TestServer::start(
        AuthMode::None,
        TaskQueueConfig::default().with_lease_duration(Duration::ZERO),
    )
    .await;
    let client = reqwest::Client::new();
    let id = submit(&client, &server, "3 * 3").await;

    let response = client.get(server.url("/internal/task")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let task: Value = response.json().await.unwrap();
    assert_eq!(task["expression_id"], id.as_str());

    let response = client
        .post(server.url("/internal/task"))
        .json(&json!({ "id": task["id"], "result": 9.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // The expression went back to the queue under a fresh task id
    let response = client.get(server.url("/internal/task")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let retry: Value = response.json().await.unwrap();
    assert_eq!(retry["expression_id"], id.as_str());
    assert_ne!(retry["id"], task["id"]);
    assert_eq!(retry["attempt"], 2);
}

#[tokio::test]
async fn test_wrong_orchestrator_path_is_an_error_not_idle() {
    let server = TestServer::start(AuthMode::None, TaskQueueConfig::default()).await;
    let source = HttpTaskSource::new(
        &format!("{}/no-such-prefix", server.base_url),
        Duration::from_secs(2),
    )
    .unwrap();

    let err = source.fetch_task().await.unwrap_err();
    assert!(matches!(err, WorkerError::Transport(_)), "{:?}", err);

    let source = HttpTaskSource::new(&server.base_url, Duration::from_secs(2)).unwrap();
    assert!(source.fetch_task().await.unwrap().is_none());
}
