//! End-to-end batch runs against a mocked Vertex AI endpoint.

use rimagen::{
    BatchConfig, ItemStatus, ItemTracker, StaticTokenProvider, VertexClient, VertexConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREDICT_PATH: &str =
    "/v1/projects/batch-project/locations/us-central1/publishers/google/models/imagen-4.0-generate-preview-06-06:predict";

fn client_for(server: &MockServer) -> VertexClient {
    let config = VertexConfig::new()
        .with_project("batch-project")
        .with_api_base_url(server.uri());
    VertexClient::with_credentials(config, Arc::new(StaticTokenProvider::new("batch-token")))
}

#[tokio::test]
async fn test_batch_isolates_upstream_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .and(body_string_contains("\"prompt\":\"over quota\""))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded for aiplatform.googleapis.com/online_prediction_requests_per_base_model",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .and(header("authorization", "Bearer batch-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{ "bytesBase64Encoded": "iVBORw0KGgo=", "mimeType": "image/png" }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tracker = ItemTracker::with_prompts(["a quiet harbor", "over quota", "a desert road"]);

    let summary = client
        .orchestrator(BatchConfig::new().with_delay(Duration::ZERO))
        .run_all(&tracker)
        .await;

    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);

    let items = tracker.items();
    assert_eq!(items[0].status(), ItemStatus::Succeeded);
    assert_eq!(items[1].status(), ItemStatus::Failed);
    assert_eq!(items[2].status(), ItemStatus::Succeeded);
    assert_eq!(
        items[1].error_message(),
        Some("Quota exceeded for aiplatform.googleapis.com/online_prediction_requests_per_base_model")
    );

    let image = &items[2].result().unwrap().images[0];
    assert_eq!(image.as_str(), "data:image/png;base64,iVBORw0KGgo=");
    assert_eq!(&image.decode().unwrap()[..4], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_requests_follow_row_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{ "bytesBase64Encoded": ["AAAA", "BBBB"] }]
        })))
        .mount(&server)
        .await;

    let tracker = ItemTracker::with_prompts(["one", "", "two", "three"]);
    client_for(&server)
        .orchestrator(
            BatchConfig::new()
                .with_delay(Duration::ZERO)
                .with_sample_count(2),
        )
        .run_all(&tracker)
        .await;

    let requests = server.received_requests().await.unwrap();
    let prompts: Vec<String> = requests
        .iter()
        .map(|request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body["parameters"]["sampleCount"], 2);
            assert_eq!(body["parameters"]["aspectRatio"], "9:16");
            body["instances"][0]["prompt"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(prompts, vec!["one", "two", "three"]);

    assert_eq!(tracker.items()[1].status(), ItemStatus::Idle);
    assert_eq!(tracker.items()[3].result().unwrap().images.len(), 2);
}

#[tokio::test]
async fn test_single_generate_builds_and_validates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{ "bytesBase64Encoded": "AAAA" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.generate("wide", 1, "21:9").await.unwrap_err();
    assert_eq!(err.status_code(), 400);

    let result = client.generate("square", 1, "1:1").await.unwrap();
    assert_eq!(result.aspect_ratio.as_str(), "1:1");
    assert_eq!(result.model_id, "imagen-4.0-generate-preview-06-06");
}
