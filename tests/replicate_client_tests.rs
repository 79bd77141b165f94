//! Provider-contract tests for the Replicate client against a fake HTTP
//! provider.

use std::path::PathBuf;
use std::time::Duration;

use reelsmith::generation::replicate::MODEL_VERSION;
use reelsmith::generation::{GenerationError, PollPolicy, ReplicateClient, VideoGenerator};
use reelsmith::models::videos::VideoSource;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts: 5,
    }
}

fn client(base_url: String, videos_dir: PathBuf) -> ReplicateClient {
    ReplicateClient::new("test-token".to_string(), base_url, videos_dir, fast_policy()).unwrap()
}

fn submission_body(prompt: &str) -> serde_json::Value {
    json!({
        "version": MODEL_VERSION,
        "input": {
            "prompt": prompt,
            "video_length": "14_frames_with_svd",
            "sizing_strategy": "maintain_aspect_ratio",
            "frames_per_second": 7,
            "motion_bucket_id": 40,
            "cond_aug": 0.02,
            "decoding_t": 7
        }
    })
}

#[tokio::test]
async fn missing_token_fails_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = ReplicateClient::new(
        String::new(),
        server.uri(),
        PathBuf::from("videos"),
        fast_policy(),
    );

    assert!(matches!(result, Err(GenerationError::MissingApiToken)));
}

#[tokio::test]
async fn full_run_submits_exact_contract_and_downloads_output() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .and(header("Authorization", "Token test-token"))
        .and(body_json(submission_body("sunset over mountains")))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "pred-1", "status": "starting"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/predictions/pred-1"))
        .and(header("Authorization", "Token test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-1",
            "status": "succeeded",
            "output": [format!("{}/files/out.mp4", server.uri())]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/out.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-mp4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(server.uri(), scratch.path().to_path_buf());
    let source = client.generate("sunset over mountains", 4).await.unwrap();

    let path = source.as_local_path().expect("expected a downloaded file");
    assert!(path.starts_with(scratch.path()));
    assert_eq!(std::fs::read(path).unwrap(), b"fake-mp4");
}

#[tokio::test]
async fn created_response_without_id_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "starting"})))
        .mount(&server)
        .await;

    let client = client(server.uri(), PathBuf::from("videos"));
    let result = client.generate("test prompt", 4).await;

    assert!(matches!(result, Err(GenerationError::Submission(_))));
}

#[tokio::test]
async fn non_created_submission_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(server.uri(), PathBuf::from("videos"));
    let result = client.generate("test prompt", 4).await;

    assert!(matches!(result, Err(GenerationError::Submission(_))));
}

#[tokio::test]
async fn failed_status_ends_polling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "pred-2", "status": "starting"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/predictions/pred-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-2",
            "status": "failed",
            "error": "NSFW content detected"
        })))
        .mount(&server)
        .await;

    let client = client(server.uri(), PathBuf::from("videos"));
    match client.generate("test prompt", 4).await {
        Err(GenerationError::Failed(reason)) => {
            assert!(reason.contains("NSFW content detected"))
        }
        other => panic!("expected generation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn unrecognized_status_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "pred-3", "status": "starting"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/predictions/pred-3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "pred-3", "status": "canceled"})),
        )
        .mount(&server)
        .await;

    let client = client(server.uri(), PathBuf::from("videos"));
    let result = client.generate("test prompt", 4).await;

    assert!(matches!(result, Err(GenerationError::Failed(_))));
}

#[tokio::test]
async fn polling_ceiling_turns_into_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "pred-4", "status": "starting"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/predictions/pred-4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "pred-4", "status": "processing"})),
        )
        .mount(&server)
        .await;

    let client = client(server.uri(), PathBuf::from("videos"));
    let result = client.generate("test prompt", 4).await;

    assert!(matches!(
        result,
        Err(GenerationError::TimedOut { attempts: 5 })
    ));
}

#[tokio::test]
async fn transient_poll_errors_are_tolerated() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "pred-5", "status": "starting"})),
        )
        .mount(&server)
        .await;

    // First status check blows up; the loop is expected to ride it out.
    Mock::given(method("GET"))
        .and(path("/predictions/pred-5"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/predictions/pred-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-5",
            "status": "succeeded",
            "output": [format!("{}/files/out.mp4", server.uri())]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/out.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered".to_vec()))
        .mount(&server)
        .await;

    let client = client(server.uri(), scratch.path().to_path_buf());
    let source = client.generate("test prompt", 4).await.unwrap();

    let path = source.as_local_path().expect("expected a downloaded file");
    assert_eq!(std::fs::read(path).unwrap(), b"recovered");
}

#[tokio::test]
async fn failed_download_falls_back_to_the_remote_url() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    let output_url = format!("{}/files/gone.mp4", server.uri());

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "pred-6", "status": "starting"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/predictions/pred-6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-6",
            "status": "succeeded",
            "output": [output_url.clone()]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/gone.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(server.uri(), scratch.path().to_path_buf());
    let source = client.generate("test prompt", 4).await.unwrap();

    assert_eq!(source, VideoSource::Remote(output_url));
}
