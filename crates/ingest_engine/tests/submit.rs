use std::io::Write;
use std::time::{Duration, Instant};

use ingest_engine::{
    CancellationToken, FailureKind, IngestPayload, ReqwestSubmitter, SubmitSettings, Submitter,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn media_file(contents: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".mp3")
        .tempfile()
        .expect("temp file");
    file.write_all(contents).expect("write media");
    file.flush().expect("flush media");
    file
}

fn payload(file: &NamedTempFile) -> IngestPayload {
    IngestPayload {
        file: file.path().to_path_buf(),
        title: Some("Weekly sync".to_string()),
        tags: vec!["meeting".to_string(), "audio".to_string()],
        language: Some("en".to_string()),
    }
}

fn submitter_for(server: &MockServer) -> ReqwestSubmitter {
    ReqwestSubmitter::new(SubmitSettings {
        base_url: server.uri(),
        ..SubmitSettings::default()
    })
}

#[tokio::test]
async fn success_returns_parsed_body_and_raw_json() {
    let server = MockServer::start().await;
    let body = json!({
        "title": "Weekly sync",
        "mongodb_operation": {
            "operation": "insert_one",
            "result": {
                "workflow_steps": [
                    {"step": 1, "name": "Upload", "details": {"duration_ms": 120}},
                    {"step": 2, "name": "Transcription", "details": {"duration_ms": 800}}
                ],
                "total_duration_ms": 920
            }
        }
    });
    Mock::given(method("POST"))
        .and(path("/documents/upload"))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("Weekly sync"))
        .and(body_string_contains("meeting,audio"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("ID3-fake-audio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let file = media_file(b"ID3-fake-audio");
    let success = submitter_for(&server)
        .submit(&payload(&file), &CancellationToken::new())
        .await
        .expect("submit ok");

    assert_eq!(success.raw, body);
    assert_eq!(success.body.title, "Weekly sync");
    assert_eq!(success.body.workflow_steps().map(<[_]>::len), Some(2));
    assert_eq!(success.body.total_duration_ms(), Some(920.0));
    assert_eq!(success.payload_bytes, 14);
}

#[tokio::test]
async fn backend_error_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "file too large"})))
        .mount(&server)
        .await;

    let file = media_file(b"bytes");
    let err = submitter_for(&server)
        .submit(&payload(&file), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Backend { status: 500 });
    assert_eq!(err.message, "file too large");
    assert_eq!(err.raw, Some(json!({"detail": "file too large"})));
}

#[tokio::test]
async fn backend_error_without_json_uses_status_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let file = media_file(b"bytes");
    let err = submitter_for(&server)
        .submit(&payload(&file), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Backend { status: 502 });
    assert!(err.message.contains("502"));
    assert_eq!(err.raw, None);
}

#[tokio::test]
async fn unparseable_success_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let file = media_file(b"bytes");
    let err = submitter_for(&server)
        .submit(&payload(&file), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::MalformedResponse);
}

#[tokio::test]
async fn success_body_without_title_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let file = media_file(b"bytes");
    let err = submitter_for(&server)
        .submit(&payload(&file), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::MalformedResponse);
    assert_eq!(err.raw, Some(json!({"status": "ok"})));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let submitter = ReqwestSubmitter::new(SubmitSettings {
        base_url: format!("http://127.0.0.1:{port}"),
        connect_timeout: Duration::from_secs(2),
        ..SubmitSettings::default()
    });
    let file = media_file(b"bytes");
    let err = submitter
        .submit(&payload(&file), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Network);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({"title": "late"})),
        )
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(SubmitSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..SubmitSettings::default()
    });
    let file = media_file(b"bytes");
    let err = submitter
        .submit(&payload(&file), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_json(json!({"title": "never"})),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let file = media_file(b"bytes");
    let started = Instant::now();
    let err = submitter_for(&server)
        .submit(&payload(&file), &token)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Aborted);
    assert!(err.is_aborted());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn already_cancelled_token_never_sends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let file = media_file(b"bytes");
    let err = submitter_for(&server)
        .submit(&payload(&file), &token)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Aborted);
}

#[tokio::test]
async fn missing_file_is_unreadable() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let payload = IngestPayload {
        file: dir.path().join("gone.wav"),
        title: None,
        tags: Vec::new(),
        language: None,
    };

    let err = submitter_for(&server)
        .submit(&payload, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::UnreadableFile);
    assert!(err.message.contains("gone.wav"));
}
