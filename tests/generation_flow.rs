use std::io::{BufRead as _, BufReader, Read as _, Write as _};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use todogen::ai::{GeminiClient, GenerationFailureKind, TaskGenerator as _};
use todogen::config::AiConfig;
use todogen::controller::{GenerationOutcome, TaskListController};

struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serves exactly one HTTP response and hands back what the client sent.
fn serve_once(status: &'static str, body: String) -> (String, mpsc::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));

        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header line");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((k, v)) = line.split_once(':') {
                headers.push((k.trim().to_owned(), v.trim().to_owned()));
            }
        }

        let len = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).expect("body");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("write response");
        stream.flush().expect("flush");

        let _ = tx.send(CapturedRequest {
            request_line: request_line.trim_end().to_owned(),
            headers,
            body: String::from_utf8_lossy(&buf).to_string(),
        });
    });

    (format!("http://{addr}"), rx)
}

fn client_for(base_url: String) -> GeminiClient {
    let cfg = AiConfig {
        base_url,
        request_timeout_secs: 10,
        ..AiConfig::default()
    };
    GeminiClient::from_config(&cfg, "test-key".to_owned()).expect("client")
}

fn envelope(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

#[tokio::test]
async fn goal_becomes_tasks_end_to_end() {
    let inner = serde_json::json!({
        "tasks": [
            { "task": "Book hotel", "dueDate": "2025-03-01" },
            { "task": "Pack bags" },
            { "task": "   " }
        ]
    })
    .to_string();
    let (base, captured) = serve_once("200 OK", envelope(&inner));
    let client = client_for(base);

    let mut controller = TaskListController::new();
    controller.set_goal("Plan a weekend trip");
    let outcome = controller.generate_from_input(&client).await;

    assert_eq!(outcome, GenerationOutcome::Appended(2));
    assert!(!controller.is_loading());
    assert_eq!(controller.goal(), "");
    assert!(controller.last_error().is_none());

    let tasks = controller.tasks();
    assert_eq!(tasks[0].text, "Book hotel");
    assert_eq!(tasks[0].due_date.as_deref(), Some("2025-03-01"));
    assert!(!tasks[0].completed);
    assert_eq!(tasks[1].text, "Pack bags");
    assert_eq!(tasks[1].due_date, None);
    assert_ne!(tasks[0].id, tasks[1].id);

    let req = captured.recv().expect("captured request");
    assert!(
        req.request_line
            .starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent"),
        "{}",
        req.request_line
    );
    assert_eq!(req.header("x-goog-api-key"), Some("test-key"));

    let body: serde_json::Value = serde_json::from_str(&req.body).expect("json body");
    let cfg = &body["generationConfig"];
    assert_eq!(cfg["responseMimeType"], "application/json");
    assert_eq!(cfg["responseSchema"]["type"], "OBJECT");
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    assert!(prompt.ends_with("Goal: \"Plan a weekend trip\""));
}

#[tokio::test]
async fn service_error_keeps_goal_and_reports() {
    let (base, _captured) = serve_once(
        "403 Forbidden",
        r#"{"error":{"code":403,"message":"API key not valid"}}"#.to_owned(),
    );
    let client = client_for(base);

    let mut controller = TaskListController::new();
    let outcome = controller.generate(&client, "Learn Rust").await;

    let GenerationOutcome::Failed(msg) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(msg.starts_with("Failed to generate tasks."));
    assert!(controller.is_empty());
    assert_eq!(controller.last_error(), Some(msg.as_str()));
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn response_without_tasks_is_malformed() {
    let (base, _captured) = serve_once("200 OK", envelope(r#"{"foo":1}"#));
    let client = client_for(base);

    let err = client
        .generate("Learn Rust")
        .await
        .expect_err("should be malformed");
    assert_eq!(err.kind, GenerationFailureKind::MalformedResponse);
}

#[tokio::test]
async fn empty_http_body_is_empty_response() {
    let (base, _captured) = serve_once("200 OK", String::new());
    let client = client_for(base);

    let err = client.generate("x").await.expect_err("should be empty");
    assert_eq!(err.kind, GenerationFailureKind::EmptyResponse);
    assert_eq!(
        err.to_string(),
        "Failed to generate tasks. Received an empty response from the AI."
    );
}

#[tokio::test]
async fn blank_response_text_is_empty() {
    let (base, _captured) = serve_once("200 OK", envelope("  "));
    let client = client_for(base);

    let err = client.generate("Learn Rust").await.expect_err("should be empty");
    assert_eq!(err.kind, GenerationFailureKind::EmptyResponse);
}
