use filmscraper::{
    fetch::{DocumentSource, HttpSource, StaticSource},
    server::routes,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use url::Url;

const FILMS: &str = include_str!("fixtures/highest_grossing.html");
const BOUNDARY: &str = "----filmscraper-test-boundary";

fn fixture_source() -> Arc<dyn DocumentSource> {
    Arc::new(StaticSource::new("fixture", FILMS))
}

fn multipart_body(field: &str, filename: &str, content: &str) -> Vec<u8> {
    format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         {content}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
    )
    .into_bytes()
}

fn post_api(body: Vec<u8>) -> warp::test::RequestBuilder {
    warp::test::request()
        .method("POST")
        .path("/api/")
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(body)
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("response body is JSON")
}

#[tokio::test]
async fn answers_with_uploaded_questions() {
    let api = routes(fixture_source());
    let resp = post_api(multipart_body("questions.txt", "questions.txt", "1. How many...?"))
        .reply(&api)
        .await;

    assert_eq!(resp.status(), 200);
    let body = json_body(resp.body());
    let arr = body.as_array().expect("array");
    assert_eq!(arr.len(), 4);
    assert_eq!(arr[0], json!(2));
    assert_eq!(arr[1], json!("Retro Epic"));
    assert!((arr[2].as_f64().unwrap() - 0.485782).abs() <= 0.001);
    assert!(arr[3].as_str().unwrap().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn question_content_does_not_change_answers() {
    let api = routes(fixture_source());
    let a = post_api(multipart_body("questions.txt", "q.txt", "anything"))
        .reply(&api)
        .await;
    let b = post_api(multipart_body("questions.txt", "q.txt", ""))
        .reply(&api)
        .await;
    assert_eq!(a.status(), 200);
    assert_eq!(json_body(a.body()), json_body(b.body()));
}

#[tokio::test]
async fn missing_upload_is_bad_request() {
    let api = routes(fixture_source());
    let resp = post_api(multipart_body("other.txt", "other.txt", "hello"))
        .reply(&api)
        .await;

    assert_eq!(resp.status(), 400);
    assert_eq!(json_body(resp.body()), json!({"error": "No questions.txt uploaded"}));
}

#[tokio::test]
async fn non_multipart_post_is_bad_request() {
    let api = routes(fixture_source());
    let resp = warp::test::request()
        .method("POST")
        .path("/api/")
        .header("content-type", "application/json")
        .body("{}")
        .reply(&api)
        .await;

    assert_eq!(resp.status(), 400);
    assert_eq!(json_body(resp.body()), json!({"error": "No questions.txt uploaded"}));
}

#[tokio::test]
async fn wrong_method_and_unknown_path() {
    let api = routes(fixture_source());

    let get = warp::test::request().method("GET").path("/api/").reply(&api).await;
    assert_eq!(get.status(), 405);

    let missing = warp::test::request().method("GET").path("/nope").reply(&api).await;
    assert_eq!(missing.status(), 404);
    assert!(json_body(missing.body())["error"].is_string());
}

#[tokio::test]
async fn health_endpoint() {
    let api = routes(fixture_source());
    let resp = warp::test::request().method("GET").path("/health").reply(&api).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp.body())["status"], "healthy");
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let source = HttpSource::new(client, Url::parse("http://127.0.0.1:1/").unwrap());
    let api = routes(Arc::new(source));

    let resp = post_api(multipart_body("questions.txt", "questions.txt", "q"))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 502);
    assert!(json_body(resp.body())["error"]
        .as_str()
        .unwrap()
        .contains("127.0.0.1:1"));
}

/// Serve the film fixture under a non-success status line.
async fn serve_films_with_status(status_line: &'static str) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            let head = format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                FILMS.len()
            );
            let _ = sock.write_all(head.as_bytes()).await;
            let _ = sock.write_all(FILMS.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    });
    Url::parse(&format!("http://{}/wiki/films", addr)).unwrap()
}

#[tokio::test]
async fn upstream_error_status_is_bad_gateway() {
    // The body is a valid film page; only the status marks it as a failure.
    let url = serve_films_with_status("HTTP/1.1 503 Service Unavailable").await;
    let api = routes(Arc::new(HttpSource::new(reqwest::Client::new(), url)));

    let resp = post_api(multipart_body("questions.txt", "questions.txt", "q"))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 502);
    assert!(json_body(resp.body())["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn page_without_film_table_is_server_error() {
    let source = StaticSource::new("empty", "<html><body>No tables today</body></html>");
    let api = routes(Arc::new(source));

    let resp = post_api(multipart_body("questions.txt", "questions.txt", "q"))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 500);
    assert!(json_body(resp.body())["error"]
        .as_str()
        .unwrap()
        .contains("no table"));
}
