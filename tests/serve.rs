//! End-to-end over a real listener.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::net::TcpListener;

use ssr_dispatcher::render::Manifest;
use ssr_dispatcher::{HttpServer, Shutdown};

mod common;
use common::{cached_site, echo, router, TEMPLATE};

#[tokio::test]
async fn test_serves_until_shutdown() {
    let app = router(
        cached_site("test", "/test/", TEMPLATE, echo("A")),
        cached_site("test2", "/test2/", TEMPLATE, echo("B")),
        Manifest::empty(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = tokio::spawn(HttpServer::new(app).run(listener, shutdown.subscribe()));

    let client = reqwest::Client::new();
    let response = client.get(format!("http://{}/test/about", addr)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "text/html");
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(
        response.text().await.unwrap(),
        "<html><head></head><body>A:/about</body></html>"
    );

    let response = client
        .get(format!("http://{}/test2/", addr))
        .header("x-request-id", "e2e-1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "e2e-1");
    assert!(response.text().await.unwrap().contains("B:/"));

    let response = client.get(format!("http://{}/elsewhere", addr)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    drop(client);
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
