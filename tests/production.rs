//! Production mode: boot-time artifacts, static mounts and compression.

use std::path::Path;
use std::process::Command;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use ssr_dispatcher::config::{Mode, ServerConfig};
use ssr_dispatcher::render::RenderError;
use ssr_dispatcher::{initialize, Shutdown, SsrApp, StartupError};

mod common;
use common::{get, send, write};

const SHELL: &str = "<!DOCTYPE html><html><head><!--preload-links--></head>\
                     <body><div id=\"app\"><!--app-html--></div></body></html>";

const APP_JS: &str =
    "export function mount(el) {\n  el.textContent = 'hydrated from the client bundle';\n}\n";

const ENTRY: &str = r#"export async function render(url, manifest) {
  if (url.startsWith('/boom')) throw new Error('boom at ' + url);
  const links = (manifest['src/App.vue'] || [])
    .map((href) => `<link rel="modulepreload" href="${href}">`)
    .join('');
  return [`<h1>${url}</h1>`, links];
}
"#;

fn write_dist(root: &Path) {
    write(&root.join("dist/client/index.html"), SHELL);
    write(
        &root.join("dist/client/ssr-manifest.json"),
        r#"{"src/App.vue": ["/assets/app.js"]}"#,
    );
    write(&root.join("dist/client/assets/app.js"), APP_JS);
    write(&root.join("dist/server/entry-server.js"), ENTRY);
}

fn production_config(root: &Path, program: &str) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.root = root.to_path_buf();
    config.mode = Mode::Production;
    config.runtime.program = program.to_string();
    config
}

async fn boot(root: &Path, program: &str) -> SsrApp {
    initialize(&production_config(root, program), &Shutdown::new())
        .await
        .unwrap()
}

fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_boot_loads_artifacts_once() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());

    let app = boot(dir.path(), "node").await;
    assert_eq!(app.mode(), Mode::Production);
    assert!(app.dev_servers().is_empty());
    assert_eq!(app.dispatcher().manifest().len(), 1);

    let names: Vec<_> = app
        .dispatcher()
        .sites()
        .sites()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, ["test", "test2"]);
}

#[tokio::test]
async fn test_missing_artifacts_are_fatal() {
    for missing in [
        "dist/client/index.html",
        "dist/client/ssr-manifest.json",
        "dist/server/entry-server.js",
    ] {
        let dir = tempfile::tempdir().unwrap();
        write_dist(dir.path());
        std::fs::remove_file(dir.path().join(missing)).unwrap();

        let err = initialize(&production_config(dir.path(), "node"), &Shutdown::new())
            .await
            .err()
            .unwrap();
        match err {
            StartupError::MissingArtifact { path, .. } => {
                assert!(path.ends_with(missing), "{}", missing)
            }
            other => panic!("expected MissingArtifact for {}, got {}", missing, other),
        }
    }
}

#[tokio::test]
async fn test_invalid_manifest_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    write(&dir.path().join("dist/client/ssr-manifest.json"), "{ not json");

    let err = initialize(&production_config(dir.path(), "node"), &Shutdown::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StartupError::Manifest { .. }));
}

#[tokio::test]
async fn test_static_assets_served_under_both_prefixes() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    let router = boot(dir.path(), "node").await.into_router();

    for uri in ["/test/assets/app.js", "/test2/assets/app.js"] {
        let (status, headers, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        let content_type = headers.get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.contains("javascript"));
        assert_eq!(body, APP_JS);
    }
}

#[tokio::test]
async fn test_static_assets_are_compressed_on_request() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    let router = boot(dir.path(), "node").await.into_router();

    let request = Request::builder()
        .uri("/test/assets/app.js")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
}

#[tokio::test]
async fn test_unmatched_request_is_not_rendered() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    let router = boot(dir.path(), "node").await.into_router();

    let (status, _, body) = get(&router, "/assets/app.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_missing_runtime_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());

    let config = production_config(dir.path(), "ssr-dispatcher-missing-runtime");
    let err = initialize(&config, &Shutdown::new()).await.err().unwrap();
    match err {
        StartupError::Entry { path, source } => {
            assert!(path.ends_with("dist/server/entry-server.js"));
            assert!(matches!(source, RenderError::Runtime { .. }));
        }
        other => panic!("expected Entry, got {}", other),
    }
}

#[tokio::test]
async fn test_entry_that_fails_to_import_is_fatal() {
    if !node_available() {
        return;
    }
    let cases = [
        ("export function render( {", "SyntaxError"),
        ("export const title = 'no render here';", "does not export a render function"),
        ("throw new Error('config missing');", "config missing"),
    ];
    for (source, expected) in cases {
        let dir = tempfile::tempdir().unwrap();
        write_dist(dir.path());
        write(&dir.path().join("dist/server/entry-server.js"), source);

        let config = production_config(dir.path(), "node");
        let err = initialize(&config, &Shutdown::new()).await.err().unwrap();
        assert!(matches!(err, StartupError::Entry { .. }), "{}", source);
        assert!(err.to_string().contains(expected), "{}: {}", source, err);
    }
}

#[tokio::test]
async fn test_renders_through_node_entry() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    let router = boot(dir.path(), "node").await.into_router();

    let (status, headers, body) = get(&router, "/test2/about").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/html");
    assert_eq!(
        body,
        "<!DOCTYPE html><html><head><link rel=\"modulepreload\" href=\"/assets/app.js\"></head>\
         <body><div id=\"app\"><h1>/about</h1></div></body></html>"
    );

    let (status, _, body) = get(&router, "/test/boom").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("boom at /boom"));
}

#[tokio::test]
async fn test_application_stdout_does_not_corrupt_render() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    write(
        &dir.path().join("dist/server/entry-server.js"),
        r#"console.log('entry loaded');
process.stdout.write('["not", "the result"]');
export async function render(url) {
  console.log('fetching', url);
  console.info({ rows: 3 });
  process.stdout.write('partial line without newline');
  return ['<h1>ok</h1>', ''];
}
"#,
    );
    let router = boot(dir.path(), "node").await.into_router();

    for _ in 0..2 {
        let (status, _, body) = get(&router, "/test/about").await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert!(body.contains("<div id=\"app\"><h1>ok</h1></div>"));
        assert!(!body.contains("fetching"));
    }
}

#[tokio::test]
async fn test_entry_is_imported_once_and_reused() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    write(
        &dir.path().join("dist/server/entry-server.js"),
        "let n = 0;\nexport function render() {\n  n += 1;\n  return [String(n), ''];\n}\n",
    );
    let router = boot(dir.path(), "node").await.into_router();

    let (_, _, first) = get(&router, "/test/").await;
    let (_, _, second) = get(&router, "/test2/").await;
    assert!(first.contains("<div id=\"app\">1</div>"), "{}", first);
    assert!(second.contains("<div id=\"app\">2</div>"), "{}", second);
}

#[tokio::test]
async fn test_concurrent_renders_complete_out_of_order() {
    if !node_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path());
    write(
        &dir.path().join("dist/server/entry-server.js"),
        r#"export async function render(url) {
  if (url === '/slow') await new Promise((resolve) => setTimeout(resolve, 200));
  return [`<p>${url}</p>`, ''];
}
"#,
    );
    let router = boot(dir.path(), "node").await.into_router();

    let (slow, fast) = tokio::join!(get(&router, "/test/slow"), get(&router, "/test2/fast"));
    assert_eq!(slow.0, StatusCode::OK);
    assert_eq!(fast.0, StatusCode::OK);
    assert!(slow.2.contains("<p>/slow</p>"));
    assert!(fast.2.contains("<p>/fast</p>"));
}
