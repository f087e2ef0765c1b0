//! Static file serving with fall-through.
//!
//! A mount serves files under a URL prefix from a directory. Anything it
//! cannot serve (wrong method, outside the prefix, missing file, directory)
//! passes on to the next handler. Directory indexes are never served, so a
//! page URL always reaches the dispatcher.

use std::future::Future;
use std::path::Path;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

#[derive(Clone, Debug)]
pub struct StaticMount {
    prefix: String,
    dir: ServeDir,
}

impl StaticMount {
    /// `prefix` must start and end with `/`.
    pub fn new(prefix: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        Self {
            prefix: prefix.into(),
            dir: ServeDir::new(dir).append_index_html_on_directories(false),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path relative to the mount, or `None` when outside it.
    fn mounted_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.prefix.as_str())
    }

    /// Rewrite `request` into a request against the mounted directory, or
    /// `None` when the mount does not apply.
    fn forwarded_request(&self, request: &Request) -> Option<Request> {
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return None;
        }
        let rest = self.mounted_path(request.uri().path())?;
        let uri = match request.uri().query() {
            Some(q) => format!("/{}?{}", rest, q),
            None => format!("/{}", rest),
        };

        let mut builder = Request::builder().method(request.method().clone()).uri(uri);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        builder.body(Body::empty()).ok()
    }

    /// Serve `request` from the directory, or `None` to fall through.
    ///
    /// The returned future owns everything it needs; `request` is only read
    /// up front.
    pub fn try_serve(
        &self,
        request: &Request,
    ) -> impl Future<Output = Option<Response>> + Send + 'static {
        let forwarded = self.forwarded_request(request);
        let dir = self.dir.clone();
        async move {
            let response = dir.oneshot(forwarded?).await.ok()?;
            if response.status() == StatusCode::NOT_FOUND {
                return None;
            }
            Some(response.map(Body::new))
        }
    }

    /// Add this mount in front of `router`.
    pub fn install(self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(self, serve_static))
    }
}

async fn serve_static(State(mount): State<StaticMount>, request: Request, next: Next) -> Response {
    let serving = mount.try_serve(&request);
    match serving.await {
        Some(response) => response,
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_file_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();

        let mount = StaticMount::new("/test/", dir.path());
        let response = mount.try_serve(&get("/test/assets/app.js?v=1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"console.log(1)");
    }

    #[tokio::test]
    async fn test_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("about")).unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("about/index.html"), "<html></html>").unwrap();

        let mount = StaticMount::new("/test/", dir.path());
        // Outside the prefix.
        assert!(mount.try_serve(&get("/other/index.html")).await.is_none());
        // Missing file.
        assert!(mount.try_serve(&get("/test/missing")).await.is_none());
        // Directory requests never serve an index.
        assert!(mount.try_serve(&get("/test/")).await.is_none());
        assert!(mount.try_serve(&get("/test/about")).await.is_none());
        assert!(mount.try_serve(&get("/test/about/")).await.is_none());

        let post = Request::builder()
            .method(Method::POST)
            .uri("/test/index.html")
            .body(Body::empty())
            .unwrap();
        assert!(mount.try_serve(&post).await.is_none());
    }

    fn assert_send_static<T: Send + 'static>(_: &T) {}

    #[tokio::test]
    async fn test_installed_mount_serves_then_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("robots.txt"), "User-agent: *").unwrap();

        let mount = StaticMount::new("/test2/", dir.path());
        let request = get("/test2/robots.txt");
        let serving = mount.try_serve(&request);
        drop(request);
        assert_send_static(&serving);
        assert!(serving.await.is_some());

        let router = mount.install(Router::new().fallback(|| async { "next" }));
        let body = |response: Response| async move {
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            String::from_utf8(bytes.to_vec()).unwrap()
        };

        let hit = router.clone().oneshot(get("/test2/robots.txt")).await.unwrap();
        assert_eq!(body(hit).await, "User-agent: *");
        let miss = router.oneshot(get("/test2/about")).await.unwrap();
        assert_eq!(body(miss).await, "next");
    }
}
