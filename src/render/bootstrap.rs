//! Runtime-side bootstrap scripts and the result framing they share.
//!
//! Application code writes to the child's stdout as freely as the bootstrap
//! does, so results travel as frames: a line that starts with a per-process
//! nonce, followed by JSON. Every other stdout line is application output.
//! `console.log`, `console.info` and `console.debug` are sent to stderr
//! before the entry is imported.

use std::io;
use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use url::Url;

use crate::config::Mode;
use crate::render::{Manifest, RenderError, RenderResult};

const PRELUDE: &str = r#"
for (const level of ['log', 'info', 'debug']) {
  console[level] = (...args) => console.error(...args);
}
const describe = (err) => String((err && err.stack) || err);
const emit = (nonce, value) =>
  new Promise((resolve) => process.stdout.write(`\n${nonce}${JSON.stringify(value)}\n`, resolve));
"#;

/// Import, render once, emit one frame, exit.
const ONESHOT: &str = r#"
const [nonce, moduleUrl, url] = process.argv.slice(-3);
let input = '';
for await (const chunk of process.stdin) input += chunk;
let frame;
try {
  const mod = await import(moduleUrl);
  const result = await mod.render(url, JSON.parse(input || '{}'));
  frame = { ok: result === undefined ? null : result };
} catch (err) {
  frame = { error: describe(err) };
}
await emit(nonce, frame);
process.exit(0);
"#;

/// Import once, report readiness, then answer id-tagged request lines.
const WORKER: &str = r#"
const [nonce, moduleUrl] = process.argv.slice(-2);
let mod;
try {
  mod = await import(moduleUrl);
  if (typeof mod.render !== 'function') {
    throw new Error(`${moduleUrl} does not export a render function`);
  }
} catch (err) {
  await emit(nonce, { ready: false, error: describe(err) });
  process.exit(1);
}
await emit(nonce, { ready: true });
const { createInterface } = await import('node:readline');
for await (const line of createInterface({ input: process.stdin, crlfDelay: Infinity })) {
  if (!line.trim()) continue;
  const { id, url, manifest } = JSON.parse(line);
  Promise.resolve()
    .then(() => mod.render(url, manifest))
    .then(
      (result) => emit(nonce, { id, ok: result === undefined ? null : result }),
      (err) => emit(nonce, { id, error: describe(err) }),
    )
    .catch((err) => emit(nonce, { id, error: describe(err) }));
}
process.exit(0);
"#;

pub(crate) fn oneshot_script() -> String {
    [PRELUDE, ONESHOT].concat()
}

pub(crate) fn worker_script() -> String {
    [PRELUDE, WORKER].concat()
}

/// Fresh frame marker for one runtime process.
pub(crate) fn nonce() -> String {
    format!("@ssr:{}:", uuid::Uuid::new_v4().simple())
}

/// Runtime invocation with piped stdio; script arguments are appended by
/// the caller.
pub(crate) fn command(program: &str, script: &str, mode: Mode) -> Command {
    let mut command = Command::new(program);
    command
        .arg("--input-type=module")
        .arg("-e")
        .arg(script)
        .env("NODE_ENV", mode.as_env_value())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

/// `file://` URL of an absolute module path, tagged with `?v=N` if versioned.
pub(crate) fn module_url(module: &Path, version: Option<u64>) -> Result<Url, RenderError> {
    let mut url = Url::from_file_path(module).map_err(|_| RenderError::ModuleNotFound {
        path: module.to_path_buf(),
    })?;
    if let Some(v) = version {
        url.set_query(Some(&format!("v={}", v)));
    }
    Ok(url)
}

pub(crate) fn runtime_error(program: &str, source: io::Error) -> RenderError {
    RenderError::Runtime {
        program: program.to_string(),
        source,
    }
}

pub(crate) fn invalid_result(detail: impl std::fmt::Display) -> RenderError {
    RenderError::InvalidResult {
        detail: format!("expected [appHtml, preloadLinks]: {}", detail),
    }
}

/// One request line sent to a worker.
#[derive(Debug, Serialize)]
pub(crate) struct Call<'a> {
    pub id: u64,
    pub url: &'a str,
    pub manifest: &'a Manifest,
}

/// One result frame emitted by either bootstrap.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Frame {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub ok: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Frame {
    /// `None` for application output, otherwise the decoded frame.
    pub fn parse_line(line: &str, nonce: &str) -> Option<Result<Frame, serde_json::Error>> {
        let json = line.strip_prefix(nonce)?;
        Some(serde_json::from_str(json))
    }

    pub fn into_result(self) -> Result<RenderResult, RenderError> {
        if let Some(stack) = self.error {
            return Err(RenderError::Thrown { stack });
        }
        let (app_html, preload_links): (String, String) =
            serde_json::from_value(self.ok.unwrap_or(Value::Null)).map_err(invalid_result)?;
        Ok(RenderResult {
            app_html,
            preload_links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONCE: &str = "@ssr:0123:";

    #[test]
    fn test_parse_line_ignores_application_output() {
        assert!(Frame::parse_line("fetching /about", NONCE).is_none());
        assert!(Frame::parse_line(r#"["<h1>spoof</h1>", ""]"#, NONCE).is_none());
        assert!(Frame::parse_line("", NONCE).is_none());

        let frame = Frame::parse_line(r#"@ssr:0123:{"id":4,"ok":["<p/>",""]}"#, NONCE)
            .unwrap()
            .unwrap();
        assert_eq!(frame.id, Some(4));
        assert_eq!(frame.into_result().unwrap(), RenderResult::new("<p/>", ""));
    }

    #[test]
    fn test_frame_outcomes() {
        let thrown = Frame {
            error: Some("Error: boom".into()),
            ..Frame::default()
        };
        assert_eq!(thrown.into_result().unwrap_err().detail(), "Error: boom");

        let null = Frame::parse_line(r#"@ssr:0123:{"ok":null}"#, NONCE).unwrap().unwrap();
        assert!(matches!(null.into_result(), Err(RenderError::InvalidResult { .. })));

        let short = Frame::parse_line(r#"@ssr:0123:{"ok":["a"]}"#, NONCE).unwrap().unwrap();
        assert!(matches!(short.into_result(), Err(RenderError::InvalidResult { .. })));
    }

    #[test]
    fn test_ready_frame() {
        let frame = Frame::parse_line(r#"@ssr:0123:{"ready":true}"#, NONCE).unwrap().unwrap();
        assert_eq!(frame.ready, Some(true));
        assert!(frame.id.is_none());
    }

    #[test]
    fn test_scripts_redirect_console_first() {
        for script in [oneshot_script(), worker_script()] {
            let redirect = script.find("console[level]").unwrap();
            let import = script.find("await import(moduleUrl)").unwrap();
            assert!(redirect < import);
        }
        assert_ne!(nonce(), nonce());
    }

    #[test]
    fn test_call_line_shape() {
        let manifest: Manifest = [("a".to_string(), vec!["/b.js".to_string()])]
            .into_iter()
            .collect();
        let line = serde_json::to_string(&Call {
            id: 7,
            url: "/x?y=1",
            manifest: &manifest,
        })
        .unwrap();
        assert_eq!(line, r#"{"id":7,"url":"/x?y=1","manifest":{"a":["/b.js"]}}"#);
    }

    #[cfg(unix)]
    #[test]
    fn test_module_url_versioned() {
        let url = module_url(Path::new("/app/src/entry-server.js"), Some(7)).unwrap();
        assert_eq!(url.as_str(), "file:///app/src/entry-server.js?v=7");
    }

    #[test]
    fn test_relative_module_rejected() {
        assert!(matches!(
            module_url(Path::new("src/entry-server.js"), None),
            Err(RenderError::ModuleNotFound { .. })
        ));
    }
}
