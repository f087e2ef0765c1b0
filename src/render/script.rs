//! Entry modules run in a fresh runtime process per render.
//!
//! Used in development, where every request must see the current source:
//! the runtime imports the entry, awaits `render(url, manifest)` once and
//! emits a single result frame. The manifest travels over stdin.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::Mode;
use crate::render::bootstrap::{self, Frame};
use crate::render::{Manifest, Render, RenderError, RenderResult};

/// `render` export of one entry module, run out of process.
#[derive(Debug, Clone)]
pub struct ScriptRender {
    program: String,
    module: PathBuf,
    mode: Mode,
    version: Option<u64>,
}

impl ScriptRender {
    /// `module` must be an absolute path.
    pub fn new(program: impl Into<String>, module: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            program: program.into(),
            module: module.into(),
            mode,
            version: None,
        }
    }

    /// Tag the module URL with a source generation so each edit yields a
    /// distinct module identity.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn module(&self) -> &Path {
        &self.module
    }

    pub fn module_url(&self) -> Result<Url, RenderError> {
        bootstrap::module_url(&self.module, self.version)
    }

    fn runtime_error(&self, source: io::Error) -> RenderError {
        bootstrap::runtime_error(&self.program, source)
    }
}

#[async_trait]
impl Render for ScriptRender {
    async fn render(&self, url: &str, manifest: &Manifest) -> Result<RenderResult, RenderError> {
        let module_url = self.module_url()?;
        let input = manifest
            .to_json()
            .map_err(|e| self.runtime_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let nonce = bootstrap::nonce();

        let mut child = bootstrap::command(&self.program, &bootstrap::oneshot_script(), self.mode)
            .arg(&nonce)
            .arg(module_url.as_str())
            .arg(url)
            .spawn()
            .map_err(|e| self.runtime_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A runtime that dies before reading stdin reports through stderr.
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(self.runtime_error(e));
                }
            }
        }

        let output = child.wait_with_output().await.map_err(|e| self.runtime_error(e))?;

        tracing::trace!(
            module = %self.module.display(),
            url = %url,
            status = %output.status,
            "Render runtime exited"
        );

        interpret_output(
            output.status.success(),
            &output.stdout,
            &output.stderr,
            &nonce,
        )
    }
}

/// Map the runtime's exit status and streams to a render outcome.
///
/// The last frame on stdout wins; without one, a failed exit reports stderr.
fn interpret_output(
    success: bool,
    stdout: &[u8],
    stderr: &[u8],
    nonce: &str,
) -> Result<RenderResult, RenderError> {
    let stdout = String::from_utf8_lossy(stdout);
    let mut frame = None;
    for line in stdout.lines() {
        match Frame::parse_line(line, nonce) {
            Some(parsed) => frame = Some(parsed),
            None if !line.is_empty() => tracing::debug!(output = %line, "Render output"),
            None => {}
        }
    }
    for line in String::from_utf8_lossy(stderr).lines() {
        tracing::debug!(output = %line, "Render log");
    }

    match frame {
        Some(Ok(frame)) => frame.into_result(),
        Some(Err(e)) => Err(bootstrap::invalid_result(e)),
        None if success => Err(bootstrap::invalid_result("runtime exited without a result")),
        None => {
            let stack = String::from_utf8_lossy(stderr).trim_end().to_string();
            Err(RenderError::Thrown {
                stack: if stack.is_empty() {
                    "render runtime exited with a failure status".to_string()
                } else {
                    stack
                },
            })
        }
    }
}
