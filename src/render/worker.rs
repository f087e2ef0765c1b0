//! Long-lived render worker for a precompiled server entry.
//!
//! The entry is imported once when the worker starts and every request
//! reuses that module instance, so module-level state survives between
//! renders. Requests and results are line-delimited JSON tagged with an id;
//! renders may complete out of order.
//!
//! A worker that exits is not restarted. In-flight and later renders fail
//! with `RenderError::Runtime`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::{oneshot, Mutex};

use crate::config::Mode;
use crate::render::bootstrap::{self, Call, Frame};
use crate::render::{Manifest, Render, RenderError, RenderResult};

type Waiter = oneshot::Sender<Result<RenderResult, RenderError>>;

#[derive(Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<u64, Waiter>,
}

/// `render` export of an entry module imported once in a runtime process.
pub struct ScriptWorker {
    program: String,
    module: PathBuf,
    next_id: AtomicU64,
    stdin: Mutex<ChildStdin>,
    pending: Arc<Mutex<Pending>>,
    _child: std::sync::Mutex<Child>,
}

impl ScriptWorker {
    /// Start the runtime and wait until the entry is imported.
    ///
    /// Fails when the runtime cannot start, the import throws, or the module
    /// has no `render` export.
    pub async fn spawn(
        program: impl Into<String>,
        module: impl Into<PathBuf>,
        mode: Mode,
    ) -> Result<Self, RenderError> {
        let program = program.into();
        let module = module.into();
        let module_url = bootstrap::module_url(&module, None)?;
        let nonce = bootstrap::nonce();

        let mut child = bootstrap::command(&program, &bootstrap::worker_script(), mode)
            .arg(&nonce)
            .arg(module_url.as_str())
            .spawn()
            .map_err(|e| bootstrap::runtime_error(&program, e))?;

        let missing = |stream: &str| {
            bootstrap::runtime_error(
                &program,
                io::Error::new(io::ErrorKind::BrokenPipe, format!("no {} pipe", stream)),
            )
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_logs(stderr, module.clone()));
        }

        let mut lines = BufReader::new(stdout).lines();
        wait_ready(&mut lines, &nonce, &program, &module).await?;

        let pending = Arc::new(Mutex::new(Pending::default()));
        tokio::spawn(read_results(
            lines,
            nonce,
            Arc::clone(&pending),
            program.clone(),
            module.clone(),
        ));

        tracing::info!(
            module = %module.display(),
            pid = child.id().unwrap_or_default(),
            "Render worker ready"
        );

        Ok(Self {
            program,
            module,
            next_id: AtomicU64::new(0),
            stdin: Mutex::new(stdin),
            pending,
            _child: std::sync::Mutex::new(child),
        })
    }

    pub fn module(&self) -> &Path {
        &self.module
    }

    fn runtime_error(&self, source: io::Error) -> RenderError {
        bootstrap::runtime_error(&self.program, source)
    }
}

#[async_trait]
impl Render for ScriptWorker {
    async fn render(&self, url: &str, manifest: &Manifest) -> Result<RenderResult, RenderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&Call { id, url, manifest })
            .map_err(|e| self.runtime_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err(worker_exited(&self.program));
            }
            pending.waiters.insert(id, tx);
        }

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().await.waiters.remove(&id);
            return Err(self.runtime_error(e));
        }

        rx.await.unwrap_or_else(|_| Err(worker_exited(&self.program)))
    }
}

fn worker_exited(program: &str) -> RenderError {
    bootstrap::runtime_error(
        program,
        io::Error::new(io::ErrorKind::BrokenPipe, "render worker exited"),
    )
}

async fn wait_ready(
    lines: &mut Lines<BufReader<ChildStdout>>,
    nonce: &str,
    program: &str,
    module: &Path,
) -> Result<(), RenderError> {
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| bootstrap::runtime_error(program, e))?;
        let Some(line) = line else {
            return Err(bootstrap::runtime_error(
                program,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "render worker exited before importing the entry",
                ),
            ));
        };
        match Frame::parse_line(&line, nonce) {
            None if line.is_empty() => {}
            None => tracing::debug!(module = %module.display(), output = %line, "Render output"),
            Some(Err(e)) => return Err(bootstrap::invalid_result(e)),
            Some(Ok(Frame {
                ready: Some(true), ..
            })) => return Ok(()),
            Some(Ok(frame)) => {
                return Err(RenderError::Thrown {
                    stack: frame
                        .error
                        .unwrap_or_else(|| "render worker failed to start".to_string()),
                })
            }
        }
    }
}

/// Route result frames to their waiters until the worker's stdout closes.
async fn read_results(
    mut lines: Lines<BufReader<ChildStdout>>,
    nonce: String,
    pending: Arc<Mutex<Pending>>,
    program: String,
    module: PathBuf,
) {
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(
                    module = %module.display(),
                    error = %e,
                    "Render worker read failed"
                );
                break;
            }
        };
        match Frame::parse_line(&line, &nonce) {
            None if line.is_empty() => {}
            None => tracing::debug!(module = %module.display(), output = %line, "Render output"),
            Some(Err(e)) => {
                tracing::warn!(module = %module.display(), error = %e, "Unreadable render frame")
            }
            Some(Ok(frame)) => {
                let Some(id) = frame.id else { continue };
                let waiter = pending.lock().await.waiters.remove(&id);
                if let Some(tx) = waiter {
                    let _ = tx.send(frame.into_result());
                }
            }
        }
    }

    tracing::error!(module = %module.display(), "Render worker exited");
    let mut pending = pending.lock().await;
    pending.closed = true;
    for (_, tx) in pending.waiters.drain() {
        let _ = tx.send(Err(worker_exited(&program)));
    }
}

/// Application logs (console output is redirected to stderr).
async fn forward_logs(stderr: ChildStderr, module: PathBuf) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!(module = %module.display(), "{}", line);
    }
}
