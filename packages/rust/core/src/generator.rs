//! Content generator bridge.
//!
//! Spawns the content-generation bridge subprocess on first use and talks
//! to it over a JSON-lines stdin/stdout protocol: the bridge announces
//! `ready`, answers each `generate` request with a `result` or `error`, and
//! exits on `shutdown`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use boardshelf_shared::{BoardshelfError, GeneratedContent, GeneratorConfig, Result};

use crate::collaborators::{ContentGenerator, GenerationRequest};

/// How long the bridge gets to exit after `shutdown` before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

/// Request message sent to the bridge.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestMessage<'a> {
    Generate {
        id: String,
        model: &'a str,
        request: &'a GenerationRequest,
    },
    Shutdown,
}

/// Response message received from the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseMessage {
    Ready,
    Result { id: String, result: BridgeResult },
    Error {
        #[allow(dead_code)]
        id: String,
        error: String,
    },
}

/// Generation result from the bridge.
#[derive(Debug, Clone, Deserialize)]
struct BridgeResult {
    #[serde(flatten)]
    content: GeneratedContent,
    #[serde(default)]
    tokens_in: u64,
    #[serde(default)]
    tokens_out: u64,
}

// ---------------------------------------------------------------------------
// Bridge handle
// ---------------------------------------------------------------------------

/// Handle to the spawned bridge subprocess.
struct BridgeHandle {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    request_counter: u64,
}

impl BridgeHandle {
    async fn spawn(config: &GeneratorConfig) -> Result<Self> {
        let working_dir = config
            .working_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(cmd = %config.bridge_cmd, script = %config.bridge_script, "spawning generator bridge");

        let mut child = Command::new(&config.bridge_cmd)
            .arg("run")
            .arg(&config.bridge_script)
            .current_dir(&working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BoardshelfError::Generation(format!(
                    "failed to spawn bridge: {e}. Is `{}` installed?",
                    config.bridge_cmd
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BoardshelfError::Generation("failed to capture bridge stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BoardshelfError::Generation("failed to capture bridge stdout".into()))?;

        let mut handle = Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            request_counter: 0,
        };

        match handle.read_message().await? {
            ResponseMessage::Ready => {
                info!("generator bridge is ready");
                Ok(handle)
            }
            other => Err(BoardshelfError::Generation(format!(
                "expected ready message, got {other:?}"
            ))),
        }
    }

    async fn read_message(&mut self) -> Result<ResponseMessage> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| BoardshelfError::Generation(format!("bridge read error: {e}")))?;

        if read == 0 {
            return Err(BoardshelfError::Generation(
                "bridge closed stdout unexpectedly".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| {
            BoardshelfError::Generation(format!(
                "invalid bridge message: {e} (got: {})",
                line.chars().take(200).collect::<String>()
            ))
        })
    }

    async fn write_message(&mut self, message: &RequestMessage<'_>) -> Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| BoardshelfError::Generation(format!("failed to serialize request: {e}")))?;

        self.stdin
            .write_all(format!("{json}\n").as_bytes())
            .await
            .map_err(|e| BoardshelfError::Generation(format!("failed to write to bridge: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| BoardshelfError::Generation(format!("failed to flush bridge stdin: {e}")))
    }

    async fn send(&mut self, model: &str, request: &GenerationRequest) -> Result<GeneratedContent> {
        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);

        self.write_message(&RequestMessage::Generate {
            id: id.clone(),
            model,
            request,
        })
        .await?;

        match self.read_message().await? {
            ResponseMessage::Result { id: resp_id, result } => {
                if resp_id != id {
                    return Err(BoardshelfError::Generation(format!(
                        "bridge answered {resp_id}, expected {id}"
                    )));
                }
                debug!(
                    tokens_in = result.tokens_in,
                    tokens_out = result.tokens_out,
                    "generation complete"
                );
                Ok(result.content)
            }
            ResponseMessage::Error { id: _, error } => Err(BoardshelfError::Generation(error)),
            ResponseMessage::Ready => Err(BoardshelfError::Generation(
                "unexpected ready message during generation".into(),
            )),
        }
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.write_message(&RequestMessage::Shutdown).await {
            debug!(error = %e, "bridge already gone");
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => info!(?status, "generator bridge exited"),
            Ok(Err(e)) => warn!("bridge wait error: {e}"),
            Err(_) => {
                warn!("bridge did not exit after shutdown, killing it");
                let _ = self.child.kill().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// BridgeGenerator
// ---------------------------------------------------------------------------

/// [`ContentGenerator`] backed by the bridge subprocess. The bridge is
/// spawned on the first request and kept until [`ContentGenerator::shutdown`].
pub struct BridgeGenerator {
    config: GeneratorConfig,
    handle: Mutex<Option<BridgeHandle>>,
}

impl BridgeGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ContentGenerator for BridgeGenerator {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent> {
        let mut guard = self.handle.lock().await;

        if guard.is_none() {
            *guard = Some(BridgeHandle::spawn(&self.config).await?);
        }
        let Some(handle) = guard.as_mut() else {
            return Err(BoardshelfError::Generation("bridge not running".into()));
        };

        match handle.send(&self.config.model, request).await {
            Ok(content) => Ok(content),
            Err(e) => {
                // The bridge may be in an unknown state; respawn on next use.
                if let Some(handle) = guard.take() {
                    handle.shutdown().await;
                }
                Err(e)
            }
        }
    }

    async fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.shutdown().await;
        }
    }
}
