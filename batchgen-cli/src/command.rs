//! Generator that pipes each segment through a shell command.

use anyhow::{Context, Result};
use async_trait::async_trait;
use batchgen::{Continuation, Generator, Segment};
use log::debug;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub const ENV_INDEX: &str = "BATCHGEN_INDEX";
pub const ENV_TOTAL: &str = "BATCHGEN_TOTAL";
pub const ENV_CONTEXT: &str = "BATCHGEN_CONTEXT";

/// Runs `sh -c <command>` per segment: segment text on stdin, artifact on stdout.
pub struct ShellGenerator {
    command: String,
    total: usize,
    timeout: Option<Duration>,
    history: Option<History>,
}

/// Accepted output per segment index, for continuation runs.
struct History {
    tail_chars: usize,
    accepted: Mutex<BTreeMap<usize, String>>,
}

impl ShellGenerator {
    pub fn new(command: impl Into<String>, total: usize) -> Self {
        Self {
            command: command.into(),
            total,
            timeout: None,
            history: None,
        }
    }

    /// Kill the command if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Pass the last `tail_chars` of earlier output as `BATCHGEN_CONTEXT` and
    /// trim echoes of it.
    ///
    /// The context for segment `k` is always built from the accepted output of
    /// segments before `k`, so a segment re-run in a retry pass never sees
    /// output that came after it.
    pub fn with_continuation(mut self, tail_chars: usize) -> Self {
        self.history = Some(History {
            tail_chars,
            accepted: Mutex::new(BTreeMap::new()),
        });
        self
    }

    fn continuation_for(&self, index: usize) -> Option<Continuation> {
        let history = self.history.as_ref()?;
        let accepted = history.accepted.lock().unwrap_or_else(|e| e.into_inner());

        let mut continuation = Continuation::new(history.tail_chars);
        for text in accepted.range(..index).map(|(_, text)| text) {
            continuation.record(text);
        }
        Some(continuation)
    }

    fn remember(&self, index: usize, text: &str) {
        if let Some(history) = &self.history {
            history
                .accepted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(index, text.to_string());
        }
    }

    async fn exec(&self, segment: &Segment, context: Option<String>) -> Result<Vec<u8>> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .env(ENV_INDEX, segment.index.to_string())
            .env(ENV_TOTAL, self.total.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Keep the child out of the terminal's foreground group so Ctrl-C
        // reaches only batchgen and the segment in flight can finish.
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(context) = context {
            cmd.env(ENV_CONTEXT, context);
        }

        let mut child = cmd.spawn().context("Failed to spawn generator command")?;

        // Commands that ignore stdin may exit before reading it.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(segment.text.as_bytes()).await {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(e).context("Failed to write to generator stdin");
                }
            }
        }

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .context("Generator command timed out")?,
            None => child.wait_with_output().await,
        }
        .context("Failed to get generator output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Generator command failed ({}): {}", output.status, stderr.trim());
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl Generator for ShellGenerator {
    type Artifact = String;

    async fn generate(&self, segment: &Segment) -> Result<String> {
        let continuation = self.continuation_for(segment.index);
        let context = continuation
            .as_ref()
            .and_then(|c| c.context())
            .map(str::to_string);
        debug!(
            "Running command for segment {} ({} chars, context: {})",
            segment.index,
            segment.char_count,
            context.is_some()
        );

        let stdout = self.exec(segment, context).await?;
        let text = String::from_utf8_lossy(&stdout).trim_end().to_string();

        match continuation {
            Some(mut continuation) => {
                let trimmed = continuation.accept(&text);
                self.remember(segment.index, &trimmed);
                Ok(trimmed)
            }
            None => Ok(text),
        }
    }

    fn name(&self) -> &str {
        &self.command
    }
}
