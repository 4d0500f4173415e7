use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use callsite_config::BackendConfig;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::SearchError;
use crate::protocol::{decode_response, encode_request, MatchSet, SearchRequest};

/// Something that can locate the call sites of an identifier.
///
/// One call is one synchronous request/response exchange. Dropping the
/// returned future must abandon the query and release any process it holds.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn query(&self, request: &SearchRequest) -> Result<MatchSet, SearchError>;
}

/// Spawns a fresh backend process per query and talks to it over stdio.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl ProcessBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl SearchBackend for ProcessBackend {
    async fn query(&self, request: &SearchRequest) -> Result<MatchSet, SearchError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SearchError::BackendUnavailable(format!("failed to start '{}': {e}", self.command))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = encode_request(request);
            // A backend that exits without reading still gets its output decoded.
            if let Err(e) = stdin.write_all(&payload).await {
                tracing::debug!(error = %e, "Backend closed stdin early");
            }
            if let Err(e) = stdin.shutdown().await {
                tracing::debug!(error = %e, "Failed to close backend stdin");
            }
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SearchError::BackendUnavailable(format!(
                    "failed to read backend output: {e}"
                )))
            }
            Err(_) => {
                return Err(SearchError::BackendUnavailable(format!(
                    "no response within {}s",
                    self.timeout.as_secs_f32()
                )))
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!(command = %self.command, stderr = %stderr.trim(), "Backend diagnostics");
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) && !output.status.success() {
            return Err(SearchError::BackendUnavailable(format!(
                "'{}' exited with {} before responding",
                self.command, output.status
            )));
        }

        decode_response(&output.stdout)
    }
}
