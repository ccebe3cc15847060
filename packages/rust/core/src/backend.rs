//! Inference backend abstraction and the subprocess bridge implementation.
//!
//! The pipeline only needs "given text, return text". [`InferenceBackend`] is
//! that capability; [`BridgeBackend`] provides it by spawning a model-serving
//! subprocess and exchanging JSON lines over its stdin/stdout.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pagewise_shared::{BackendConfig, PagewiseError, Result};

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// An extractive answer produced by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendAnswer {
    pub answer: String,
    pub confidence: f32,
}

/// A learned text-to-text backend. Calls may be slow and may fail.
pub trait InferenceBackend: Send + Sync {
    /// Extract an answer to `question` from `context`.
    fn answer(&self, question: &str, context: &str) -> Result<BackendAnswer>;

    /// Summarize `text`.
    fn summarize(&self, text: &str) -> Result<String>;

    /// Interrupt calls in flight after the caller gave up on them.
    ///
    /// Backends that cannot be interrupted keep the default no-op.
    fn abort(&self) {}
}

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

/// Request message sent to the bridge.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestMessage<'a> {
    Answer {
        id: String,
        question: &'a str,
        context: &'a str,
        max_answer_len: u32,
        handle_impossible_answer: bool,
    },
    Summarize {
        id: String,
        text: &'a str,
        max_length: u32,
        min_length: u32,
    },
    Shutdown,
}

/// Response message received from the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseMessage {
    Ready,
    Answer {
        id: String,
        answer: String,
        score: f32,
    },
    Summary {
        id: String,
        text: String,
    },
    Error {
        #[allow(dead_code)]
        id: Option<String>,
        error: String,
    },
}

// ---------------------------------------------------------------------------
// Bridge config
// ---------------------------------------------------------------------------

/// How to launch the bridge and what generation limits to request.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Interpreter or executable (e.g., "python3").
    pub command: String,
    /// Script passed as the first argument.
    pub script: String,
    /// Working directory for the subprocess.
    pub working_dir: String,
    pub summary_max_length: u32,
    pub summary_min_length: u32,
    pub max_answer_length: u32,
}

impl From<&BackendConfig> for BridgeConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            command: config.command.clone(),
            script: config.script.clone(),
            working_dir: config.working_dir.clone(),
            summary_max_length: config.summary_max_length,
            summary_min_length: config.summary_min_length,
            max_answer_length: config.max_answer_length,
        }
    }
}

// ---------------------------------------------------------------------------
// Bridge handle
// ---------------------------------------------------------------------------

/// Grace period for the bridge to exit after `shutdown` before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Pipes to the spawned bridge subprocess.
///
/// The child process itself is owned separately so it can be killed while a
/// call holds these pipes.
struct BridgeHandle {
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    request_counter: u64,
}

impl BridgeHandle {
    fn next_id(&mut self) -> String {
        self.request_counter += 1;
        format!("req-{}", self.request_counter)
    }

    fn send(&mut self, request: &RequestMessage<'_>) -> Result<()> {
        let json = serde_json::to_string(request).map_err(|e| {
            PagewiseError::backend(format!("failed to serialize request: {e}"))
        })?;

        writeln!(self.stdin, "{json}").map_err(|e| {
            PagewiseError::backend(format!("failed to write to bridge stdin: {e}"))
        })?;
        self.stdin
            .flush()
            .map_err(|e| PagewiseError::backend(format!("failed to flush bridge stdin: {e}")))
    }

    /// Send one request and read one response.
    fn round_trip(&mut self, request: &RequestMessage<'_>) -> Result<ResponseMessage> {
        self.send(request)?;

        match self.read_message()? {
            ResponseMessage::Error { error, .. } => Err(PagewiseError::Backend(error)),
            ResponseMessage::Ready => Err(PagewiseError::backend(
                "unexpected ready message during inference",
            )),
            response => Ok(response),
        }
    }

    fn read_message(&mut self) -> Result<ResponseMessage> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| PagewiseError::backend(format!("bridge read error: {e}")))?;

        if line.is_empty() {
            return Err(PagewiseError::backend("bridge closed stdout unexpectedly"));
        }

        parse_response(&line)
    }
}

fn parse_response(line: &str) -> Result<ResponseMessage> {
    serde_json::from_str(line.trim()).map_err(|e| {
        let preview: String = line.chars().take(200).collect();
        PagewiseError::parse(format!("invalid bridge message: {e} (got: {preview})"))
    })
}

/// Kill the child if it is still running, then reap it.
fn kill_and_reap(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(?status, "bridge already exited");
            return;
        }
        Ok(None) => {}
        Err(e) => warn!("bridge status error: {e}"),
    }

    if let Err(e) = child.kill() {
        warn!("failed to kill bridge: {e}");
    }
    match child.wait() {
        Ok(status) => info!(?status, "bridge killed"),
        Err(e) => warn!("bridge wait error: {e}"),
    }
}

/// Wait up to `grace` for the child to exit on its own, then kill it.
fn reap_within(child: &mut Child, grace: Duration) {
    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(status)) => {
                info!(?status, "bridge exited");
                return;
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(20)),
            Err(e) => {
                warn!("bridge status error: {e}");
                break;
            }
        }
    }
    kill_and_reap(child);
}

// ---------------------------------------------------------------------------
// Bridge backend
// ---------------------------------------------------------------------------

/// [`InferenceBackend`] served by a JSON-lines subprocess.
///
/// Requests are serialized through a mutex; the bridge handles one at a time.
/// [`InferenceBackend::abort`] kills the subprocess, which unblocks any call
/// waiting on it.
pub struct BridgeBackend {
    handle: Mutex<BridgeHandle>,
    child: Mutex<Child>,
    config: BridgeConfig,
}

impl BridgeBackend {
    /// Spawn the bridge and block until the model reports ready.
    ///
    /// The subprocess is killed if the handshake fails.
    pub fn spawn(config: BridgeConfig) -> Result<Self> {
        let bridge = Self::launch(config)?;
        bridge.wait_until_ready()?;
        Ok(bridge)
    }

    /// Start the subprocess without waiting for the ready message.
    ///
    /// Pair with [`BridgeBackend::wait_until_ready`] when the handshake needs
    /// its own time limit.
    pub fn launch(config: BridgeConfig) -> Result<Self> {
        let script_path = Path::new(&config.working_dir).join(&config.script);
        if !script_path.is_file() {
            return Err(PagewiseError::backend(format!(
                "bridge script not found at {}; set backend.script in the config",
                script_path.display()
            )));
        }

        info!(cmd = %config.command, script = %config.script, "spawning inference bridge");

        let mut child = Command::new(&config.command)
            .arg(&config.script)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                PagewiseError::backend(format!(
                    "failed to spawn bridge: {e}. Is `{}` installed?",
                    config.command
                ))
            })?;

        let pipes = child.stdin.take().zip(child.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            kill_and_reap(&mut child);
            return Err(PagewiseError::backend("failed to capture bridge stdio"));
        };

        Ok(Self {
            handle: Mutex::new(BridgeHandle {
                stdin,
                reader: BufReader::new(stdout),
                request_counter: 0,
            }),
            child: Mutex::new(child),
            config,
        })
    }

    /// Read the bridge's first message. Anything but `ready` kills it.
    pub fn wait_until_ready(&self) -> Result<()> {
        let result = self.with_handle(|handle| match handle.read_message()? {
            ResponseMessage::Ready => Ok(()),
            ResponseMessage::Error { error, .. } => {
                Err(PagewiseError::backend(format!("bridge failed to load: {error}")))
            }
            other => Err(PagewiseError::backend(format!(
                "expected ready message, got: {other:?}"
            ))),
        });

        match result {
            Ok(()) => {
                info!("bridge is ready");
                Ok(())
            }
            Err(e) => {
                self.kill();
                Err(e)
            }
        }
    }

    /// Kill the subprocess. Calls blocked on it fail with a backend error.
    pub fn kill(&self) {
        match self.child.lock() {
            Ok(mut child) => kill_and_reap(&mut child),
            Err(_) => warn!("bridge child handle poisoned, cannot kill"),
        }
    }

    fn with_handle<T>(&self, f: impl FnOnce(&mut BridgeHandle) -> Result<T>) -> Result<T> {
        let mut handle = self
            .handle
            .lock()
            .map_err(|_| PagewiseError::backend("bridge handle poisoned by an earlier panic"))?;
        f(&mut handle)
    }
}

impl InferenceBackend for BridgeBackend {
    fn answer(&self, question: &str, context: &str) -> Result<BackendAnswer> {
        self.with_handle(|handle| {
            let id = handle.next_id();
            debug!(%id, context_len = context.len(), "sending answer request");
            let request = RequestMessage::Answer {
                id: id.clone(),
                question,
                context,
                max_answer_len: self.config.max_answer_length,
                handle_impossible_answer: true,
            };

            match handle.round_trip(&request)? {
                ResponseMessage::Answer {
                    id: resp_id,
                    answer,
                    score,
                } => {
                    debug_assert_eq!(resp_id, id);
                    Ok(BackendAnswer {
                        answer,
                        confidence: score,
                    })
                }
                other => Err(PagewiseError::backend(format!(
                    "expected answer response, got: {other:?}"
                ))),
            }
        })
    }

    fn summarize(&self, text: &str) -> Result<String> {
        self.with_handle(|handle| {
            let id = handle.next_id();
            debug!(%id, text_len = text.len(), "sending summarize request");
            let request = RequestMessage::Summarize {
                id: id.clone(),
                text,
                max_length: self.config.summary_max_length,
                min_length: self.config.summary_min_length,
            };

            match handle.round_trip(&request)? {
                ResponseMessage::Summary { id: resp_id, text } => {
                    debug_assert_eq!(resp_id, id);
                    Ok(text)
                }
                other => Err(PagewiseError::backend(format!(
                    "expected summary response, got: {other:?}"
                ))),
            }
        })
    }

    fn abort(&self) {
        warn!("aborting inference bridge");
        self.kill();
    }
}

impl Drop for BridgeBackend {
    fn drop(&mut self) {
        if let Ok(handle) = self.handle.get_mut() {
            let _ = handle.send(&RequestMessage::Shutdown);
        }
        if let Ok(child) = self.child.get_mut() {
            reap_within(child, SHUTDOWN_GRACE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_request_serializes_correctly() {
        let msg = RequestMessage::Answer {
            id: "req-1".into(),
            question: "When?",
            context: "Tomorrow.",
            max_answer_len: 200,
            handle_impossible_answer: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"answer""#));
        assert!(json.contains(r#""id":"req-1""#));
        assert!(json.contains(r#""question":"When?""#));
        assert!(json.contains(r#""handle_impossible_answer":true"#));
    }

    #[test]
    fn summarize_request_carries_length_limits() {
        let msg = RequestMessage::Summarize {
            id: "req-2".into(),
            text: "Long text",
            max_length: 150,
            min_length: 50,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"summarize""#));
        assert!(json.contains(r#""max_length":150"#));
        assert!(json.contains(r#""min_length":50"#));
    }

    #[test]
    fn shutdown_message_serializes_correctly() {
        let json = serde_json::to_string(&RequestMessage::Shutdown).unwrap();
        assert_eq!(json, r#"{"type":"shutdown"}"#);
    }

    #[test]
    fn response_deserializes_ready() {
        let msg = parse_response("{\"type\":\"ready\"}\n").unwrap();
        assert!(matches!(msg, ResponseMessage::Ready));
    }

    #[test]
    fn response_deserializes_answer() {
        let json = r#"{"type":"answer","id":"req-1","answer":"March 1","score":0.87}"#;
        match parse_response(json).unwrap() {
            ResponseMessage::Answer { id, answer, score } => {
                assert_eq!(id, "req-1");
                assert_eq!(answer, "March 1");
                assert!((score - 0.87).abs() < 1e-6);
            }
            other => panic!("expected Answer, got {other:?}"),
        }
    }

    #[test]
    fn response_deserializes_summary() {
        let json = r#"{"type":"summary","id":"req-3","text":"Short."}"#;
        match parse_response(json).unwrap() {
            ResponseMessage::Summary { id, text } => {
                assert_eq!(id, "req-3");
                assert_eq!(text, "Short.");
            }
            other => panic!("expected Summary, got {other:?}"),
        }
    }

    #[test]
    fn response_deserializes_error_without_id() {
        let json = r#"{"type":"error","error":"model not loaded"}"#;
        match parse_response(json).unwrap() {
            ResponseMessage::Error { id, error } => {
                assert!(id.is_none());
                assert_eq!(error, "model not loaded");
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn garbage_response_is_a_parse_error() {
        let err = parse_response("not json at all").unwrap_err();
        assert!(matches!(err, PagewiseError::Parse { .. }));
    }

    /// Bridge config running `body` as a shell script in `dir`.
    fn script_bridge(dir: &tempfile::TempDir, body: &str) -> BridgeConfig {
        let path = dir.path().join("bridge.sh");
        std::fs::write(&path, body).unwrap();
        BridgeConfig {
            command: "sh".into(),
            script: "bridge.sh".into(),
            working_dir: dir.path().to_string_lossy().into_owned(),
            summary_max_length: 150,
            summary_min_length: 50,
            max_answer_length: 200,
        }
    }

    #[test]
    fn spawning_missing_command_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = script_bridge(&dir, "exit 0\n");
        config.command = "pagewise-test-no-such-binary-12345".into();
        let err = BridgeBackend::spawn(config).err().expect("spawn should fail");
        assert!(err.to_string().contains("failed to spawn bridge"));
    }

    #[test]
    fn missing_script_is_reported_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = script_bridge(&dir, "exit 0\n");
        config.script = "no-such-bridge.py".into();
        let err = BridgeBackend::spawn(config).err().expect("spawn should fail");
        assert!(err.to_string().contains("bridge script not found"));
    }

    #[cfg(unix)]
    #[test]
    fn bridge_answers_over_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_bridge(
            &dir,
            "echo '{\"type\":\"ready\"}'\n\
             read line\n\
             echo '{\"type\":\"answer\",\"id\":\"req-1\",\"answer\":\"March 1\",\"score\":0.8}'\n\
             read line\n",
        );
        let bridge = BridgeBackend::spawn(config).unwrap();
        let answer = bridge.answer("When?", "The deadline is March 1.").unwrap();
        assert_eq!(answer.answer, "March 1");
        assert!((answer.confidence - 0.8).abs() < 1e-6);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_handshake_kills_the_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_bridge(
            &dir,
            "echo $$ > pid\n\
             echo '{\"type\":\"error\",\"error\":\"model load failed\"}'\n\
             exec sleep 30\n",
        );
        let err = BridgeBackend::spawn(config).err().expect("handshake should fail");
        assert!(err.to_string().contains("model load failed"));

        let pid = std::fs::read_to_string(dir.path().join("pid")).unwrap();
        let proc_dir = format!("/proc/{}", pid.trim());
        assert!(!Path::new(&proc_dir).exists(), "bridge {proc_dir} still running");
    }

    #[cfg(unix)]
    #[test]
    fn abort_unblocks_a_stuck_call() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_bridge(&dir, "echo '{\"type\":\"ready\"}'\nexec sleep 30\n");
        let bridge = std::sync::Arc::new(BridgeBackend::spawn(config).unwrap());

        let caller = {
            let bridge = std::sync::Arc::clone(&bridge);
            std::thread::spawn(move || bridge.summarize("text"))
        };
        std::thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        bridge.abort();
        let result = caller.join().unwrap();
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn bridge_config_from_backend_config() {
        let config = BridgeConfig::from(&BackendConfig::default());
        assert_eq!(config.command, "python3");
        assert_eq!(config.summary_max_length, 150);
        assert_eq!(config.max_answer_length, 200);
    }
}
