//! Inference backend startup and per-call timeouts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pagewise_core::{BackendAnswer, BridgeBackend, BridgeConfig, InferenceBackend};
use pagewise_shared::{BackendConfig, PagewiseError, Result};
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Bounds every call on the wrapped backend by a timeout.
///
/// After the first timeout the backend is disabled for the rest of the run
/// and every later call fails immediately, so callers fall back without
/// waiting again. The timed-out call is aborted on the inner backend so its
/// worker thread does not outlive the run. Calls must be made from a blocking worker thread
/// (`spawn_blocking`), never from async code.
pub(crate) struct TimeoutBackend {
    inner: Arc<dyn InferenceBackend>,
    timeout: Duration,
    runtime: Handle,
    disabled: AtomicBool,
}

impl TimeoutBackend {
    pub(crate) fn new(inner: Arc<dyn InferenceBackend>, timeout: Duration, runtime: Handle) -> Self {
        Self {
            inner,
            timeout,
            runtime,
            disabled: AtomicBool::new(false),
        }
    }

    fn call<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn InferenceBackend) -> Result<T> + Send + 'static,
    {
        if self.disabled.load(Ordering::Acquire) {
            return Err(PagewiseError::backend("backend disabled after an earlier timeout"));
        }

        let inner = Arc::clone(&self.inner);
        let task = self.runtime.spawn_blocking(move || f(inner.as_ref()));

        match self.runtime.block_on(tokio::time::timeout(self.timeout, task)) {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(PagewiseError::backend(format!(
                "{op} call panicked: {join_err}"
            ))),
            Err(_) => {
                self.disabled.store(true, Ordering::Release);
                warn!(op, timeout_secs = self.timeout.as_secs(), "backend call timed out, disabling backend");
                self.inner.abort();
                Err(PagewiseError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

impl InferenceBackend for TimeoutBackend {
    fn answer(&self, question: &str, context: &str) -> Result<BackendAnswer> {
        let question = question.to_string();
        let context = context.to_string();
        self.call("answer", move |backend| backend.answer(&question, &context))
    }

    fn summarize(&self, text: &str) -> Result<String> {
        let text = text.to_string();
        self.call("summarize", move |backend| backend.summarize(&text))
    }

    fn abort(&self) {
        self.inner.abort();
    }
}

/// Start the configured backend, or `None` when it is disabled or fails to
/// start. Startup failure is not fatal: every command has a fallback.
pub(crate) async fn start_backend(
    config: &BackendConfig,
    no_backend: bool,
) -> Option<Arc<dyn InferenceBackend>> {
    if no_backend || !config.enabled {
        info!("inference backend disabled, using fallbacks");
        return None;
    }

    let bridge = match BridgeBackend::launch(BridgeConfig::from(config)) {
        Ok(bridge) => Arc::new(bridge),
        Err(e) => {
            warn!(error = %e, "failed to start inference backend, using fallbacks");
            return None;
        }
    };

    let startup = Duration::from_secs(config.startup_timeout_secs);
    let waiter = Arc::clone(&bridge);
    let ready = tokio::time::timeout(
        startup,
        tokio::task::spawn_blocking(move || waiter.wait_until_ready()),
    )
    .await;

    match ready {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => {
            warn!(error = %e, "inference backend failed to load, using fallbacks");
            return None;
        }
        Ok(Err(e)) => {
            warn!(error = %e, "backend startup task failed, using fallbacks");
            bridge.kill();
            return None;
        }
        Err(_) => {
            warn!(
                timeout_secs = startup.as_secs(),
                "inference backend did not become ready, using fallbacks"
            );
            bridge.kill();
            return None;
        }
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    Some(Arc::new(TimeoutBackend::new(bridge, timeout, Handle::current())))
}
