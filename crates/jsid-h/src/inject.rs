use chromiumoxide::Page;
use jsid_engine::error::DriverError;
use std::time::Duration;
use thiserror::Error;

pub const ACTION_TRACKER_JS: &str = include_str!("js/action_tracker.js");
pub const MUTATION_OBSERVER_JS: &str = include_str!("js/mutation_observer.js");

/// Returns the pending actions without clearing them.
pub const READ_ACTIONS_JS: &str =
    "(() => window.__jsidTracker ? window.__jsidTracker.read() : [])()";
/// Returns the pending actions and clears them in the same turn of the event loop.
pub const DRAIN_ACTIONS_JS: &str =
    "(() => window.__jsidTracker ? window.__jsidTracker.drain() : [])()";
pub const CLEAR_ACTIONS_JS: &str =
    "(() => { if (window.__jsidTracker) { window.__jsidTracker.clear(); } return true; })()";

pub const DRAIN_MUTATIONS_JS: &str = "(() => { const m = window.__jsidMutations || []; window.__jsidMutations = []; return m; })()";
pub const CLEAR_MUTATIONS_JS: &str = "(() => { window.__jsidMutations = []; return true; })()";

/// Maximum retries for context errors during page navigation.
const MAX_CONTEXT_RETRIES: u32 = 10;

/// Delay between retries when context is not found (page navigating).
const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

#[derive(Debug, Error)]
pub enum EvalError {
    /// Usually a dialog blocking the JS thread.
    #[error("evaluation timed out")]
    Timeout,
    #[error("page context unavailable: {0}")]
    Context(String),
    #[error("evaluation failed: {0}")]
    Other(String),
}

impl From<EvalError> for DriverError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Timeout => DriverError::Timeout {
                operation: "script evaluation".into(),
            },
            other => DriverError::Script(other.to_string()),
        }
    }
}

/// Evaluate `expression`, retrying while the page has no execution context.
pub async fn evaluate(
    page: &Page,
    expression: &str,
    timeout: Duration,
) -> Result<serde_json::Value, EvalError> {
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match evaluate_with_timeout(page, expression, timeout).await {
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during evaluation (attempt {}/{}), retrying...",
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            other => return other,
        }
    }

    Err(EvalError::Context(
        last_error.unwrap_or_else(|| "Failed to evaluate after retries".to_string()),
    ))
}

/// Evaluate and deserialize the result into `T`.
pub async fn evaluate_as<T: serde::de::DeserializeOwned>(
    page: &Page,
    expression: &str,
    timeout: Duration,
) -> Result<T, EvalError> {
    let value = evaluate(page, expression, timeout).await?;
    serde_json::from_value(value)
        .map_err(|e| EvalError::Other(format!("Unexpected result shape: {}", e)))
}

async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
    timeout: Duration,
) -> Result<serde_json::Value, EvalError> {
    let eval_result = tokio::time::timeout(timeout, page.evaluate(expression)).await;

    match eval_result {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(remote_object)) => Ok(remote_object
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null)),
    }
}
