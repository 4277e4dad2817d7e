//! Drives a [`RecordingSession`] over a live page until asked to stop.
//!
//! The loop polls the capturer at a fixed interval and watches main-frame
//! navigations. Leaving the recorded page loses the injected listeners, so a
//! navigation away spawns a recovery task that goes back and reinstalls
//! them. Recovery races with polling but never blocks it; polls that hit the
//! page mid-navigation fail and are logged.

use crate::capture::{ActionCapturer, ChangeCollector, PageNavigator};
use crate::driver::RecordingPage;
use crate::session::{AttributionMode, RecordingSession, SessionError};
use jsid_common::change::RecordedAction;
use jsid_common::error::DriverError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderOptions {
    pub poll_interval: Duration,
    pub attribution: AttributionMode,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            attribution: AttributionMode::Batch,
        }
    }
}

/// Whether `current` is a different page than `original`.
///
/// `about:` pages are never treated as leaving, and URLs are compared after
/// parsing so `https://a.test` and `https://a.test/` are the same page.
pub fn is_navigation_away(original: &str, current: &str) -> bool {
    if current.starts_with("about:") {
        return false;
    }
    match (url::Url::parse(original), url::Url::parse(current)) {
        (Ok(a), Ok(b)) => a != b,
        _ => original != current,
    }
}

/// Go back to the recorded page and reinstall the capturer and collector.
///
/// The listeners are reinstalled on whatever page history lands on; ending
/// up somewhere other than `original_url` is only logged.
pub async fn recover(
    original_url: &str,
    navigator: &dyn PageNavigator,
    capturer: &dyn ActionCapturer,
    collector: &dyn ChangeCollector,
) -> Result<(), DriverError> {
    navigator.go_back().await?;
    let current = navigator.current_url().await?;
    if is_navigation_away(original_url, &current) {
        warn!("Went back to {} instead of {}", current, original_url);
    }
    capturer.start().await?;
    collector.start().await?;
    info!("Returned to original page");
    Ok(())
}

pub struct Recorder {
    session: RecordingSession,
    capturer: Arc<dyn ActionCapturer>,
    collector: Arc<dyn ChangeCollector>,
    navigator: Arc<dyn PageNavigator>,
    navigations: mpsc::UnboundedReceiver<String>,
    original_url: String,
    options: RecorderOptions,
    recovery: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new(page: RecordingPage, original_url: impl Into<String>, options: RecorderOptions) -> Self {
        Self {
            session: RecordingSession::new(options.attribution),
            capturer: page.capturer,
            collector: page.collector,
            navigator: page.navigator,
            navigations: page.navigations,
            original_url: original_url.into(),
            options,
            recovery: None,
        }
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.session
            .start(Arc::clone(&self.capturer), Arc::clone(&self.collector))
            .await
    }

    /// Record until `shutdown` completes, then finalize the session once.
    pub async fn run<F>(mut self, shutdown: F) -> Result<Vec<RecordedAction>, SessionError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stop requested, finalizing recording");
                    break;
                }
                _ = ticker.tick() => {
                    match self.session.poll().await {
                        Ok(0) => {}
                        Ok(n) => debug!("Drained {} actions from page", n),
                        Err(e) => warn!("Periodic poll failed: {}", e),
                    }
                }
                Some(url) = self.navigations.recv() => self.on_navigation(url),
            }
        }

        if let Some(task) = self.recovery.take() {
            task.abort();
        }

        let recorded = self.session.finalize().await?.to_vec();
        info!("Recording ended with {} actions", recorded.len());
        Ok(recorded)
    }

    fn on_navigation(&mut self, url: String) {
        if !is_navigation_away(&self.original_url, &url) {
            return;
        }
        if self.recovery.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Recovery already in progress, ignoring navigation to {}", url);
            return;
        }

        info!("Navigation detected to {}, going back", url);
        let navigator = Arc::clone(&self.navigator);
        let capturer = Arc::clone(&self.capturer);
        let collector = Arc::clone(&self.collector);
        let original_url = self.original_url.clone();
        self.recovery = Some(tokio::spawn(async move {
            if let Err(e) = recover(&original_url, &*navigator, &*capturer, &*collector).await {
                warn!("Could not go back: {}", e);
            }
        }));
    }
}
