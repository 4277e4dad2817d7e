use crate::capture::{ActionCapturer, ChangeCollector, PageNavigator};
use crate::observer::ObserverConfig;
use async_trait::async_trait;
pub use jsid_common::error::DriverError;
use jsid_common::protocol::ListenerReport;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// Final URL after redirects.
    pub url: String,
}

/// Everything a recording needs from the page it runs on.
pub struct RecordingPage {
    pub capturer: Arc<dyn ActionCapturer>,
    pub collector: Arc<dyn ChangeCollector>,
    pub navigator: Arc<dyn PageNavigator>,
    /// URLs of main-frame navigations, in the order the browser reports them.
    pub navigations: mpsc::UnboundedReceiver<String>,
}

/// The interface a browser implementation provides to the analyzer and the
/// recorder.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Launch the browser.
    async fn launch(&mut self) -> Result<(), DriverError>;

    /// Close the browser and cleanup resources.
    async fn close(&mut self) -> Result<(), DriverError>;

    async fn is_ready(&self) -> bool;

    /// Navigate the current page. Failures are reported as
    /// [`DriverError::Load`].
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError>;

    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// Find the form elements of the current page that carry script listeners.
    async fn extract_listeners(&mut self) -> Result<ListenerReport, DriverError>;

    /// Attach an action capturer and a change collector to the current page.
    async fn open_recording(
        &mut self,
        observer: ObserverConfig,
    ) -> Result<RecordingPage, DriverError>;
}
