use crate::capture::{PageActionCapturer, PageChangeCollector, PageControl, watch_navigations};
use crate::cdp::{CdpClient, LaunchOptions};
use crate::inject;
use crate::listeners::extract_listeners;
use async_trait::async_trait;
use jsid_engine::config::BrowserConfig;
use jsid_engine::driver::{Driver, DriverError, NavigationResult, RecordingPage};
use jsid_engine::observer::ObserverConfig;
use jsid_engine::protocol::ListenerReport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Upper bound for a page load, including its subresources.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HeadlessDriver {
    client: Option<CdpClient>,
    options: LaunchOptions,
    eval_timeout: Duration,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self::from_config(&BrowserConfig {
            headless: true,
            ..Default::default()
        })
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            client: None,
            options: LaunchOptions {
                headless: config.headless,
                chrome_bin: config.chrome_bin.clone(),
            },
            eval_timeout: config.eval_timeout(),
        }
    }

    fn page(&self) -> Result<&chromiumoxide::Page, DriverError> {
        self.client
            .as_ref()
            .map(|client| &client.page)
            .ok_or(DriverError::NotReady)
    }

    async fn get_navigation_result(
        page: &chromiumoxide::Page,
    ) -> Result<NavigationResult, DriverError> {
        let url = page
            .url()
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url })
    }
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for HeadlessDriver {
    async fn launch(&mut self) -> Result<(), DriverError> {
        info!("Launching Chromium...");
        let client = CdpClient::launch(&self.options)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DriverError::Other(e.to_string()))?;
            info!("Browser closed");
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, DriverError> {
        let page = self.page()?;

        info!("Loading page: {}", url);
        match tokio::time::timeout(NAVIGATION_TIMEOUT, page.goto(url)).await {
            Err(_) => {
                error!("Page load timed out: {}", url);
                return Err(DriverError::load(format!(
                    "Timeout {}ms exceeded while loading {}",
                    NAVIGATION_TIMEOUT.as_millis(),
                    url
                )));
            }
            Ok(Err(e)) => {
                error!("Failed to load page: {}", e);
                return Err(DriverError::load(e.to_string()));
            }
            Ok(Ok(_)) => info!("Page loaded successfully: {}", url),
        }

        Self::get_navigation_result(page).await
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, DriverError> {
        let page = self.page()?;
        Ok(inject::evaluate(page, script, self.eval_timeout).await?)
    }

    async fn extract_listeners(&mut self) -> Result<ListenerReport, DriverError> {
        let page = self.page()?;
        extract_listeners(page)
            .await
            .map_err(|e| DriverError::Extraction(e.to_string()))
    }

    async fn open_recording(
        &mut self,
        observer: ObserverConfig,
    ) -> Result<RecordingPage, DriverError> {
        let page = self.page()?;
        let navigations = watch_navigations(page).await?;

        Ok(RecordingPage {
            capturer: Arc::new(PageActionCapturer::new(page.clone(), self.eval_timeout)),
            collector: Arc::new(PageChangeCollector::new(
                page.clone(),
                observer,
                self.eval_timeout,
            )),
            navigator: Arc::new(PageControl::new(page.clone(), self.eval_timeout)),
            navigations,
        })
    }
}
