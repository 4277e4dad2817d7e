//! Page-backed implementations of the recording collaborators.

use crate::inject;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use chromiumoxide::cdp::browser_protocol::page::EventFrameNavigated;
use futures::StreamExt;
use jsid_engine::capture::{ActionCapturer, ChangeCollector, PageNavigator};
use jsid_engine::change::{CapturedAction, ChangeRecord};
use jsid_engine::error::DriverError;
use jsid_engine::observer::{ChangeFilter, ObserverConfig, is_static_asset};
use jsid_engine::protocol::{RawAction, RawMutation, RawRequest};
use jsid_engine::tracker::convert_actions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const GO_BACK_SETTLE: Duration = Duration::from_millis(300);

pub struct PageActionCapturer {
    page: Page,
    eval_timeout: Duration,
}

impl PageActionCapturer {
    pub fn new(page: Page, eval_timeout: Duration) -> Self {
        Self { page, eval_timeout }
    }

    async fn fetch(&self, script: &str) -> Result<Vec<CapturedAction>, DriverError> {
        let raw: Vec<RawAction> = inject::evaluate_as(&self.page, script, self.eval_timeout).await?;
        Ok(convert_actions(raw))
    }
}

#[async_trait]
impl ActionCapturer for PageActionCapturer {
    async fn start(&self) -> Result<(), DriverError> {
        inject::evaluate(&self.page, inject::ACTION_TRACKER_JS, self.eval_timeout).await?;
        info!("Action tracking started");
        Ok(())
    }

    async fn actions(&self) -> Result<Vec<CapturedAction>, DriverError> {
        let actions = self.fetch(inject::READ_ACTIONS_JS).await?;
        debug!("Retrieved {} actions", actions.len());
        Ok(actions)
    }

    async fn clear(&self) -> Result<(), DriverError> {
        inject::evaluate(&self.page, inject::CLEAR_ACTIONS_JS, self.eval_timeout).await?;
        debug!("Action tracker cleared");
        Ok(())
    }

    async fn drain(&self) -> Result<Vec<CapturedAction>, DriverError> {
        self.fetch(inject::DRAIN_ACTIONS_JS).await
    }
}

pub struct PageChangeCollector {
    page: Page,
    eval_timeout: Duration,
    settle_timeout: Duration,
    filter: Mutex<ChangeFilter>,
    requests: Arc<Mutex<Vec<RawRequest>>>,
    network_task: Mutex<Option<JoinHandle<()>>>,
}

impl PageChangeCollector {
    pub fn new(page: Page, observer: ObserverConfig, eval_timeout: Duration) -> Self {
        Self {
            page,
            eval_timeout,
            settle_timeout: observer.settle_timeout,
            filter: Mutex::new(ChangeFilter::new(observer)),
            requests: Arc::new(Mutex::new(Vec::new())),
            network_task: Mutex::new(None),
        }
    }

    /// Buffer non-asset requests for the rest of the page's life. Survives
    /// navigations, so it is only attached once.
    async fn attach_network_listener(&self) -> Result<(), DriverError> {
        let mut slot = self.network_task.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let mut events = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| DriverError::Other(format!("Failed to subscribe to network events: {}", e)))?;

        let requests = Arc::clone(&self.requests);
        *slot = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let url = &event.request.url;
                if is_static_asset(url) {
                    debug!("Network request filtered (static asset): {} {}", event.request.method, url);
                    continue;
                }
                debug!("Network request tracked: {} {}", event.request.method, url);
                requests.lock().await.push(RawRequest {
                    method: event.request.method.clone(),
                    url: url.clone(),
                });
            }
        }));
        info!("Network request listener attached");
        Ok(())
    }
}

impl Drop for PageChangeCollector {
    fn drop(&mut self) {
        if let Some(task) = self.network_task.get_mut().take() {
            task.abort();
        }
    }
}

#[async_trait]
impl ChangeCollector for PageChangeCollector {
    async fn start(&self) -> Result<(), DriverError> {
        inject::evaluate(&self.page, inject::MUTATION_OBSERVER_JS, self.eval_timeout).await?;
        info!("MutationObserver script injected");
        self.attach_network_listener().await
    }

    async fn before_action(&self) -> Result<(), DriverError> {
        inject::evaluate(&self.page, inject::CLEAR_MUTATIONS_JS, self.eval_timeout).await?;
        self.requests.lock().await.clear();
        self.filter.lock().await.reset();
        debug!("Mutations and network requests cleared");
        Ok(())
    }

    async fn after_action(&self) -> Result<Vec<ChangeRecord>, DriverError> {
        tokio::time::sleep(self.settle_timeout).await;
        debug!("Waited {:?} for changes to settle", self.settle_timeout);

        let mutations: Vec<RawMutation> =
            inject::evaluate_as(&self.page, inject::DRAIN_MUTATIONS_JS, self.eval_timeout).await?;
        let requests = std::mem::take(&mut *self.requests.lock().await);
        info!(
            "Collected {} raw mutations and {} requests",
            mutations.len(),
            requests.len()
        );

        Ok(self.filter.lock().await.process(mutations, requests))
    }
}

pub struct PageControl {
    page: Page,
    eval_timeout: Duration,
}

impl PageControl {
    pub fn new(page: Page, eval_timeout: Duration) -> Self {
        Self { page, eval_timeout }
    }
}

#[async_trait]
impl PageNavigator for PageControl {
    async fn current_url(&self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))
            .map(Option::unwrap_or_default)
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        inject::evaluate(&self.page, "history.back(); true", self.eval_timeout)
            .await
            .map_err(|e| DriverError::Navigation(format!("go_back failed: {}", e)))?;
        tokio::time::sleep(GO_BACK_SETTLE).await;
        Ok(())
    }
}

/// Forward main-frame navigations of `page` as URLs. The forwarding task
/// ends when the receiver is dropped or the page goes away.
pub async fn watch_navigations(
    page: &Page,
) -> Result<mpsc::UnboundedReceiver<String>, DriverError> {
    let mut events = page
        .event_listener::<EventFrameNavigated>()
        .await
        .map_err(|e| DriverError::Other(format!("Failed to subscribe to navigation events: {}", e)))?;

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if event.frame.parent_id.is_some() {
                continue;
            }
            debug!("Main frame navigated to {}", event.frame.url);
            if tx.send(event.frame.url.clone()).is_err() {
                break;
            }
        }
    });
    Ok(rx)
}
