//! Page-side collaborators of a recording session.
//!
//! Implementations live next to a concrete browser driver; the session only
//! sees these traits.

use async_trait::async_trait;
use jsid_common::change::{CapturedAction, ChangeRecord};
use jsid_common::error::DriverError;

/// Reports the user actions performed on the page, in occurrence order.
#[async_trait]
pub trait ActionCapturer: Send + Sync {
    /// Install (or reinstall after a navigation) the in-page listeners.
    async fn start(&self) -> Result<(), DriverError>;

    async fn actions(&self) -> Result<Vec<CapturedAction>, DriverError>;

    async fn clear(&self) -> Result<(), DriverError>;

    /// Take all pending actions out of the page.
    ///
    /// The default is not atomic; implementations that can read and reset in
    /// one step should override it.
    async fn drain(&self) -> Result<Vec<CapturedAction>, DriverError> {
        let actions = self.actions().await?;
        self.clear().await?;
        Ok(actions)
    }
}

/// Accumulates DOM, style and network effects observed on the page.
#[async_trait]
pub trait ChangeCollector: Send + Sync {
    async fn start(&self) -> Result<(), DriverError>;

    /// Discard everything accumulated so far.
    async fn before_action(&self) -> Result<(), DriverError>;

    /// Wait for the page to settle, then drain the accumulated changes.
    /// Changes returned here are gone from the collector.
    async fn after_action(&self) -> Result<Vec<ChangeRecord>, DriverError>;
}

/// Minimal page control needed to recover from an unwanted navigation.
#[async_trait]
pub trait PageNavigator: Send + Sync {
    async fn current_url(&self) -> Result<String, DriverError>;

    async fn go_back(&self) -> Result<(), DriverError>;
}
