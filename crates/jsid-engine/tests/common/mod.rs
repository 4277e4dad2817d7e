#![allow(dead_code)]

use async_trait::async_trait;
use jsid_engine::capture::{ActionCapturer, ChangeCollector, PageNavigator};
use jsid_engine::change::{ActionType, CapturedAction, ChangeRecord};
use jsid_engine::error::DriverError;
use std::sync::{Arc, Mutex};

pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

pub fn action(action_type: ActionType, selector: &str, value: Option<&str>) -> CapturedAction {
    CapturedAction {
        action_type,
        selector: selector.into(),
        is_fragile: false,
        value: value.map(String::from),
    }
}

#[derive(Default)]
pub struct MockCapturer {
    pub log: CallLog,
    pub queue: Mutex<Vec<CapturedAction>>,
    pub fail_start: bool,
}

impl MockCapturer {
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn push(&self, action: CapturedAction) {
        self.queue.lock().unwrap().push(action);
    }
}

#[async_trait]
impl ActionCapturer for MockCapturer {
    async fn start(&self) -> Result<(), DriverError> {
        self.log.lock().unwrap().push("capturer.start");
        if self.fail_start {
            return Err(DriverError::Script("listener install failed".into()));
        }
        Ok(())
    }

    async fn actions(&self) -> Result<Vec<CapturedAction>, DriverError> {
        Ok(self.queue.lock().unwrap().clone())
    }

    async fn clear(&self) -> Result<(), DriverError> {
        self.log.lock().unwrap().push("capturer.clear");
        self.queue.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct MockCollector {
    pub log: CallLog,
    pub changes: Mutex<Vec<ChangeRecord>>,
    pub fail_after: bool,
}

impl MockCollector {
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn push(&self, change: ChangeRecord) {
        self.changes.lock().unwrap().push(change);
    }
}

#[async_trait]
impl ChangeCollector for MockCollector {
    async fn start(&self) -> Result<(), DriverError> {
        self.log.lock().unwrap().push("collector.start");
        Ok(())
    }

    async fn before_action(&self) -> Result<(), DriverError> {
        self.log.lock().unwrap().push("collector.before_action");
        self.changes.lock().unwrap().clear();
        Ok(())
    }

    async fn after_action(&self) -> Result<Vec<ChangeRecord>, DriverError> {
        self.log.lock().unwrap().push("collector.after_action");
        if self.fail_after {
            return Err(DriverError::Timeout {
                operation: "drain changes".into(),
            });
        }
        Ok(std::mem::take(&mut *self.changes.lock().unwrap()))
    }
}

#[derive(Default)]
pub struct MockNavigator {
    pub log: CallLog,
    pub url: Mutex<String>,
}

#[async_trait]
impl PageNavigator for MockNavigator {
    async fn current_url(&self) -> Result<String, DriverError> {
        self.log.lock().unwrap().push("navigator.current_url");
        Ok(self.url.lock().unwrap().clone())
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        self.log.lock().unwrap().push("navigator.go_back");
        Ok(())
    }
}
