use crate::observer::ObserverConfig;
use crate::recorder::RecorderOptions;
use crate::session::AttributionMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsidConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub headless: bool,
    /// Chromium executable. `CHROME_BIN` is used when unset.
    #[serde(default)]
    pub chrome_bin: Option<PathBuf>,
    #[serde(default = "default_eval_timeout_ms")]
    pub eval_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_bin: None,
            eval_timeout_ms: default_eval_timeout_ms(),
        }
    }
}

impl BrowserConfig {
    pub fn eval_timeout(&self) -> Duration {
        Duration::from_millis(self.eval_timeout_ms)
    }
}

fn default_eval_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_only_stable_selectors")]
    pub only_stable_selectors: bool,
    #[serde(default = "default_max_changes_per_action")]
    pub max_changes_per_action: usize,
    #[serde(default)]
    pub attribution: AttributionMode,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            settle_timeout_ms: default_settle_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            only_stable_selectors: default_only_stable_selectors(),
            max_changes_per_action: default_max_changes_per_action(),
            attribution: AttributionMode::default(),
            output: default_output(),
        }
    }
}

impl RecorderConfig {
    pub fn observer(&self) -> ObserverConfig {
        ObserverConfig {
            settle_timeout: Duration::from_millis(self.settle_timeout_ms),
            only_stable_selectors: self.only_stable_selectors,
            max_changes_per_action: self.max_changes_per_action,
        }
    }

    pub fn options(&self) -> RecorderOptions {
        RecorderOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            attribution: self.attribution,
        }
    }
}

fn default_settle_timeout_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_only_stable_selectors() -> bool {
    true
}

fn default_max_changes_per_action() -> usize {
    10
}

fn default_output() -> PathBuf {
    PathBuf::from("./recorded-test.spec.ts")
}
