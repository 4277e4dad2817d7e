//! Recorded user actions and the observable effects attributed to them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomChangeKind {
    Added,
    Removed,
}

/// One observed effect of a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeRecord {
    Dom {
        change: DomChangeKind,
        selector: String,
    },
    Css {
        selector: String,
        property: String,
        value: String,
    },
    Network {
        method: String,
        url_pattern: String,
    },
}

impl ChangeRecord {
    pub fn added(selector: impl Into<String>) -> Self {
        ChangeRecord::Dom {
            change: DomChangeKind::Added,
            selector: selector.into(),
        }
    }

    pub fn removed(selector: impl Into<String>) -> Self {
        ChangeRecord::Dom {
            change: DomChangeKind::Removed,
            selector: selector.into(),
        }
    }

    pub fn css(
        selector: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        ChangeRecord::Css {
            selector: selector.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn network(method: impl Into<String>, url_pattern: impl Into<String>) -> Self {
        ChangeRecord::Network {
            method: method.into(),
            url_pattern: url_pattern.into(),
        }
    }

    /// True for DOM and CSS changes, which count against the per-drain cap.
    pub fn is_page_change(&self) -> bool {
        match self {
            ChangeRecord::Dom { .. } | ChangeRecord::Css { .. } => true,
            ChangeRecord::Network { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    Fill,
    Press,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Click => "click",
            ActionType::Fill => "fill",
            ActionType::Press => "press",
        };
        f.write_str(s)
    }
}

/// An action as reported by the capturer, before any change is attributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedAction {
    pub action_type: ActionType,
    pub selector: String,
    pub is_fragile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A user action together with the changes attributed to it at finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedAction {
    pub action_type: ActionType,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub changes: Vec<ChangeRecord>,
}

impl RecordedAction {
    pub fn new(action: CapturedAction, changes: Vec<ChangeRecord>) -> Self {
        Self {
            action_type: action.action_type,
            selector: action.selector,
            value: action.value,
            changes,
        }
    }
}
