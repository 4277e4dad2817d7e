//! Analysis output: the interactions found on a page and the errors met
//! while finding them.

use crate::error::Phase;
use crate::inference::{Confidence, RuleKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub selector: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// The rule inferred for one element, as emitted in the analysis output.
///
/// `rule_description` and `confidence` are left out of the JSON when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationInfo {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub raw_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub element: ElementInfo,
    pub triggers: Vec<String>,
    pub validation: ValidationInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisError {
    pub element: Option<String>,
    pub error: String,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub url: String,
    pub analyzed_at: String,
    pub errors: Vec<AnalysisError>,
    pub interactions: Vec<Interaction>,
}

impl AnalysisResult {
    /// Pretty JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
