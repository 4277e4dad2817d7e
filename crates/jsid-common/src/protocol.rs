//! Payloads exchanged with the scripts injected into the page.

use crate::change::{ActionType, DomChangeKind};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Deserialize a string map whose values may be null, dropping the nulls.
fn deserialize_nullable_string_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: Option<BTreeMap<String, Option<String>>> = Option::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.map(|val| (k, val)))
        .collect())
}

/// Identifying attributes of an element, as serialized by the page scripts.
/// Missing attributes arrive as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(rename = "data-testid", default)]
    pub test_id: String,
    #[serde(rename = "aria-label", default)]
    pub aria_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(rename = "elementInfo")]
    pub element: ElementSnapshot,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawMutation {
    #[serde(rename = "childList")]
    ChildList {
        action: DomChangeKind,
        #[serde(rename = "elementInfo")]
        element: ElementSnapshot,
    },
    #[serde(rename = "attributes")]
    Attributes {
        #[serde(rename = "attributeName", default)]
        attribute: Option<String>,
        #[serde(rename = "elementInfo")]
        element: ElementSnapshot,
        #[serde(rename = "oldValue", default)]
        old_value: Option<String>,
        #[serde(rename = "newValue", default)]
        new_value: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRequest {
    pub method: String,
    pub url: String,
}

/// Descriptive attributes of a form element, read before its listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormElementAttributes {
    pub tag: String,
    #[serde(rename = "inputType", default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_string_map")]
    pub attributes: BTreeMap<String, String>,
}

impl FormElementAttributes {
    /// `tag#id`, else `tag[name="..."]`, else the bare tag.
    pub fn selector(&self) -> String {
        match (self.id.as_deref(), self.name.as_deref()) {
            (Some(id), _) if !id.is_empty() => format!("{}#{}", self.tag, id),
            (_, Some(name)) if !name.is_empty() => format!("{}[name=\"{}\"]", self.tag, name),
            _ => self.tag.clone(),
        }
    }
}

/// An element that carries at least one script listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerInfo {
    pub selector: String,
    pub element: FormElementAttributes,
    pub events: Vec<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub element: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerReport {
    pub listeners: Vec<ListenerInfo>,
    pub failures: Vec<ExtractionFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_mutation_variants() {
        let added: RawMutation = serde_json::from_value(json!({
            "type": "childList",
            "action": "added",
            "elementInfo": {"tag": "div", "id": "menu", "classes": [], "data-testid": "", "aria-label": ""}
        }))
        .unwrap();
        assert!(matches!(
            added,
            RawMutation::ChildList { action: DomChangeKind::Added, ref element } if element.id == "menu"
        ));

        let style: RawMutation = serde_json::from_value(json!({
            "type": "attributes",
            "attributeName": "style",
            "elementInfo": {"tag": "ul", "id": "", "classes": ["list"]},
            "oldValue": null,
            "newValue": "display: none"
        }))
        .unwrap();
        match style {
            RawMutation::Attributes {
                attribute,
                old_value,
                new_value,
                element,
            } => {
                assert_eq!(attribute.as_deref(), Some("style"));
                assert_eq!(old_value, None);
                assert_eq!(new_value.as_deref(), Some("display: none"));
                assert_eq!(element.classes, vec!["list"]);
                assert!(element.test_id.is_empty());
            }
            other => panic!("unexpected mutation: {:?}", other),
        }
    }

    #[test]
    fn test_form_attributes_selector_priority() {
        let mut attrs: FormElementAttributes = serde_json::from_value(json!({
            "tag": "input",
            "inputType": "text",
            "name": "user",
            "id": "login",
            "placeholder": null,
            "attributes": {"required": "", "data-x": null}
        }))
        .unwrap();
        assert_eq!(attrs.selector(), "input#login");
        assert_eq!(attrs.attributes.len(), 1);

        attrs.id = None;
        assert_eq!(attrs.selector(), "input[name=\"user\"]");

        attrs.name = Some(String::new());
        assert_eq!(attrs.selector(), "input");
    }
}
