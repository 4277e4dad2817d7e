//! Listener discovery over CDP.
//!
//! For every form element on the page, reads its descriptive attributes and
//! asks `DOMDebugger.getEventListeners` what is attached to it. A handler's
//! source comes from its remote object description when Chromium provides
//! one, otherwise from the owning script's source.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom_debugger::{EventListener, GetEventListenersParams};
use chromiumoxide::cdp::js_protocol::debugger::{EnableParams, GetScriptSourceParams};
use chromiumoxide::cdp::js_protocol::runtime::{CallFunctionOnParams, RemoteObjectId};
use jsid_engine::protocol::{ExtractionFailure, FormElementAttributes, ListenerInfo, ListenerReport};
use std::collections::HashMap;
use std::error::Error;
use tracing::{debug, info, warn};

pub const FORM_ELEMENT_SELECTOR: &str = r#"input, textarea, select, [contenteditable="true"]"#;
pub const CODE_NOT_EXTRACTABLE: &str = "[code not extractable]";

const ELEMENT_INFO_FN: &str = r#"function() {
    return {
        tag: this.tagName.toLowerCase(),
        inputType: this.type || null,
        name: this.name || null,
        id: this.id || null,
        placeholder: this.placeholder || null,
        attributes: Object.fromEntries(
            Array.from(this.attributes)
                .filter(a => !['id', 'name', 'type', 'placeholder', 'class'].includes(a.name))
                .map(a => [a.name, a.value])
        )
    };
}"#;

type BoxError = Box<dyn Error + Send + Sync>;

/// Extract the body of the first `addEventListener('<event_type>'` handler in
/// `source` by counting braces line by line from the registration.
pub fn extract_handler_body(source: &str, event_type: &str) -> Option<String> {
    let single = format!("addEventListener('{}'", event_type);
    let double = format!("addEventListener(\"{}\"", event_type);
    let lines: Vec<&str> = source.lines().collect();

    let start = lines
        .iter()
        .position(|line| line.contains(&single) || line.contains(&double))?;

    let mut body = Vec::new();
    let mut depth: i64 = 0;
    let mut opened = false;
    for line in &lines[start..] {
        let delta = line.matches('{').count() as i64 - line.matches('}').count() as i64;
        if !opened {
            if !line.contains('{') {
                continue;
            }
            opened = true;
        }
        body.push(*line);
        depth += delta;
        if depth <= 0 {
            break;
        }
    }

    (!body.is_empty()).then(|| body.join("\n"))
}

/// Event types in first-seen order, without repeats.
pub fn unique_events<'a>(types: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut events: Vec<String> = Vec::new();
    for t in types {
        if !t.is_empty() && !events.iter().any(|e| e == t) {
            events.push(t.to_string());
        }
    }
    events
}

fn handler_description(listener: &EventListener) -> Option<String> {
    listener
        .handler
        .as_ref()
        .and_then(|h| h.description.clone())
        .filter(|d| !d.trim().is_empty() && !d.contains("[native code]"))
}

struct Extractor<'a> {
    page: &'a Page,
    sources: HashMap<String, Option<String>>,
}

impl Extractor<'_> {
    async fn element_info(&self, object_id: &RemoteObjectId) -> Result<FormElementAttributes, BoxError> {
        let params = CallFunctionOnParams::builder()
            .function_declaration(ELEMENT_INFO_FN)
            .object_id(object_id.clone())
            .return_by_value(true)
            .build()
            .map_err(|e| format!("Failed to build element info call: {}", e))?;
        let returns = self.page.execute(params).await?.result;
        if let Some(exception) = returns.exception_details {
            return Err(format!("Element info script threw: {}", exception.text).into());
        }
        let value = returns.result.value.ok_or("Element info returned no value")?;
        Ok(serde_json::from_value(value)?)
    }

    async fn script_source(&mut self, script_id: &str) -> Option<String> {
        if let Some(cached) = self.sources.get(script_id) {
            return cached.clone();
        }
        let source = match self
            .page
            .execute(GetScriptSourceParams::new(script_id.to_string()))
            .await
        {
            Ok(resp) => Some(resp.result.script_source),
            Err(e) => {
                debug!("Could not read script {}: {}", script_id, e);
                None
            }
        };
        self.sources.insert(script_id.to_string(), source.clone());
        source
    }

    async fn handler_code(&mut self, listener: &EventListener) -> Option<String> {
        if let Some(description) = handler_description(listener) {
            return Some(description);
        }
        let script_id: &str = listener.script_id.as_ref();
        let source = self.script_source(script_id).await?;
        extract_handler_body(&source, &listener.r#type)
    }

    async fn listeners_for(
        &self,
        object_id: &RemoteObjectId,
        selector: &str,
    ) -> Result<Vec<EventListener>, BoxError> {
        let listeners = self
            .page
            .execute(GetEventListenersParams::new(object_id.clone()))
            .await
            .map_err(|e| format!("Could not get listeners for {}: {}", selector, e))?
            .result
            .listeners;
        Ok(listeners)
    }
}

/// Find every form element that has at least one listener attached.
///
/// Per-element failures are collected in the report; only failing to query
/// the page at all is an error.
pub async fn extract_listeners(page: &Page) -> Result<ListenerReport, BoxError> {
    info!("Extracting event listeners from page");

    if let Err(e) = page.execute(EnableParams::default()).await {
        warn!("Could not enable Debugger: {}", e);
    }

    let elements = page
        .find_elements(FORM_ELEMENT_SELECTOR)
        .await
        .map_err(|e| format!("Failed to query form elements: {}", e))?;
    debug!("Found {} form elements", elements.len());

    let mut extractor = Extractor {
        page,
        sources: HashMap::new(),
    };
    let mut report = ListenerReport::default();

    for element in &elements {
        let object_id = &element.remote_object_id;

        let attrs = match extractor.element_info(object_id).await {
            Ok(attrs) => attrs,
            Err(e) => {
                warn!("Error reading element info: {}", e);
                report.failures.push(ExtractionFailure {
                    element: None,
                    error: e.to_string(),
                });
                continue;
            }
        };
        let selector = attrs.selector();

        let listeners = match extractor.listeners_for(object_id, &selector).await {
            Ok(listeners) => listeners,
            Err(e) => {
                warn!("Error extracting listeners from {}: {}", selector, e);
                report.failures.push(ExtractionFailure {
                    element: Some(selector),
                    error: e.to_string(),
                });
                continue;
            }
        };
        if listeners.is_empty() {
            continue;
        }

        let events = unique_events(listeners.iter().map(|l| l.r#type.as_str()));
        let mut code_parts = Vec::new();
        for listener in &listeners {
            if let Some(code) = extractor.handler_code(listener).await
                && !code_parts.contains(&code)
            {
                code_parts.push(code);
            }
        }
        let code = if code_parts.is_empty() {
            CODE_NOT_EXTRACTABLE.to_string()
        } else {
            code_parts.join("\n\n")
        };

        info!("Found listeners on {}: {:?}", selector, events);
        report.listeners.push(ListenerInfo {
            selector,
            element: attrs,
            events,
            code,
        });
    }

    info!(
        "Extracted {} elements with event listeners",
        report.listeners.len()
    );
    Ok(report)
}
