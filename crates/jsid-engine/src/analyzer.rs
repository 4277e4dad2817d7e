use crate::driver::Driver;
use chrono::Utc;
use jsid_common::error::{DriverError, Phase};
use jsid_common::inference::{RuleKind, infer};
use jsid_common::model::{AnalysisError, AnalysisResult, ElementInfo, Interaction, ValidationInfo};
use jsid_common::protocol::{ExtractionFailure, ListenerInfo};
use tracing::{error, info, warn};

const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Reject anything that is not an http, https or file URL.
pub fn validate_url(url: &str) -> Result<(), DriverError> {
    match url::Url::parse(url) {
        Ok(parsed) if SUPPORTED_SCHEMES.contains(&parsed.scheme()) => Ok(()),
        _ => {
            error!("Invalid URL scheme: {}", url);
            Err(DriverError::load(format!("Invalid URL: {}", url)))
        }
    }
}

/// Infer the rule behind one element's listeners.
pub fn build_interaction(listener: ListenerInfo) -> Interaction {
    let rule = infer(&listener.code);
    let attrs = listener.element;

    let element = ElementInfo {
        selector: listener.selector,
        tag: attrs.tag,
        input_type: attrs.input_type,
        name: attrs.name,
        id: attrs.id,
        placeholder: attrs.placeholder,
        attributes: attrs.attributes,
    };

    let validation = ValidationInfo {
        kind: rule.kind,
        raw_code: listener.code,
        rule_description: (rule.kind != RuleKind::Unknown).then_some(rule.description),
        confidence: rule.confidence,
    };

    info!("Processed {}: {}", element.selector, rule.kind);
    Interaction {
        element,
        triggers: listener.events,
        validation,
    }
}

/// Analyze a page for script-driven input validation.
///
/// Never fails: anything that goes wrong ends up in the result's error list,
/// next to whatever interactions were found before it happened. The browser
/// is launched if needed but left open for the caller to close.
pub async fn analyze_page<D: Driver + ?Sized>(driver: &mut D, url: &str) -> AnalysisResult {
    info!("Starting analysis of {}", url);
    let analyzed_at = Utc::now().to_rfc3339();
    let mut errors = Vec::new();
    let mut interactions = Vec::new();

    match discover(driver, url).await {
        Ok(report) => {
            info!("Found {} elements with listeners", report.listeners.len());
            interactions.extend(report.listeners.into_iter().map(build_interaction));
            errors.extend(report.failures.into_iter().map(
                |ExtractionFailure { element, error }| {
                    warn!("Error processing {:?}: {}", element, error);
                    AnalysisError {
                        element,
                        error,
                        phase: Phase::Extraction,
                    }
                },
            ));
        }
        Err(e) => {
            error!("Analysis aborted: {}", e);
            errors.push(AnalysisError {
                element: None,
                error: e.to_string(),
                phase: e.phase(),
            });
        }
    }

    info!(
        "Analysis complete: {} interactions, {} errors",
        interactions.len(),
        errors.len()
    );
    AnalysisResult {
        url: url.to_string(),
        analyzed_at,
        errors,
        interactions,
    }
}

async fn discover<D: Driver + ?Sized>(
    driver: &mut D,
    url: &str,
) -> Result<jsid_common::protocol::ListenerReport, DriverError> {
    validate_url(url)?;
    if !driver.is_ready().await {
        driver.launch().await?;
    }
    driver.navigate(url).await?;
    driver.extract_listeners().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsid_common::inference::Confidence;
    use jsid_common::protocol::FormElementAttributes;

    fn listener(code: &str) -> ListenerInfo {
        ListenerInfo {
            selector: "input#email".into(),
            element: FormElementAttributes {
                tag: "input".into(),
                input_type: Some("email".into()),
                id: Some("email".into()),
                ..Default::default()
            },
            events: vec!["blur".into(), "input".into()],
            code: code.into(),
        }
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("file:///tmp/form.html").is_ok());

        let err = validate_url("ftp://example.com").unwrap_err();
        assert_eq!(err.phase(), Phase::Loading);
        assert_eq!(err.to_string(), "Invalid URL: ftp://example.com");
        assert!(validate_url("example.com").is_err());
    }

    #[test]
    fn test_build_interaction_for_known_rule() {
        let interaction = build_interaction(listener("if (!/.+@.+\\..+/.test(value)) {}"));
        assert_eq!(interaction.element.selector, "input#email");
        assert_eq!(interaction.element.input_type.as_deref(), Some("email"));
        assert_eq!(interaction.triggers, vec!["blur", "input"]);
        assert_eq!(interaction.validation.kind, RuleKind::Email);
        assert_eq!(interaction.validation.confidence, Some(Confidence::High));
        assert!(interaction.validation.rule_description.is_some());
    }

    #[test]
    fn test_build_interaction_omits_description_for_unknown() {
        let interaction = build_interaction(listener("[code not extractable]"));
        assert_eq!(interaction.validation.kind, RuleKind::Unknown);
        assert_eq!(interaction.validation.rule_description, None);
        assert_eq!(interaction.validation.confidence, None);
        assert_eq!(interaction.validation.raw_code, "[code not extractable]");
    }
}
