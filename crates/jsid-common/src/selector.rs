use crate::protocol::ElementSnapshot;
use tracing::{debug, warn};

fn escape_attribute_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build a CSS selector for an element, preferring the most stable handle.
///
/// Priority: `data-testid`, `id`, `tag[aria-label]`, `tag.classes`, `tag`.
/// The returned flag is true for the last two, which break easily when the
/// page's styling changes.
pub fn generate_selector(element: &ElementSnapshot) -> (String, bool) {
    let tag = if element.tag.trim().is_empty() {
        "div"
    } else {
        element.tag.trim()
    };

    let test_id = element.test_id.trim();
    if !test_id.is_empty() {
        let selector = format!("[data-testid=\"{}\"]", escape_attribute_value(test_id));
        debug!("Generated selector from data-testid: {}", selector);
        return (selector, false);
    }

    let id = element.id.trim();
    if !id.is_empty() {
        let selector = format!("#{}", id);
        debug!("Generated selector from id: {}", selector);
        return (selector, false);
    }

    let aria_label = element.aria_label.trim();
    if !aria_label.is_empty() {
        let selector = format!(
            "{}[aria-label=\"{}\"]",
            tag,
            escape_attribute_value(aria_label)
        );
        debug!("Generated selector from aria-label: {}", selector);
        return (selector, false);
    }

    let classes: Vec<&str> = element
        .classes
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if !classes.is_empty() {
        let selector = format!("{}.{}", tag, classes.join("."));
        debug!("Generated fragile selector from classes: {}", selector);
        return (selector, true);
    }

    warn!("Generated very fragile tag-only selector: {}", tag);
    (tag.to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tag: &str) -> ElementSnapshot {
        ElementSnapshot {
            tag: tag.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_testid_wins_over_everything() {
        let el = ElementSnapshot {
            tag: "button".into(),
            id: "save".into(),
            classes: vec!["btn".into()],
            test_id: "save-btn".into(),
            aria_label: "Save".into(),
        };
        assert_eq!(
            generate_selector(&el),
            ("[data-testid=\"save-btn\"]".to_string(), false)
        );
    }

    #[test]
    fn test_id_then_aria_label() {
        let mut el = snapshot("button");
        el.id = " menu-toggle ".into();
        el.aria_label = "Toggle".into();
        assert_eq!(generate_selector(&el), ("#menu-toggle".to_string(), false));

        el.id.clear();
        assert_eq!(
            generate_selector(&el),
            ("button[aria-label=\"Toggle\"]".to_string(), false)
        );
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let mut el = snapshot("a");
        el.aria_label = r#"Say "hi" \ bye"#.into();
        let (selector, fragile) = generate_selector(&el);
        assert_eq!(selector, r#"a[aria-label="Say \"hi\" \\ bye"]"#);
        assert!(!fragile);
    }

    #[test]
    fn test_classes_are_fragile() {
        let mut el = snapshot("div");
        el.classes = vec!["menu".into(), " ".into(), "open".into()];
        assert_eq!(generate_selector(&el), ("div.menu.open".to_string(), true));
    }

    #[test]
    fn test_tag_only_fallback() {
        assert_eq!(generate_selector(&snapshot("span")), ("span".to_string(), true));
        assert_eq!(generate_selector(&snapshot("")), ("div".to_string(), true));
    }
}
