use jsid_common::change::{ActionType, CapturedAction, ChangeRecord, RecordedAction};
use jsid_common::inference::{Confidence, RuleKind, infer};
use serde_json::json;

#[test]
fn test_change_records_carry_kind_tag() {
    let changes = vec![
        ChangeRecord::added("#toast"),
        ChangeRecord::removed("#spinner"),
        ChangeRecord::css("#menu", "display", "none"),
        ChangeRecord::network("POST", "/api/login"),
    ];

    let value = serde_json::to_value(&changes).unwrap();
    assert_eq!(
        value,
        json!([
            { "kind": "dom", "change": "added", "selector": "#toast" },
            { "kind": "dom", "change": "removed", "selector": "#spinner" },
            { "kind": "css", "selector": "#menu", "property": "display", "value": "none" },
            { "kind": "network", "method": "POST", "url_pattern": "/api/login" },
        ])
    );

    let parsed: Vec<ChangeRecord> = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, changes);
}

#[test]
fn test_only_dom_and_css_are_page_changes() {
    assert!(ChangeRecord::added("#a").is_page_change());
    assert!(ChangeRecord::css("#a", "display", "block").is_page_change());
    assert!(!ChangeRecord::network("GET", "/search").is_page_change());
}

#[test]
fn test_recorded_action_keeps_captured_fields() {
    let captured = CapturedAction {
        action_type: ActionType::Fill,
        selector: "[data-testid=\"email\"]".into(),
        is_fragile: false,
        value: Some("a@b.co".into()),
    };
    let recorded = RecordedAction::new(captured, vec![ChangeRecord::added("#hint")]);

    assert_eq!(recorded.action_type, ActionType::Fill);
    assert_eq!(recorded.action_type.to_string(), "fill");
    assert_eq!(recorded.selector, "[data-testid=\"email\"]");
    assert_eq!(recorded.value.as_deref(), Some("a@b.co"));
    assert_eq!(recorded.changes.len(), 1);

    let click = RecordedAction::new(
        CapturedAction {
            action_type: ActionType::Click,
            selector: "#go".into(),
            is_fragile: false,
            value: None,
        },
        Vec::new(),
    );
    let value = serde_json::to_value(&click).unwrap();
    assert!(value.get("value").is_none());
    assert_eq!(value["action_type"], "click");
}

#[test]
fn test_handler_snippets_from_real_forms() {
    let cases = [
        (
            "if (!/^\\d{3}-\\d{3}-\\d{4}$/.test(phone.value)) showError('phone');",
            RuleKind::Phone,
        ),
        ("if (isNaN(qty.value)) qty.classList.add('bad');", RuleKind::Numeric),
        ("trackAnalytics('focus', this.name);", RuleKind::Unknown),
    ];

    for (code, kind) in cases {
        let rule = infer(code);
        assert_eq!(rule.kind, kind, "code: {}", code);
        if kind == RuleKind::Unknown {
            assert_eq!(rule.confidence, None);
        } else {
            assert!(rule.confidence.is_some());
        }
    }

    assert_eq!(
        infer("if (!email.includes('@') || email.length < 5) fail();").confidence,
        Some(Confidence::High)
    );
}
