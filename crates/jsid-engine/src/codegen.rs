//! Playwright test generation from recorded actions.

use jsid_common::change::{ActionType, ChangeRecord, DomChangeKind, RecordedAction};
use tracing::info;

/// Escape a value for use inside a single-quoted TypeScript string.
pub fn escape_ts(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a Playwright TypeScript test that replays `actions` on `url` and
/// asserts the changes attributed to each of them.
pub fn generate_test(url: &str, actions: &[RecordedAction]) -> String {
    info!("Generating test for {} with {} actions", url, actions.len());

    let mut lines = vec![
        "import { test, expect } from '@playwright/test';".to_string(),
        String::new(),
        "test('recorded interaction test', async ({ page }) => {".to_string(),
        format!("  await page.goto('{}');", escape_ts(url)),
        String::new(),
    ];

    for action in actions {
        lines.extend(action_lines(action));
        lines.push(String::new());
    }

    lines.push("});".to_string());
    lines.push(String::new());

    info!("Generated test with {} lines", lines.len());
    lines.join("\n")
}

fn action_lines(action: &RecordedAction) -> Vec<String> {
    let selector = escape_ts(&action.selector);
    let value = escape_ts(action.value.as_deref().unwrap_or_default());

    let mut lines = vec![match action.action_type {
        ActionType::Click => format!("  await page.click('{}');", selector),
        ActionType::Fill => format!("  await page.fill('{}', '{}');", selector, value),
        ActionType::Press => format!("  await page.press('{}', '{}');", selector, value),
    }];

    if action.changes.is_empty() {
        lines.push("  // No observable changes detected".to_string());
        return lines;
    }

    lines.extend(action.changes.iter().map(assertion));
    lines
}

fn assertion(change: &ChangeRecord) -> String {
    match change {
        ChangeRecord::Dom { change, selector } => {
            let matcher = match change {
                DomChangeKind::Added => "toBeVisible",
                DomChangeKind::Removed => "toBeHidden",
            };
            format!(
                "  await expect(page.locator('{}')).{}();",
                escape_ts(selector),
                matcher
            )
        }
        ChangeRecord::Css {
            selector,
            property,
            value,
        } => format!(
            "  await expect(page.locator('{}')).toHaveCSS('{}', '{}');",
            escape_ts(selector),
            escape_ts(property),
            escape_ts(value)
        ),
        ChangeRecord::Network {
            method,
            url_pattern,
        } => format!(
            "  await page.waitForRequest(req => req.url().includes('{}') && req.method() === '{}');",
            escape_ts(url_pattern),
            escape_ts(method)
        ),
    }
}
