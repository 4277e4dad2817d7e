use crate::models::CapturedCall;
use std::collections::{BTreeSet, HashSet};
use tracing::info;

/// Escape text for a JavaScript template literal.
fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

/// A single Jest test. Complete calls assert the captured output; incomplete
/// ones fail with instructions for finishing the test by hand.
pub fn generate_test_case(call: &CapturedCall) -> String {
    let inputs = call.inputs.join(", ");

    if call.is_complete {
        return format!(
            "  test('{name} returns expected output', () => {{\n    expect({name}({inputs})).toEqual({output});\n  }});",
            name = call.function_name,
            output = call.output,
        );
    }

    let message = format!(
        "\nUnable to generate complete test for {name}\n\nLocation: {location}\nIssue: {issue}\nOriginal usage: {name}({inputs})\n\nTo fix: Replace this test with concrete inputs and expected output\n",
        name = call.function_name,
        location = call.location,
        issue = call.incomplete_reason.as_deref().unwrap_or("Unknown"),
    );
    format!(
        "  test('{name} - requires manual input', () => {{\n    throw new Error(`{message}`);\n  }});",
        name = call.function_name,
        message = escape_template(&message),
    )
}

/// Drop calls whose function and inputs repeat an earlier call.
fn dedup_calls(calls: &[CapturedCall]) -> Vec<&CapturedCall> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for call in calls {
        if seen.insert((call.function_name.as_str(), call.inputs.as_slice())) {
            unique.push(call);
        }
    }
    unique
}

/// A Jest file with one `describe` block for `library`.
pub fn generate_test_file(library: &str, calls: &[CapturedCall]) -> String {
    let unique = dedup_calls(calls);
    info!(
        "Deduplicated {} calls to {} unique tests",
        calls.len(),
        unique.len()
    );

    let function_names: BTreeSet<&str> = unique.iter().map(|c| c.function_name.as_str()).collect();
    let imports = function_names.into_iter().collect::<Vec<_>>().join(", ");
    let tests = unique
        .into_iter()
        .map(generate_test_case)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("import {{ {imports} }} from '{library}';\n\ndescribe('{library}', () => {{\n{tests}\n}});\n")
}
