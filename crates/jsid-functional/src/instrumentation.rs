//! Console-logging wrappers that turn live calls into Jest assertions.

use tracing::info;

/// A wrapper that replaces the global `function_name` with a version that
/// logs an `expect(...).toEqual(...)` line for every call it sees.
pub fn generate_wrapper(function_name: &str) -> String {
    format!(
        r#"
(function() {{
  const originalFn = {name};
  {name} = function(...args) {{
    const result = originalFn.apply(this, args);

    try {{
      const serializedArgs = args.map(arg => {{
        if (typeof arg === 'function') {{
          const fnStr = arg.toString();
          if (fnStr.includes('=>') && !fnStr.includes('{{')) {{
            return fnStr;
          }}
          return '/* function: ' + (arg.name || 'anonymous') + ' */';
        }}
        return JSON.stringify(arg);
      }});

      const serializedResult = JSON.stringify(result);
      const argsStr = serializedArgs.join(', ');

      console.log('// Test captured from runtime:');
      console.log(`expect({name}(${{argsStr}})).toEqual(${{serializedResult}});`);
    }} catch (e) {{
      console.log('// Could not serialize call to {name}:', e.message);
    }}

    return result;
  }};
}})();
"#,
        name = function_name
    )
}

/// One script instrumenting every function in `function_names`, to paste into
/// a browser console or a dev build.
pub fn generate_instrumentation_script(library: &str, function_names: &[String]) -> String {
    info!(
        "Generating instrumentation for {} functions",
        function_names.len()
    );

    let header = format!(
        r#"
// Instrumentation for {library}
// Paste this into your browser console or inject into your dev environment
// Then interact with your app - test code will be logged to the console

console.log('=== {library} Instrumentation Active ===');
console.log('Interact with your app. Test code will appear below.');
console.log('');
"#
    );

    let wrappers: Vec<String> = function_names
        .iter()
        .map(|name| generate_wrapper(name))
        .collect();
    header + &wrappers.join("\n")
}
