//! Finds the call sites of a library's functions in a source tree.
//!
//! Matching is line-based and regex-driven: good enough to point at the
//! calls worth instrumenting, not a JavaScript parser.

use crate::error::FunctionalError;
use crate::models::CallSite;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const SOURCE_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx"];

/// `import { a, b as c } from 'library'`
static ES_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s*\{([^}]+)\}\s*from\s*['"]([^'"]+)['"]"#).expect("valid ES import pattern")
});

/// `const x = require('library')` or `const { a } = require('library')`
static COMMONJS_REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:const|let|var)\s+(?:(\w+)|\{([^}]+)\})\s*=\s*require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
    )
    .expect("valid require pattern")
});

static NUMBER_LITERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+\.?\d*$").expect("valid number pattern"));

fn is_library(module: &str, library: &str) -> bool {
    module == library
        || module
            .strip_prefix(library)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Names in an import list, with `original as alias` reduced to `original`.
fn imported_names(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',').filter_map(|name| {
        let name = name.split(" as ").next().unwrap_or_default().trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Function names imported from `library` or one of its sub-paths.
pub fn find_imports(content: &str, library: &str) -> BTreeSet<String> {
    let mut imports = BTreeSet::new();

    for caps in ES_IMPORT.captures_iter(content) {
        if is_library(&caps[2], library) {
            imports.extend(imported_names(&caps[1]));
        }
    }

    for caps in COMMONJS_REQUIRE.captures_iter(content) {
        if !is_library(&caps[3], library) {
            continue;
        }
        if let Some(default) = caps.get(1) {
            imports.insert(default.as_str().to_string());
        }
        if let Some(destructured) = caps.get(2) {
            imports.extend(imported_names(destructured.as_str()));
        }
    }

    info!("Found {} imports from {}: {:?}", imports.len(), library, imports);
    imports
}

/// Split an argument list on top-level commas. Commas inside strings,
/// brackets and nested calls do not split.
pub fn parse_arguments(args: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for c in args.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q && prev != Some('\\') {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    current.push(c);
                }
                ')' | ']' | '}' => {
                    depth -= 1;
                    current.push(c);
                }
                ',' if depth == 0 => {
                    let arg = current.trim();
                    if !arg.is_empty() {
                        arguments.push(arg.to_string());
                    }
                    current.clear();
                }
                _ => current.push(c),
            },
        }
        prev = Some(c);
    }

    let arg = current.trim();
    if !arg.is_empty() {
        arguments.push(arg.to_string());
    }
    arguments
}

fn is_static_argument(arg: &str) -> bool {
    let arg = arg.trim();
    arg.is_empty()
        || arg.starts_with(['\'', '"', '`'])
        || NUMBER_LITERAL.is_match(arg)
        || matches!(arg, "true" | "false" | "null" | "undefined")
        || (arg.starts_with('[') && arg.ends_with(']'))
        || (arg.starts_with('{') && arg.ends_with('}'))
        || (arg.contains("=>") && !arg.contains('{'))
}

/// True when every argument is a literal or a single-expression arrow
/// function, so a captured call can be replayed as-is.
pub fn are_args_static(arguments: &[String]) -> bool {
    arguments.iter().all(|arg| is_static_argument(arg))
}

/// Calls to any of `function_names` in `content`, grouped by function.
pub fn find_call_sites(
    content: &str,
    function_names: &BTreeSet<String>,
    file_path: &Path,
) -> Vec<CallSite> {
    let mut call_sites = Vec::new();

    for name in function_names {
        // One level of nested parentheses inside the argument list.
        let pattern = format!(
            r"\b{}\s*\(((?:[^()]|\([^()]*\))*)\)",
            regex::escape(name)
        );
        let call = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                continue;
            }
        };

        for (index, line) in content.lines().enumerate() {
            for caps in call.captures_iter(line) {
                let arguments = parse_arguments(&caps[1]);
                let has_static_args = are_args_static(&arguments);
                debug!("Found call: {} at {}:{}", name, file_path.display(), index + 1);
                call_sites.push(CallSite {
                    function_name: name.clone(),
                    file_path: file_path.to_path_buf(),
                    line_number: index + 1,
                    arguments,
                    has_static_args,
                });
            }
        }
    }

    info!("Found {} call sites in {}", call_sites.len(), file_path.display());
    call_sites
}

/// Every call into `library` under `source_dir`, skipping `node_modules`.
/// Files that cannot be read are logged and skipped.
pub fn detect_usage(source_dir: &Path, library: &str) -> Result<Vec<CallSite>, FunctionalError> {
    if !source_dir.is_dir() {
        return Err(FunctionalError::SourceDirNotFound(source_dir.to_path_buf()));
    }

    let pattern = source_dir.join("**").join("*");
    let pattern_str = pattern.to_str().ok_or(FunctionalError::Pattern(glob::PatternError {
        pos: 0,
        msg: "Invalid UTF-8 path",
    }))?;

    let mut all_call_sites = Vec::new();
    for entry in glob::glob(pattern_str)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };
        let has_source_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
        if !has_source_ext || !path.is_file() {
            continue;
        }
        if path.components().any(|c| c.as_os_str() == "node_modules") {
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                continue;
            }
        };
        let imports = find_imports(&content, library);
        if !imports.is_empty() {
            all_call_sites.extend(find_call_sites(&content, &imports, &path));
        }
    }

    info!(
        "Found {} total call sites for {}",
        all_call_sites.len(),
        library
    );
    Ok(all_call_sites)
}
