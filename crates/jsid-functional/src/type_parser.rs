use crate::error::FunctionalError;
use crate::models::FunctionSignature;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

/// `export function name<T>(params): ReturnType;`
static FUNCTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+function\s+(\w+)(?:<[^>]+>)?\s*\(([^)]*)\)\s*:\s*([^;]+)\s*;").expect("valid function pattern")
});

static PARAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*:\s*([^,]+)").expect("valid parameter pattern"));

/// Parse a `.d.ts` file; the module name is the file stem.
pub fn parse_dts_file(path: &Path) -> Result<Vec<FunctionSignature>, FunctionalError> {
    info!("Parsing type definitions from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".ts").trim_end_matches(".d"))
        .unwrap_or_default();
    Ok(parse_dts_content(&content, stem))
}

pub fn parse_dts_content(content: &str, module: &str) -> Vec<FunctionSignature> {
    let signatures: Vec<FunctionSignature> = FUNCTION_PATTERN
        .captures_iter(content)
        .map(|caps| {
            let name = caps[1].to_string();
            let params = caps[2].trim();
            let return_type = caps[3].trim().to_string();

            let parameters = PARAM_PATTERN
                .captures_iter(params)
                .map(|p| (p[1].to_string(), p[2].trim().to_string()))
                .collect();

            debug!("Parsed function: {}({}) -> {}", name, params, return_type);
            FunctionSignature {
                name,
                parameters,
                return_type,
                module: module.to_string(),
            }
        })
        .collect();

    info!("Found {} function signatures", signatures.len());
    signatures
}
