use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A function declared in a `.d.ts` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    /// `(name, type)` pairs in declaration order.
    pub parameters: Vec<(String, String)>,
    pub return_type: String,
    /// e.g. `lodash` or `groupBy` for `lodash/groupBy.d.ts`.
    pub module: String,
}

/// A location where a library function is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub function_name: String,
    pub file_path: PathBuf,
    /// 1-based.
    pub line_number: usize,
    pub arguments: Vec<String>,
    /// All arguments are literals or single-expression arrow functions.
    pub has_static_args: bool,
}

/// A call observed at runtime, with its inputs and output serialized as
/// JavaScript source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedCall {
    pub function_name: String,
    pub inputs: Vec<String>,
    pub output: String,
    /// `file:line` of the original call.
    pub location: String,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_reason: Option<String>,
}
