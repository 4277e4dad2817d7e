//! Example-based test generation for library upgrades: find where a codebase
//! calls into a library, instrument those calls at runtime, and turn the
//! captured inputs and outputs into Jest tests.

pub mod error;
pub mod instrumentation;
pub mod models;
pub mod testgen;
pub mod type_parser;
pub mod usage;

pub use error::FunctionalError;
pub use instrumentation::{generate_instrumentation_script, generate_wrapper};
pub use models::{CallSite, CapturedCall, FunctionSignature};
pub use testgen::{generate_test_case, generate_test_file};
pub use type_parser::{parse_dts_content, parse_dts_file};
pub use usage::{detect_usage, find_call_sites, find_imports};
