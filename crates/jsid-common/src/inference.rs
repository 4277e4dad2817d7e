//! Validation rule inference.
//!
//! Classifies a validation handler's source text by scanning a fixed,
//! ordered list of rule categories. The first category with a matching
//! sub-pattern decides the result; later categories are never consulted.
//! The order is a contract: a snippet with both a length check and an
//! email fragment classifies as email.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Email,
    Url,
    Phone,
    Numeric,
    MinLength,
    MaxLength,
    Required,
    Pattern,
    Unknown,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Email => "email",
            RuleKind::Url => "url",
            RuleKind::Phone => "phone",
            RuleKind::Numeric => "numeric",
            RuleKind::MinLength => "min_length",
            RuleKind::MaxLength => "max_length",
            RuleKind::Required => "required",
            RuleKind::Pattern => "pattern",
            RuleKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRule {
    pub kind: RuleKind,
    pub description: String,
    /// `None` only for [`RuleKind::Unknown`].
    pub confidence: Option<Confidence>,
}

impl ValidationRule {
    pub fn unknown() -> Self {
        Self {
            kind: RuleKind::Unknown,
            description: UNKNOWN_DESCRIPTION.to_string(),
            confidence: None,
        }
    }
}

const UNKNOWN_DESCRIPTION: &str = "Could not determine validation rule";

enum Description {
    Fixed(&'static str),
    /// `{}` is replaced by the first capture group; `fallback` is used when
    /// the matching sub-pattern captured nothing.
    Bounded {
        template: &'static str,
        fallback: &'static str,
    },
}

struct Category {
    kind: RuleKind,
    patterns: Vec<Regex>,
    description: Description,
    confidence: Confidence,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("valid rule pattern")
        })
        .collect()
}

static CATEGORIES: LazyLock<Vec<Category>> = LazyLock::new(|| {
    vec![
        Category {
            kind: RuleKind::Email,
            patterns: compile(&[r"@.*\.", r"email", r"\\.+@\\.+"]),
            description: Description::Fixed("Must be a valid email address"),
            confidence: Confidence::High,
        },
        Category {
            kind: RuleKind::Url,
            // literal "https?:" as written inside a regex literal
            patterns: compile(&[r"https\?:"]),
            description: Description::Fixed("Must be a valid URL"),
            confidence: Confidence::High,
        },
        Category {
            kind: RuleKind::Phone,
            patterns: compile(&[
                r"\\d\{3\}[-.]\\d\{3\}[-.]\\d\{4\}",
                r"\d{3}[-]\d{3}[-]\d{4}",
                r"phone",
            ]),
            description: Description::Fixed("Must be a valid phone number"),
            confidence: Confidence::Medium,
        },
        Category {
            kind: RuleKind::Numeric,
            patterns: compile(&[
                r"isNaN\s*\(",
                r"Number\s*\(",
                r"parseInt\s*\(",
                r"parseFloat\s*\(",
                r"\^\\d\+\$",
            ]),
            description: Description::Fixed("Must be a number"),
            confidence: Confidence::High,
        },
        Category {
            kind: RuleKind::MinLength,
            patterns: compile(&[r"\.length\s*<\s*(\d+)", r"\.length\s*>=\s*(\d+)", r"minlength"]),
            description: Description::Bounded {
                template: "Must be at least {} characters",
                fallback: "Must meet a minimum length requirement",
            },
            confidence: Confidence::High,
        },
        Category {
            kind: RuleKind::MaxLength,
            patterns: compile(&[r"\.length\s*>\s*(\d+)", r"\.length\s*<=\s*(\d+)", r"maxlength"]),
            description: Description::Bounded {
                template: "Must be at most {} characters",
                fallback: "Must meet a maximum length requirement",
            },
            confidence: Confidence::High,
        },
        Category {
            kind: RuleKind::Required,
            patterns: compile(&[
                r#"===?\s*['"][\s]*['"]"#,
                r"===?\s*null",
                r"===?\s*undefined",
                r"\.length\s*===?\s*0",
                r"!value",
                r"required",
            ]),
            description: Description::Fixed("Field is required"),
            confidence: Confidence::High,
        },
        Category {
            kind: RuleKind::Pattern,
            patterns: compile(&[r"/\^.*\$/", r"\.test\s*\(", r"\.match\s*\(", r"RegExp\s*\("]),
            description: Description::Fixed("Must match a specific pattern"),
            confidence: Confidence::Low,
        },
    ]
});

/// Infer the validation rule implemented by a snippet of handler code.
///
/// Never fails: empty input and unrecognized code both yield
/// [`ValidationRule::unknown`].
pub fn infer(code: &str) -> ValidationRule {
    if code.trim().is_empty() {
        info!("Empty code, returning unknown");
        return ValidationRule::unknown();
    }

    for category in CATEGORIES.iter() {
        for pattern in &category.patterns {
            let Some(caps) = pattern.captures(code) else {
                continue;
            };

            let description = match &category.description {
                Description::Fixed(text) => text.to_string(),
                Description::Bounded { template, fallback } => caps
                    .get(1)
                    .map(|bound| template.replace("{}", bound.as_str()))
                    .unwrap_or_else(|| fallback.to_string()),
            };

            info!(
                "Inferred rule type '{}' with confidence '{}'",
                category.kind, category.confidence
            );
            return ValidationRule {
                kind: category.kind,
                description,
                confidence: Some(category.confidence),
            };
        }
    }

    info!("No pattern matched, returning unknown");
    ValidationRule::unknown()
}
