use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::methods::ValidationMethod;
use super::params::ResolvedParams;

/// How method failures accumulate for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Collect every failing method (the default).
    #[default]
    All,
    /// Stop at the first failing method.
    FirstFailure,
}

/// One constraint on one parameter path.
#[derive(Debug, Clone)]
pub struct Rule {
    pub key_path: String,
    pub required: bool,
    pub methods: Vec<ValidationMethod>,
    pub error_mode: ErrorMode,
}

impl Rule {
    pub fn new(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            required: false,
            methods: Vec::new(),
            error_mode: ErrorMode::All,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn method(mut self, method: ValidationMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn first_failure(mut self) -> Self {
        self.error_mode = ErrorMode::FirstFailure;
        self
    }
}

pub type RuleSet = Vec<Rule>;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub method: String,
    pub message: String,
}

/// Per-field errors from one evaluation, keyed by parameter path. Empty means
/// the rule set passed. Produced fresh per call and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationOutcome {
    errors: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationOutcome {
    /// Outcome carrying exactly one error, for rejections produced outside
    /// rule evaluation (e.g. the request-level schema gate).
    pub fn single(
        key_path: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut outcome = Self::default();
        outcome.push(
            &key_path.into(),
            FieldError { method: method.into(), message: message.into() },
        );
        outcome
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<FieldError>> {
        &self.errors
    }

    pub fn field(&self, key_path: &str) -> Option<&[FieldError]> {
        self.errors.get(key_path).map(Vec::as_slice)
    }

    /// Number of fields with at least one error.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, key_path: &str, error: FieldError) {
        self.errors.entry(key_path.to_string()).or_default().push(error);
    }
}

/// Evaluate a rule set against the merged parameter view.
///
/// A required field that resolves to absent, null, or the empty string fails
/// with a `required` error and its methods never run. An optional absent
/// field is skipped entirely. Failures are aggregated across all rules; the
/// caller always sees the complete outcome, never just the first field.
pub fn evaluate(rules: &[Rule], params: &ResolvedParams) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for rule in rules {
        let value = match params.resolve(&rule.key_path) {
            Some(value) if is_present(value) => value,
            _ => {
                if rule.required {
                    outcome.push(
                        &rule.key_path,
                        FieldError {
                            method: "required".into(),
                            message: format!("{} cannot be empty or null", rule.key_path),
                        },
                    );
                }
                continue;
            }
        };

        for method in &rule.methods {
            if let Err(message) = method.check(value, params) {
                outcome.push(
                    &rule.key_path,
                    FieldError { method: method.name().into(), message },
                );
                if rule.error_mode == ErrorMode::FirstFailure {
                    break;
                }
            }
        }
    }

    outcome
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
