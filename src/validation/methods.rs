use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

use super::params::ResolvedParams;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$").unwrap()
});

/// One validation check, resolved when a route's rules are constructed.
///
/// The set is closed: a rule names its checks as enum variants, so a
/// nonexistent check fails at rule construction rather than at evaluation.
#[derive(Debug, Clone)]
pub enum ValidationMethod {
    /// String with optional length bounds (in characters).
    String { min: Option<usize>, max: Option<usize> },
    /// Number with optional inclusive range.
    Number { min: Option<f64>, max: Option<f64> },
    Boolean,
    Array,
    Object,
    /// Value must equal one of the listed strings.
    InSet(Vec<std::string::String>),
    /// String value must match the precompiled pattern.
    Matches(Regex),
    /// Calendar date in `YYYY-MM-DD` form.
    Date,
    Email,
    Url,
    /// String that parses as JSON.
    JsonString,
    /// Value must equal the value resolved at another parameter path.
    EqualsField(std::string::String),
    /// Caller-supplied predicate, reported under `name`.
    Custom {
        name: &'static str,
        check: fn(&Value, &ResolvedParams) -> bool,
    },
}

impl ValidationMethod {
    pub fn string() -> Self {
        Self::String { min: None, max: None }
    }

    pub fn string_bounded(min: usize, max: usize) -> Self {
        Self::String { min: Some(min), max: Some(max) }
    }

    pub fn number() -> Self {
        Self::Number { min: None, max: None }
    }

    pub fn number_range(min: f64, max: f64) -> Self {
        Self::Number { min: Some(min), max: Some(max) }
    }

    pub fn in_set<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<std::string::String>,
    {
        Self::InSet(allowed.into_iter().map(Into::into).collect())
    }

    /// Name the check reports failures under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::InSet(_) => "in_set",
            Self::Matches(_) => "matches",
            Self::Date => "date",
            Self::Email => "email",
            Self::Url => "url",
            Self::JsonString => "json",
            Self::EqualsField(_) => "equals_field",
            Self::Custom { name, .. } => name,
        }
    }

    /// Run the check against a resolved value. `params` supplies the full
    /// view for cross-field checks.
    pub fn check(&self, value: &Value, params: &ResolvedParams) -> Result<(), std::string::String> {
        match self {
            Self::String { min, max } => {
                let s = value.as_str().ok_or("must be a string")?;
                let chars = s.chars().count();
                if let Some(min) = min {
                    if chars < *min {
                        return Err(format!("must be at least {min} characters"));
                    }
                }
                if let Some(max) = max {
                    if chars > *max {
                        return Err(format!("must be at most {max} characters"));
                    }
                }
                Ok(())
            }
            Self::Number { min, max } => {
                let n = value.as_f64().ok_or("must be a number")?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("must be at least {min}"));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("must be at most {max}"));
                    }
                }
                Ok(())
            }
            Self::Boolean => value
                .is_boolean()
                .then_some(())
                .ok_or_else(|| "must be a boolean".into()),
            Self::Array => value
                .is_array()
                .then_some(())
                .ok_or_else(|| "must be an array".into()),
            Self::Object => value
                .is_object()
                .then_some(())
                .ok_or_else(|| "must be an object".into()),
            Self::InSet(allowed) => {
                let matched = match value {
                    Value::String(s) => allowed.iter().any(|a| a == s),
                    Value::Number(n) => allowed.iter().any(|a| *a == n.to_string()),
                    _ => false,
                };
                matched
                    .then_some(())
                    .ok_or_else(|| format!("must be one of {}", allowed.join(", ")))
            }
            Self::Matches(pattern) => {
                let s = value.as_str().ok_or("must be a string")?;
                pattern
                    .is_match(s)
                    .then_some(())
                    .ok_or_else(|| "does not match the expected pattern".into())
            }
            Self::Date => {
                let s = value.as_str().ok_or("must be a string")?;
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|_| ())
                    .map_err(|_| "must be a date in YYYY-MM-DD form".into())
            }
            Self::Email => {
                let s = value.as_str().ok_or("must be a string")?;
                EMAIL_RE
                    .is_match(s)
                    .then_some(())
                    .ok_or_else(|| "must be a valid email address".into())
            }
            Self::Url => {
                let s = value.as_str().ok_or("must be a string")?;
                reqwest::Url::parse(s)
                    .map(|_| ())
                    .map_err(|_| "must be a valid URL".into())
            }
            Self::JsonString => {
                let s = value.as_str().ok_or("must be a string")?;
                serde_json::from_str::<Value>(s)
                    .map(|_| ())
                    .map_err(|_| "must be a JSON-encoded string".into())
            }
            Self::EqualsField(other) => {
                if params.resolve(other) == Some(value) {
                    Ok(())
                } else {
                    Err(format!("must match {other}"))
                }
            }
            Self::Custom { check, .. } => {
                if check(value, params) {
                    Ok(())
                } else {
                    Err("invalid value".into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> ResolvedParams {
        ResolvedParams::new(value.as_object().unwrap().clone())
    }

    fn empty() -> ResolvedParams {
        ResolvedParams::default()
    }

    #[test]
    fn string_checks_type_and_bounds() {
        let method = ValidationMethod::string_bounded(2, 4);
        assert!(method.check(&json!("A4"), &empty()).is_ok());
        assert!(method.check(&json!(42), &empty()).is_err());
        assert!(method.check(&json!("x"), &empty()).is_err());
        assert!(method.check(&json!("toolong"), &empty()).is_err());
    }

    #[test]
    fn number_checks_range() {
        let method = ValidationMethod::number_range(1.0, 100.0);
        assert!(method.check(&json!(90), &empty()).is_ok());
        assert!(method.check(&json!(0), &empty()).is_err());
        assert!(method.check(&json!("90"), &empty()).is_err());
    }

    #[test]
    fn in_set_matches_strings_and_numbers() {
        let method = ValidationMethod::in_set(["high", "medium", "low"]);
        assert!(method.check(&json!("medium"), &empty()).is_ok());
        let err = method.check(&json!("ultra"), &empty()).unwrap_err();
        assert!(err.contains("high, medium, low"));

        let numeric = ValidationMethod::in_set(["90", "180", "270"]);
        assert!(numeric.check(&json!(180), &empty()).is_ok());
    }

    #[test]
    fn matches_uses_precompiled_pattern() {
        let method = ValidationMethod::Matches(Regex::new(r"^[ab]\d$").unwrap());
        assert!(method.check(&json!("a4"), &empty()).is_ok());
        assert!(method.check(&json!("c4"), &empty()).is_err());
    }

    #[test]
    fn format_checks() {
        assert!(ValidationMethod::Date.check(&json!("2024-05-01"), &empty()).is_ok());
        assert!(ValidationMethod::Date.check(&json!("01/05/2024"), &empty()).is_err());

        assert!(ValidationMethod::Email.check(&json!("ops@example.com"), &empty()).is_ok());
        assert!(ValidationMethod::Email.check(&json!("not-an-email"), &empty()).is_err());

        assert!(ValidationMethod::Url.check(&json!("https://example.com/a.jpg"), &empty()).is_ok());
        assert!(ValidationMethod::Url.check(&json!("::nope::"), &empty()).is_err());

        assert!(ValidationMethod::JsonString.check(&json!("{\"a\":1}"), &empty()).is_ok());
        assert!(ValidationMethod::JsonString.check(&json!("{broken"), &empty()).is_err());
    }

    #[test]
    fn equals_field_resolves_against_params() {
        let view = params(json!({"password": "s3cret", "confirm": "s3cret"}));
        let method = ValidationMethod::EqualsField("password".into());
        assert!(method.check(&json!("s3cret"), &view).is_ok());
        assert!(method.check(&json!("other"), &view).is_err());
    }

    #[test]
    fn custom_predicate_reports_under_its_name() {
        let method = ValidationMethod::Custom {
            name: "even",
            check: |value, _| value.as_i64().is_some_and(|n| n % 2 == 0),
        };
        assert_eq!(method.name(), "even");
        assert!(method.check(&json!(4), &empty()).is_ok());
        assert!(method.check(&json!(3), &empty()).is_err());
    }
}
