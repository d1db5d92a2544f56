//! Rule-based parameter validation
//!
//! Every conversion route carries a [`RuleSet`] describing the parameters it
//! accepts. [`evaluate`] walks the rules against a merged parameter view and
//! returns a [`ValidationOutcome`] keyed by parameter path; an empty outcome
//! means the request passed. The engine keeps no state between calls.

mod engine;
mod methods;
mod params;

pub use engine::{ErrorMode, FieldError, Rule, RuleSet, ValidationOutcome, evaluate};
pub use methods::ValidationMethod;
pub use params::ResolvedParams;
