//! Rule tree definitions
//!
//! Declarative inclusion rules: leaf conditions with a comparison operator,
//! combined by AND/OR/NOT, with optional nested groups.

pub mod operator;
pub mod types;

pub use operator::{Combinator, RuleOperator};
pub use types::{InclusionRules, RuleCondition};
