//! Eligo Core - Shared types for the Eligo extraction engine
//!
//! This crate provides the fundamental types used across the Eligo workspace:
//! - Value types for runtime data
//! - Rule tree definitions (conditions, combinators, operators)

pub mod rules;
pub mod types;

// Re-export commonly used types
pub use rules::{Combinator, InclusionRules, RuleCondition, RuleOperator};
pub use types::Value;
