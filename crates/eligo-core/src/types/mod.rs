//! Core type definitions

pub mod value;

pub use value::Value;
