//! Trait definitions for drcare's pluggable components.

mod llm;

pub use llm::*;
