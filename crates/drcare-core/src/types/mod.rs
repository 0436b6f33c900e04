//! Core types for drcare.

mod message;

pub use message::*;
