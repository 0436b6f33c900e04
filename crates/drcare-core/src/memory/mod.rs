//! Memory module - per-user context store and the consultation flows
//! that read and extend it.

mod consultation;
mod prompts;
mod store;

pub use consultation::ConsultationHandler;
pub use prompts::*;
pub use store::{BoundedGrowth, ContextStore, GrowthPolicy, MemoryHandle, MemoryRecord, Unbounded};
