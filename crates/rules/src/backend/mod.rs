//! Search backend collaborators.
//!
//! The engine never talks to a concrete store. Counting, sorted search,
//! scrolling and term aggregation are expressed as async traits; the
//! host injects implementations (a cluster client in production, the
//! in-memory [`crate::memory::MemoryBackend`] in tests and dry runs).

mod filters;
mod types;

pub use filters::*;
pub use types::*;
