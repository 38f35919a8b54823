//! In-memory search backend.
//!
//! Implements every backend trait over a plain list of messages so the
//! engine can run against JSON-lines fixtures without a search cluster.

mod backend;
mod query;


pub use backend::{MemoryBackend, MemoryScrollCursor};
pub use query::{substitute_parameters, QueryExpr};
