//! Generation domain module - describes how the external generator is invoked
//!
//! This module holds the value types shared by the invoker and the HTTP layer:
//! the language token, the per-invocation options, the cancellation context and
//! the classified invocation errors.

pub mod context;
pub mod errors;
pub mod options;
pub mod traits;
pub mod types;

pub use context::*;
pub use errors::*;
pub use options::*;
pub use traits::*;
pub use types::*;
