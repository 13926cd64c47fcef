//! Port interfaces for the generation domain

use crate::generation::{GeneratorLanguage, GeneratorOptions, InvocationContext, InvocationError};
use async_trait::async_trait;

/// Runs the external code generator
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate code for `language` from `input_specs`, honouring `ctx`.
    ///
    /// Returns once the generator has exited and its output has been forwarded to
    /// the sinks in `options`, or once `ctx` fires and the generator was stopped.
    async fn invoke(
        &self,
        ctx: &InvocationContext,
        language: &GeneratorLanguage,
        input_specs: &[String],
        options: GeneratorOptions,
    ) -> Result<(), InvocationError>;
}
