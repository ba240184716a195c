//! Text-completion provider boundary.
//!
//! Decomposition, answer generation and reflection all call a provider
//! through this trait. The prompts live in [`crate::prompts`].

use crate::errors::IrraError;

/// Produces text for a prompt.
///
/// Implementations own their own timeouts. The core never retries a failed
/// completion; each caller decides whether to degrade or surface the error.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, IrraError>;

    /// Identifier for logs and error messages.
    fn name(&self) -> &str {
        "completion"
    }
}

impl<T: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<T> {
    fn complete(&self, prompt: &str) -> Result<String, IrraError> {
        (**self).complete(prompt)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
