use async_trait::async_trait;

use crate::{conversation::Turn, Result};

/// Chat-completion backend used by the session registry.
///
/// Implementations are stateless with respect to history: the caller passes
/// the full retained conversation on every call and owns the bookkeeping.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Generate the next model turn for `history` (last entry is the user's turn).
    async fn generate(&self, history: &[Turn]) -> Result<String>;
}
