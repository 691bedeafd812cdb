//! Completion engine seam.
//!
//! The relay treats the completion engine as an opaque collaborator: one
//! call in, one reply or one failure out. No partial-completion or
//! streaming semantics are expected from it, and retry (if any) belongs
//! to the engine or the caller, never to the relay.

mod http;

pub use http::HttpCompletionEngine;

use async_trait::async_trait;

use crate::Result;
use crate::types::{CallerId, Usage};

/// One completed generation.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// Model attribution, when the engine reports one.
    pub model: Option<String>,
    pub usage: Usage,
}

/// Opaque completion collaborator.
///
/// Implementations self-report a `name` for logging. Any failure
/// (timeout, rate limit, server error) is a single unit: the relay rolls
/// back the budget reservation and surfaces one error.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Engine name for logging/debugging.
    fn name(&self) -> &str;

    /// Generate a reply to `message` for `caller`.
    async fn generate(
        &self,
        message: &str,
        context: Option<&str>,
        caller: &CallerId,
    ) -> Result<Completion>;
}
