//! Ordered override sources with an explicit opt-out
//!
//! Several lookups follow the same rule: try the most specific override
//! first, then the next one, and finally fall back to a default. Each source
//! either produces a value, fails, or returns [`Error::FallbackToDefault`] to
//! pass control to the next source. Absent sources are simply not pushed.

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{Error, Result};

type Source<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T>> + Send + 'a>;

/// Sources consulted in push order
pub struct OverrideChain<'a, T> {
    sources: Vec<(&'static str, Source<'a, T>)>,
}

impl<'a, T> Default for OverrideChain<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> OverrideChain<'a, T> {
    pub fn new() -> Self {
        OverrideChain {
            sources: Vec::new(),
        }
    }

    /// Append a source; `label` only appears in logs
    pub fn push<F>(mut self, label: &'static str, source: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, Result<T>> + Send + 'a,
    {
        self.sources.push((label, Box::new(source)));
        self
    }

    /// Append a source if present
    pub fn push_opt<F>(self, label: &'static str, source: Option<F>) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, Result<T>> + Send + 'a,
    {
        match source {
            Some(source) => self.push(label, source),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run sources until one handles the request
    ///
    /// `Ok(None)` means every source was absent or opted out and the caller
    /// should apply its default.
    pub async fn run(self) -> Result<Option<T>> {
        for (label, source) in self.sources {
            match source().await {
                Ok(value) => return Ok(Some(value)),
                Err(Error::FallbackToDefault) => {
                    debug!(source = label, "override opted out, trying next source");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}
