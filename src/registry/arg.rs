//! Target → platform keyword-argument conversion

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Adapter, Target};

/// Turns a target into the arguments a platform's send call expects
pub type ArgConverter = Arc<dyn Fn(&Target) -> Result<Map<String, Value>> + Send + Sync>;

/// (target kind, platform) → argument converter
#[derive(Default)]
pub struct ArgRegistry {
    converters: HashMap<(&'static str, Adapter), ArgConverter>,
}

impl ArgRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: &'static str, adapter: Adapter, converter: F)
    where
        F: Fn(&Target) -> Result<Map<String, Value>> + Send + Sync + 'static,
    {
        if !Target::KINDS.contains(&kind) {
            warn!(kind, %adapter, "registering arg converter for an unknown target kind");
        }
        debug!(kind, %adapter, "register arg converter");
        self.converters.insert((kind, adapter), Arc::new(converter));
    }

    pub fn supports(&self, kind: &str, adapter: Adapter) -> bool {
        self.converters
            .keys()
            .any(|(k, a)| *k == kind && *a == adapter)
    }

    /// Convert `target` for `adapter`
    pub fn convert(&self, target: &Target, adapter: Adapter) -> Result<Map<String, Value>> {
        let kind = target.kind();
        let converter =
            self.converters
                .get(&(kind, adapter))
                .ok_or(Error::TargetNotSupported { kind, adapter })?;
        converter(target)
    }

    pub fn clear(&mut self) {
        self.converters.clear();
    }
}
