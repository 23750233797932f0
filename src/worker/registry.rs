//! Resolving unit-of-work names to executable definitions

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::store::ExecutionRecord;

/// An executable unit of work, run once per partition.
///
/// Implementations read only the rows their partition owns (the record
/// carries the descriptor), so concurrent executions never interfere.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    async fn execute(&self, record: &ExecutionRecord) -> anyhow::Result<()>;
}

/// Maps unit-of-work names to their definitions
#[derive(Default)]
pub struct UnitRegistry {
    units: HashMap<String, Arc<dyn WorkUnit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, unit: Arc<dyn WorkUnit>) {
        self.units.insert(name.into(), unit);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn WorkUnit>> {
        self.units.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.units.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopUnit;

    #[async_trait]
    impl WorkUnit for NoopUnit {
        async fn execute(&self, _record: &ExecutionRecord) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn resolve_returns_registered_units_only() {
        let mut registry = UnitRegistry::new();
        registry.register("noop", Arc::new(NoopUnit));

        assert!(registry.resolve("noop").is_some());
        assert!(registry.resolve("missing").is_none());
        assert_eq!(registry.names(), vec!["noop"]);
    }
}
