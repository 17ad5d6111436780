//! Derivation Cache
//!
//! A derivation is a named, cached computation that re-evaluates only when
//! its dependencies change.
//!
//! # How Derivations Work
//!
//! 1. `define` stores the function. Nothing runs yet.
//!
//! 2. On first read, the function runs and the result is cached.
//!
//! 3. When a dependency is written, the invalidation engine marks the
//!    derivation dirty.
//!
//! 4. On the next read, the function runs again with fresh dependency
//!    tracking and the cache is replaced.
//!
//! Derivations that are never read stay dirty, so no work is wasted on
//! values nobody looks at.
//!
//! The dirty flag itself lives on the graph node; this cache holds the
//! function, the last value and bookkeeping counters.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::graph::NodeId;
use crate::value::Value;

use super::scope::Scope;

/// Function computing a derivation.
pub type DeriveFn = dyn Fn(&Scope<'_>) -> Result<Value> + Send + Sync;

struct DerivationSlot {
    node: NodeId,
    compute: Arc<DeriveFn>,
    cached: Option<Value>,
    recomputations: u64,
    invalidations: u64,
}

/// All derivations of one session, in definition order.
#[derive(Default)]
pub(crate) struct DerivationCache {
    slots: IndexMap<String, DerivationSlot>,
}

impl DerivationCache {
    pub fn define(&mut self, name: &str, node: NodeId, compute: Arc<DeriveFn>) {
        self.slots.insert(
            name.to_string(),
            DerivationSlot {
                node,
                compute,
                cached: None,
                recomputations: 0,
                invalidations: 0,
            },
        );
    }

    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.slots.get(name).map(|slot| slot.node)
    }

    /// The function to run for a recomputation.
    pub fn compute_fn(&self, name: &str) -> Option<Arc<DeriveFn>> {
        self.slots.get(name).map(|slot| Arc::clone(&slot.compute))
    }

    /// Last successfully computed value.
    pub fn cached(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).and_then(|slot| slot.cached.as_ref())
    }

    /// Store a fresh result.
    pub fn store(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.slots.get_mut(name) {
            slot.cached = Some(value);
            slot.recomputations += 1;
        }
    }

    /// Count a `Clean -> Dirty` transition.
    pub fn note_invalidated(&mut self, name: &str) {
        if let Some(slot) = self.slots.get_mut(name) {
            slot.invalidations += 1;
        }
    }

    pub fn recomputations(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|slot| slot.recomputations)
    }

    pub fn invalidations(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|slot| slot.invalidations)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

impl std::fmt::Debug for DerivationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(name, slot)| {
                (name, (slot.cached.is_some(), slot.recomputations))
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_fn() -> Arc<DeriveFn> {
        Arc::new(|_: &Scope<'_>| -> Result<Value> { Ok(Value::Null) })
    }

    #[test]
    fn store_counts_recomputations() {
        let mut cache = DerivationCache::default();
        cache.define("dat", NodeId::from_index(2), null_fn());

        assert!(cache.cached("dat").is_none());
        assert_eq!(cache.recomputations("dat"), Some(0));

        cache.store("dat", Value::from(1));
        cache.store("dat", Value::from(2));

        assert_eq!(cache.cached("dat"), Some(&Value::from(2)));
        assert_eq!(cache.recomputations("dat"), Some(2));
    }

    #[test]
    fn unknown_names_have_no_counters() {
        let cache = DerivationCache::default();
        assert!(cache.recomputations("nope").is_none());
        assert!(cache.compute_fn("nope").is_none());
    }

    #[test]
    fn invalidations_are_counted_separately() {
        let mut cache = DerivationCache::default();
        cache.define("dat", NodeId::from_index(0), null_fn());

        cache.note_invalidated("dat");
        assert_eq!(cache.invalidations("dat"), Some(1));
        assert_eq!(cache.recomputations("dat"), Some(0));
    }
}
