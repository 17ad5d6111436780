//! Signal Store
//!
//! Named mutable values. Signals are the roots of the dependency graph: they
//! are written from outside (widget events) or by effects, and read by
//! derivations and effects.
//!
//! The store only holds values. Edge recording and invalidation are done by
//! the session, which owns both the store and the graph.

use indexmap::IndexMap;

use crate::config::ChangeDetection;
use crate::error::{ReactiveError, Result};
use crate::graph::NodeId;
use crate::value::Value;

#[derive(Debug)]
struct SignalSlot {
    node: NodeId,
    value: Value,
    /// Number of writes that changed (or were treated as changing) the value.
    version: u64,
}

/// All signals of one session, in declaration order.
#[derive(Debug, Default)]
pub(crate) struct SignalStore {
    slots: IndexMap<String, SignalSlot>,
}

impl SignalStore {
    pub fn declare(&mut self, name: &str, node: NodeId, value: Value) {
        self.slots.insert(
            name.to_string(),
            SignalSlot {
                node,
                value,
                version: 0,
            },
        );
    }

    pub fn node(&self, name: &str) -> Result<NodeId> {
        self.slots
            .get(name)
            .map(|slot| slot.node)
            .ok_or_else(|| ReactiveError::UnknownSignal(name.to_string()))
    }

    pub fn value(&self, name: &str) -> Result<&Value> {
        self.slots
            .get(name)
            .map(|slot| &slot.value)
            .ok_or_else(|| ReactiveError::UnknownSignal(name.to_string()))
    }

    pub fn version(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|slot| slot.version)
    }

    /// Overwrite a signal.
    ///
    /// Returns the signal's node when dependents must be invalidated, or
    /// `None` when change detection found the value unchanged.
    pub fn write(
        &mut self,
        name: &str,
        value: Value,
        detection: ChangeDetection,
    ) -> Result<Option<NodeId>> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| ReactiveError::UnknownSignal(name.to_string()))?;

        if detection == ChangeDetection::ValueChanged && slot.value == value {
            return Ok(None);
        }

        slot.value = value;
        slot.version += 1;
        Ok(Some(slot.node))
    }

    /// Current values as an ordered JSON object.
    pub fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.value.to_json()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
