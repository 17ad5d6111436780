//! Effect Runner
//!
//! An effect is a side-effecting callback that pushes reactive state to the
//! outside world, typically by calling a render sink.
//!
//! # Kinds
//!
//! - **Continuous** effects run once at registration and again after every
//!   write that invalidates something they read (or declared).
//! - **Event-gated** effects never run at registration and run only after a
//!   write to one of their trigger signals. Their other reads are tracked so
//!   the callback sees current values, but those reads never schedule a run.
//!
//! # Differences from Derivations
//!
//! - Derivations return a value; effects do not.
//! - Derivations are lazy (compute on read); effects are eager (run when
//!   scheduled).
//! - Effects are the isolation boundary: an error or panic escaping a
//!   callback is caught here and turned into an `EffectFailure`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::{BoxError, ReactiveError};
use crate::graph::NodeId;

use super::scope::Scope;

/// Effect callback.
pub type EffectFn = dyn Fn(&Scope<'_>) -> Result<(), BoxError> + Send + Sync;

/// How an effect gets scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Continuous,
    EventGated,
}

struct EffectSlot {
    node: NodeId,
    kind: EffectKind,
    callback: Arc<EffectFn>,
    declared: SmallVec<[NodeId; 4]>,
    runs: u64,
    failures: u64,
}

/// What the session needs to run one effect.
pub(crate) struct EffectTask {
    pub name: String,
    pub callback: Arc<EffectFn>,
    pub declared: SmallVec<[NodeId; 4]>,
}

/// All effects of one session, in registration order.
#[derive(Default)]
pub(crate) struct EffectRunner {
    slots: IndexMap<String, EffectSlot>,
}

impl EffectRunner {
    pub fn register(
        &mut self,
        name: &str,
        node: NodeId,
        kind: EffectKind,
        declared: SmallVec<[NodeId; 4]>,
        callback: Arc<EffectFn>,
    ) {
        self.slots.insert(
            name.to_string(),
            EffectSlot {
                node,
                kind,
                callback,
                declared,
                runs: 0,
                failures: 0,
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<NodeId> {
        self.slots.shift_remove(name).map(|slot| slot.node)
    }

    pub(crate) fn task(&self, name: &str) -> Option<EffectTask> {
        self.slots.get(name).map(|slot| EffectTask {
            name: name.to_string(),
            callback: Arc::clone(&slot.callback),
            declared: slot.declared.clone(),
        })
    }

    pub fn record_run(&mut self, name: &str, failed: bool) {
        if let Some(slot) = self.slots.get_mut(name) {
            slot.runs += 1;
            if failed {
                slot.failures += 1;
            }
        }
    }

    pub fn runs(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|slot| slot.runs)
    }

    pub fn failures(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|slot| slot.failures)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

impl std::fmt::Debug for EffectRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .map(|(name, slot)| (name, (slot.kind, slot.runs, slot.failures))),
            )
            .finish()
    }
}

/// Run a callback, turning a panic into an error.
pub(crate) fn invoke(callback: &EffectFn, scope: &Scope<'_>) -> Result<(), BoxError> {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(scope))) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload).into()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Wrap a callback error as an `EffectFailure`.
pub(crate) fn failure(name: &str, cause: &BoxError) -> ReactiveError {
    ReactiveError::EffectFailure {
        name: name.to_string(),
        cause: cause.to_string(),
    }
}
