//! Invalidation Engine
//!
//! Owns the node arena of one session and propagates writes through it.
//!
//! # Algorithm
//!
//! When a signal is written:
//!
//! 1. Walk its dependents breadth-first with a visited set.
//! 2. Mark every reachable derivation dirty (a no-op if it already is).
//! 3. Queue every reachable continuous effect, plus the event-gated effects
//!    whose trigger set names the signal.
//!
//! Queued effects are drained with [`InvalidationEngine::take_pending`] in
//! registration order. Derivations are never recomputed here; they are pulled
//! lazily by whoever reads them next.

use std::collections::{HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::trace;

use super::node::{Node, NodeId, NodeKind, NodeState};

/// Outcome of propagating a single write.
#[derive(Debug, Default)]
pub struct Invalidation {
    pub dirtied: Vec<NodeId>,
    pub scheduled: Vec<NodeId>,
}

/// Dependency graph plus the queue of effects awaiting a run.
#[derive(Debug, Default)]
pub struct InvalidationEngine {
    nodes: Vec<Node>,
    names: IndexMap<String, NodeId>,
    pending: IndexSet<NodeId>,
}

impl InvalidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. The caller checks the name is free.
    pub fn add_node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(name, kind));
        self.names.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<(NodeId, NodeKind)> {
        self.names
            .get(name)
            .map(|&id| (id, self.nodes[id.index()].kind()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.nodes[id.index()].name()
    }

    pub fn state(&self, id: NodeId) -> NodeState {
        self.nodes[id.index()].state()
    }

    pub fn set_state(&mut self, id: NodeId, state: NodeState) {
        self.nodes[id.index()].set_state(state);
    }

    /// Replace the dependency set of `id`, keeping reverse edges in sync.
    pub fn set_dependencies<I>(&mut self, id: NodeId, deps: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut fresh: SmallVec<[NodeId; 4]> = SmallVec::new();
        for dep in deps {
            if dep != id && !fresh.contains(&dep) {
                fresh.push(dep);
            }
        }

        let old = self.nodes[id.index()].replace_dependencies(fresh.clone());
        for dep in old.iter().filter(|d| !fresh.contains(d)) {
            self.nodes[dep.index()].remove_dependent(id);
        }
        for dep in &fresh {
            self.nodes[dep.index()].add_dependent(id);
        }
    }

    /// Add one edge while `id` is still evaluating.
    ///
    /// Writes made later in the same evaluation then reach `id`.
    pub fn add_dependency(&mut self, id: NodeId, dep: NodeId) {
        let node = &self.nodes[id.index()];
        if dep == id || node.dependencies().contains(&dep) {
            return;
        }
        let mut deps: SmallVec<[NodeId; 4]> = node.dependencies().iter().copied().collect();
        deps.push(dep);
        self.nodes[id.index()].replace_dependencies(deps);
        self.nodes[dep.index()].add_dependent(id);
    }

    /// Replace the trigger set of an event-gated effect.
    pub fn set_triggers<I>(&mut self, id: NodeId, triggers: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut fresh: SmallVec<[NodeId; 2]> = SmallVec::new();
        for t in triggers {
            if !fresh.contains(&t) {
                fresh.push(t);
            }
        }

        let old = self.nodes[id.index()].replace_triggers(fresh.clone());
        for t in &old {
            self.nodes[t.index()].remove_triggered(id);
        }
        for t in &fresh {
            self.nodes[t.index()].add_triggered(id);
        }
    }

    /// Detach a node from the graph and free its name.
    ///
    /// The arena slot stays so ids remain stable.
    pub fn remove_node(&mut self, id: NodeId) {
        self.set_dependencies(id, std::iter::empty());
        self.set_triggers(id, std::iter::empty());

        let dependents: Vec<NodeId> = self.nodes[id.index()].dependents().iter().copied().collect();
        for dependent in dependents {
            let remaining: Vec<NodeId> = self.nodes[dependent.index()]
                .dependencies()
                .iter()
                .copied()
                .filter(|d| *d != id)
                .collect();
            self.set_dependencies(dependent, remaining);
        }

        let node = &mut self.nodes[id.index()];
        self.names.shift_remove(node.name());
        node.dispose();
        self.pending.shift_remove(&id);
    }

    /// Propagate a write to signal `source`.
    pub fn invalidate(&mut self, source: NodeId) -> Invalidation {
        let mut result = Invalidation::default();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();

        let source_node = &self.nodes[source.index()];
        queue.extend(source_node.dependents().iter().copied());

        // Event-gated effects fire on their triggers only
        let gated: Vec<NodeId> = source_node.triggered().iter().copied().collect();
        for effect in gated {
            self.schedule(effect, &mut result);
        }

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }

            let node = &mut self.nodes[id.index()];
            if node.is_disposed() {
                continue;
            }

            match node.kind() {
                NodeKind::Derivation => {
                    if node.invalidate() {
                        result.dirtied.push(id);
                    }
                    queue.extend(node.dependents().iter().copied());
                }
                NodeKind::Effect => {
                    if node.triggers().is_empty() {
                        self.schedule(id, &mut result);
                    }
                }
                NodeKind::Signal => {}
            }
        }

        trace!(
            signal = self.name(source),
            dirtied = result.dirtied.len(),
            scheduled = result.scheduled.len(),
            "invalidated"
        );

        result
    }

    fn schedule(&mut self, effect: NodeId, result: &mut Invalidation) {
        if self.nodes[effect.index()].is_disposed() {
            return;
        }
        if self.pending.insert(effect) {
            if self.nodes[effect.index()].state() == NodeState::Clean {
                self.nodes[effect.index()].set_state(NodeState::Dirty);
            }
            result.scheduled.push(effect);
        }
    }

    /// Drain queued effects in registration order.
    pub fn take_pending(&mut self) -> Vec<NodeId> {
        let mut batch: Vec<NodeId> = self.pending.drain(..).collect();
        batch.sort_unstable();
        batch
    }

    pub fn clear_pending(&mut self) {
        for id in std::mem::take(&mut self.pending) {
            self.nodes[id.index()].set_state(NodeState::Clean);
        }
    }

    /// Names of the nodes `id` currently depends on.
    pub fn dependency_names(&self, id: NodeId) -> Vec<String> {
        self.nodes[id.index()]
            .dependencies()
            .iter()
            .map(|d| self.name(*d).to_string())
            .collect()
    }

    /// Names of the nodes currently reading `id`.
    pub fn dependent_names(&self, id: NodeId) -> Vec<String> {
        self.nodes[id.index()]
            .dependents()
            .iter()
            .map(|d| self.name(*d).to_string())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }
}
