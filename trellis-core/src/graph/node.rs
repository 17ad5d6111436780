//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use indexmap::IndexSet;
use smallvec::SmallVec;

/// Identifier of a node within one session's graph.
///
/// Ids are dense indices allocated in declaration order, so comparing two
/// effect ids compares their registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the node in the session's node arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A signal. Roots of the graph; always clean.
    Signal,

    /// A derivation. Has dependencies and may have dependents.
    /// Caches its computed value.
    Derivation,

    /// An effect. Leaves of the graph: they read but are never read.
    Effect,
}

/// Evaluation state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Cached value (or last effect run) reflects the current inputs.
    Clean,

    /// An upstream write happened since the last evaluation.
    Dirty,

    /// Evaluation is in progress. Reading a computing node is a cycle.
    Computing,
}

/// A node in the dependency graph.
#[derive(Debug)]
pub struct Node {
    name: String,
    kind: NodeKind,
    state: NodeState,

    /// Nodes this node read during its last evaluation (plus declared
    /// dependencies for effects).
    dependencies: SmallVec<[NodeId; 4]>,

    /// Nodes that read this node.
    dependents: IndexSet<NodeId>,

    /// Signals that gate this node (event-gated effects only).
    triggers: SmallVec<[NodeId; 2]>,

    /// Event-gated effects gated on this node (signals only).
    triggered: IndexSet<NodeId>,

    disposed: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: match kind {
                NodeKind::Signal => NodeState::Clean,
                // Start dirty to force the first computation
                NodeKind::Derivation => NodeState::Dirty,
                NodeKind::Effect => NodeState::Clean,
            },
            dependencies: SmallVec::new(),
            dependents: IndexSet::new(),
            triggers: SmallVec::new(),
            triggered: IndexSet::new(),
            disposed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_clean(&self) -> bool {
        self.state == NodeState::Clean
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        // Signals hold authoritative values and never leave Clean.
        if self.kind != NodeKind::Signal {
            self.state = state;
        }
    }

    /// Mark dirty after an upstream write.
    ///
    /// Returns true on a `Clean -> Dirty` transition.
    pub(crate) fn invalidate(&mut self) -> bool {
        if self.kind == NodeKind::Signal || self.state != NodeState::Clean {
            return false;
        }
        self.state = NodeState::Dirty;
        true
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }

    pub fn triggers(&self) -> &[NodeId] {
        &self.triggers
    }

    pub fn triggered(&self) -> &IndexSet<NodeId> {
        &self.triggered
    }

    pub(crate) fn replace_dependencies(&mut self, deps: SmallVec<[NodeId; 4]>) -> SmallVec<[NodeId; 4]> {
        std::mem::replace(&mut self.dependencies, deps)
    }

    pub(crate) fn replace_triggers(&mut self, triggers: SmallVec<[NodeId; 2]>) -> SmallVec<[NodeId; 2]> {
        std::mem::replace(&mut self.triggers, triggers)
    }

    pub(crate) fn add_dependent(&mut self, id: NodeId) {
        self.dependents.insert(id);
    }

    pub(crate) fn remove_dependent(&mut self, id: NodeId) {
        self.dependents.shift_remove(&id);
    }

    pub(crate) fn add_triggered(&mut self, id: NodeId) {
        self.triggered.insert(id);
    }

    pub(crate) fn remove_triggered(&mut self, id: NodeId) {
        self.triggered.shift_remove(&id);
    }

    pub(crate) fn dispose(&mut self) {
        self.disposed = true;
        self.state = NodeState::Clean;
        self.dependencies.clear();
        self.triggers.clear();
    }
}
