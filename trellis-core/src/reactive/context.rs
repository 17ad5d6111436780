//! Evaluation Context
//!
//! The context stack tracks which derivation or effect is currently
//! running. This enables automatic dependency tracking: when a signal or
//! derivation is read, the read is recorded against the node on top of the
//! stack.
//!
//! # Implementation
//!
//! Each session owns one stack. When a node starts evaluating we push a
//! frame for it; every tracked read appends to the top frame; when the
//! evaluation completes the frame is popped and its reads become the node's
//! new dependency set.
//!
//! Nested frames are the normal case: an effect reads a derivation, which
//! pushes its own frame while it recomputes.

use smallvec::SmallVec;

use crate::graph::{InvalidationEngine, NodeId, NodeKind, NodeState};

use super::session::Inner;

/// Reads recorded by one frame.
pub(crate) type Reads = SmallVec<[NodeId; 8]>;

/// An entry in the context stack.
#[derive(Debug)]
pub(crate) struct Frame {
    node: NodeId,
    kind: NodeKind,
    reads: Reads,
}

/// Stack of in-flight evaluations for one session.
#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub fn push(&mut self, node: NodeId, kind: NodeKind) {
        self.frames.push(Frame {
            node,
            kind,
            reads: SmallVec::new(),
        });
    }

    /// Pop the frame for `node`, returning its reads.
    ///
    /// Returns `None` when the top frame belongs to another node.
    pub fn pop(&mut self, node: NodeId) -> Option<Reads> {
        match self.frames.last() {
            Some(top) if top.node == node => self.frames.pop().map(|f| f.reads),
            _ => None,
        }
    }

    /// Record a read against the running evaluation, if any.
    pub fn record(&mut self, node: NodeId) {
        if let Some(top) = self.frames.last_mut() {
            if !top.reads.contains(&node) {
                top.reads.push(node);
            }
        }
    }

    /// Kind of the node currently evaluating.
    pub fn current_kind(&self) -> Option<NodeKind> {
        self.frames.last().map(|f| f.kind)
    }

    pub fn current(&self) -> Option<NodeId> {
        self.frames.last().map(|f| f.node)
    }

    /// Evaluation path from the frame of `reentered` up to the top, closed
    /// with `reentered` itself.
    pub fn cycle_path(&self, reentered: NodeId, graph: &InvalidationEngine) -> Vec<String> {
        let start = self
            .frames
            .iter()
            .position(|f| f.node == reentered)
            .unwrap_or(0);
        self.frames[start..]
            .iter()
            .map(|f| graph.name(f.node).to_string())
            .chain(std::iter::once(graph.name(reentered).to_string()))
            .collect()
    }
}

/// Guard that pops an evaluation frame.
///
/// [`ContextGuard::finish`] is the normal exit. If the guard is dropped
/// without finishing (the evaluation unwound), the frame is still popped and
/// the node leaves the `Computing` state so it can be evaluated again.
pub(crate) struct ContextGuard<'a> {
    inner: &'a Inner,
    node: NodeId,
    kind: NodeKind,
    finished: bool,
}

impl<'a> ContextGuard<'a> {
    /// Push a frame for `node` and mark it computing.
    pub fn enter(inner: &'a Inner, node: NodeId, kind: NodeKind) -> Self {
        {
            let mut state = inner.state.lock();
            state.engine.set_state(node, NodeState::Computing);
            state.context.push(node, kind);
        }
        Self {
            inner,
            node,
            kind,
            finished: false,
        }
    }

    /// Pop the frame and return the reads recorded while it was on top.
    pub fn finish(mut self) -> Reads {
        self.finished = true;
        self.inner
            .state
            .lock()
            .context
            .pop(self.node)
            .unwrap_or_default()
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.inner.state.lock();
        state.context.pop(self.node);
        if state.engine.state(self.node) == NodeState::Computing {
            let reset = match self.kind {
                NodeKind::Derivation => NodeState::Dirty,
                _ => NodeState::Clean,
            };
            state.engine.set_state(self.node, reset);
        }
    }
}
