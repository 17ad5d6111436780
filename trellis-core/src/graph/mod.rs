//! Dependency Graph
//!
//! This module implements the per-session dependency graph that tracks
//! relationships between signals, derivations and effects.
//!
//! # Overview
//!
//! The graph is directed, with edges meaning "reads from":
//!
//! - Nodes are signals (sources), derivations (cached computations) or
//!   effects (side-effecting leaves)
//! - If A reads B, A is a dependent of B and B is a dependency of A
//! - Event-gated effects additionally carry trigger edges, which schedule
//!   them without being ordinary read dependencies
//!
//! When a signal changes, the invalidation engine walks the dependents to
//! mark derivations dirty and queue affected effects.
//!
//! # Design Decisions
//!
//! 1. Each session owns its own arena, so node ids are dense indices and no
//!    state is shared between sessions.
//!
//! 2. We maintain both forward (dependencies) and reverse (dependents) edges
//!    to enable efficient traversal in both directions.
//!
//! 3. Derivation cycles are never stored: a read of a node that is still
//!    computing fails before the edge is recorded.

mod node;
mod invalidation;

pub use node::{Node, NodeId, NodeKind, NodeState};
pub use invalidation::{Invalidation, InvalidationEngine};
