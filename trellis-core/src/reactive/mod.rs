//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, derivations,
//! and effects, coordinated by a [`Session`].
//!
//! # Concepts
//!
//! ## Signals
//!
//! A signal is a named container for input state, usually bound to a
//! widget. When a signal is read inside a derivation or effect, that reader
//! is registered as a dependent. When the value changes, all dependents are
//! invalidated.
//!
//! ## Derivations
//!
//! A derivation is a named value computed from signals and other
//! derivations. It is lazy: it computes on first read, caches the result,
//! and recomputes only when read again after one of its inputs changed.
//! Derivations must not write signals.
//!
//! ## Effects
//!
//! An effect is a side-effecting computation that renders outputs.
//! Continuous effects re-run whenever anything they read changes.
//! Event-gated effects re-run only when one of their trigger signals is
//! written; everything else they read is consulted, not watched.
//!
//! # Implementation Notes
//!
//! Dependency tracking uses an explicit context stack owned by the session
//! rather than thread-local state. Reads go through the [`Scope`] handed to
//! each callback, which records them in the frame on top of the stack.

mod signal;
mod context;
mod memo;
mod effect;
mod scope;
mod session;

pub use memo::DeriveFn;
pub use effect::EffectFn;
pub use scope::Scope;
pub use session::{Batch, FailureObserver, FlushReport, Session, SessionBuilder, NO_DEPS};
