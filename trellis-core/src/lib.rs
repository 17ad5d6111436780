//! Trellis Core
//!
//! This crate provides the reactive engine behind Trellis dashboards. It
//! implements:
//!
//! - Reactive primitives (signals, derivations, effects)
//! - Lazy, memoized recomputation with dynamic dependency tracking
//! - Dirty propagation and ordered effect scheduling
//! - Per-session isolation and a multi-session host
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Sessions and the signal/derivation/effect components
//! - `graph`: Dependency graph and invalidation
//! - `input`: Widget bindings and input validation
//! - `render`: Output artifacts and render sinks
//! - `data`: Read-only tabular data access
//! - `host`: One task per session, driven over channels
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{Session, Value, NO_DEPS};
//!
//! let session = Session::new();
//! session.declare_signal("count", 0).unwrap();
//! session
//!     .define("doubled", |cx| Ok(Value::from(cx.get_f64("count")? * 2.0)))
//!     .unwrap();
//!
//! session
//!     .on_change("print", NO_DEPS, |cx| {
//!         println!("doubled = {}", cx.get("doubled")?);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // Prints "doubled = 10"
//! session.set("count", 5).unwrap();
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod host;
pub mod input;
pub mod reactive;
pub mod render;
pub mod value;

pub use config::{ChangeDetection, SessionConfig};
pub use data::{DataSource, Table};
pub use error::{BoxError, ReactiveError, Result};
pub use host::{SessionHandle, SessionHost};
pub use input::{InputEvent, ValueDomain, WidgetBinding};
pub use reactive::{FlushReport, Scope, Session, SessionBuilder, NO_DEPS};
pub use render::{Artifact, RecordingSink, RenderSink, ScatterPlot};
pub use value::Value;
