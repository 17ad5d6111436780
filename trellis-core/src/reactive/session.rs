//! Session
//!
//! The session is the coordinator that connects signals, derivations and
//! effects. It owns one instance of each component plus the dependency
//! graph, and schedules updates when signals change.
//!
//! # How It Works
//!
//! 1. Signals, derivations and effects are registered by name.
//!
//! 2. When a derivation or effect evaluates, a frame is pushed on the
//!    session's context stack and every read is recorded into it. Each read
//!    also adds its graph edge right away, so a write later in the same run
//!    reaches the reader. When the evaluation completes the recorded reads
//!    replace the node's edges.
//!
//! 3. When a signal is written, the session:
//!    a. Stores the value (skipped if unchanged under change detection)
//!    b. Marks every reachable derivation dirty
//!    c. Queues affected effects
//!    d. Runs queued effects in registration order; derivations recompute
//!       lazily when those effects read them
//!
//! # Concurrency
//!
//! One session handles one operation at a time. Every public operation
//! takes a reentrant turn lock, so callbacks can call back into the session
//! on the same thread while other threads wait. Component state sits behind
//! a separate mutex that is never held while user code runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::data::DataSource;
use crate::error::{as_reactive, BoxError, ReactiveError, Result};
use crate::graph::{InvalidationEngine, NodeId, NodeKind, NodeState};
use crate::input::{InputEvent, InputMap, InputWrite};
use crate::value::Value;

use super::context::{ContextGuard, ContextStack};
use super::effect::{self, EffectKind, EffectRunner};
use super::memo::DerivationCache;
use super::scope::Scope;
use super::signal::SignalStore;

/// Callback receiving every caught effect failure and cascade abort.
pub type FailureObserver = dyn Fn(&ReactiveError) + Send + Sync;

/// Pass as the dependency list of [`Session::on_change`] to rely on read
/// tracking alone.
pub const NO_DEPS: [&str; 0] = [];

/// Counter for generating unique session IDs.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_session_id() -> u64 {
    SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub(crate) struct State {
    pub(crate) signals: SignalStore,
    pub(crate) derivations: DerivationCache,
    pub(crate) effects: EffectRunner,
    pub(crate) engine: InvalidationEngine,
    pub(crate) context: ContextStack,
    flushing: bool,
}

pub(crate) struct Inner {
    id: u64,
    config: SessionConfig,
    inputs: InputMap,
    data: Option<Arc<dyn DataSource>>,
    observer: Option<Arc<FailureObserver>>,
    turn: ReentrantMutex<()>,
    pub(crate) state: Mutex<State>,
}

/// What a write (or batch of writes) caused.
#[derive(Debug, Default)]
pub struct FlushReport {
    ran: Vec<String>,
    failures: Vec<ReactiveError>,
}

impl FlushReport {
    /// Effects that ran, in order. Includes failed runs.
    pub fn ran(&self) -> &[String] {
        &self.ran
    }

    /// How many times `effect` ran during this flush.
    pub fn runs_of(&self, effect: &str) -> usize {
        self.ran.iter().filter(|name| *name == effect).count()
    }

    pub fn failures(&self) -> &[ReactiveError] {
        &self.failures
    }

    /// True when no effect failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes collected by [`Session::batch`].
#[derive(Debug, Default)]
pub struct Batch {
    writes: Vec<(String, Value)>,
}

impl Batch {
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.writes.push((name.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Configures a [`Session`] before any node exists.
#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    data: Option<Arc<dyn DataSource>>,
    observer: Option<Arc<FailureObserver>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn data(mut self, data: Arc<dyn DataSource>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn on_failure<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ReactiveError) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Build the session and declare one signal per widget binding.
    pub fn build(self) -> Result<Session> {
        self.config.validate()?;
        let inputs = InputMap::from_bindings(&self.config.widgets)?;

        let session = Session::from_parts(self.config, inputs, self.data, self.observer);
        for binding in session.inner.inputs.bindings() {
            session.declare_signal(binding.signal_name(), binding.initial_value())?;
        }
        Ok(session)
    }
}

/// Handle to one reactive session.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session with default configuration and no data source.
    pub fn new() -> Self {
        Self::from_parts(SessionConfig::default(), InputMap::default(), None, None)
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// A session with one signal per configured widget.
    pub fn from_config(config: SessionConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    fn from_parts(
        config: SessionConfig,
        inputs: InputMap,
        data: Option<Arc<dyn DataSource>>,
        observer: Option<Arc<FailureObserver>>,
    ) -> Self {
        let id = next_session_id();
        debug!(session = id, "session created");
        Self {
            inner: Arc::new(Inner {
                id,
                config,
                inputs,
                data,
                observer,
                turn: ReentrantMutex::new(()),
                state: Mutex::new(State {
                    signals: SignalStore::default(),
                    derivations: DerivationCache::default(),
                    effects: EffectRunner::default(),
                    engine: InvalidationEngine::new(),
                    context: ContextStack::default(),
                    flushing: false,
                }),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn data(&self) -> Option<Arc<dyn DataSource>> {
        self.inner.data.clone()
    }

    pub(crate) fn data_ref(&self) -> Option<&dyn DataSource> {
        self.inner.data.as_deref()
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    /// Declare a signal with its initial value.
    pub fn declare_signal(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let _turn = self.inner.turn.lock();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        ensure_free(state, name)?;
        let node = state.engine.add_node(name, NodeKind::Signal);
        state.signals.declare(name, node, value.into());

        trace!(session = self.inner.id, signal = name, "signal declared");
        Ok(())
    }

    /// Write a signal, declaring it first if it does not exist yet.
    pub fn set_or_declare(&self, name: &str, value: impl Into<Value>) -> Result<FlushReport> {
        let _turn = self.inner.turn.lock();
        let exists = {
            let state = self.inner.state.lock();
            check_writable(&state, name)?;
            state.engine.contains(name)
        };
        if exists {
            self.set(name, value)
        } else {
            self.declare_signal(name, value)?;
            Ok(FlushReport::default())
        }
    }

    /// Write a signal and run the effects it affects.
    ///
    /// Called from inside an effect, the write only invalidates; the
    /// affected effects run in the next round of the ongoing flush and the
    /// returned report is empty.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<FlushReport> {
        self.set_many([(name, value.into())])
    }

    /// Apply several writes as one batch.
    ///
    /// Every name is checked before anything is written. Later writes to the
    /// same signal win. Each affected effect runs once, after all writes.
    pub fn set_many<I, S, V>(&self, writes: I) -> Result<FlushReport>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<Value>,
    {
        let _turn = self.inner.turn.lock();

        let mut coalesced: IndexMap<String, Value> = IndexMap::new();
        for (name, value) in writes {
            coalesced.insert(name.as_ref().to_string(), value.into());
        }

        {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            if let Some(first) = coalesced.keys().next() {
                check_writable(state, first)?;
            }
            for name in coalesced.keys() {
                state.signals.node(name)?;
            }

            let detection = self.inner.config.change_detection;
            for (name, value) in coalesced {
                let Some(node) = state.signals.write(&name, value, detection)? else {
                    trace!(session = self.inner.id, signal = %name, "unchanged write ignored");
                    continue;
                };

                let invalidation = state.engine.invalidate(node);
                for dirtied in &invalidation.dirtied {
                    state.derivations.note_invalidated(state.engine.name(*dirtied));
                }
                debug!(
                    session = self.inner.id,
                    signal = %name,
                    dirtied = invalidation.dirtied.len(),
                    scheduled = invalidation.scheduled.len(),
                    "signal written"
                );
            }
        }

        self.flush()
    }

    /// Collect writes in a closure and apply them as one batch.
    pub fn batch<F>(&self, build: F) -> Result<FlushReport>
    where
        F: FnOnce(&mut Batch),
    {
        let mut batch = Batch::default();
        build(&mut batch);
        self.set_many(batch.writes)
    }

    /// Increment a counter signal, as an action button does.
    ///
    /// Non-numeric values count as zero.
    pub fn trigger(&self, name: &str) -> Result<FlushReport> {
        let _turn = self.inner.turn.lock();
        let next = {
            let state = self.inner.state.lock();
            state.signals.value(name)?.as_f64().unwrap_or(0.0) + 1.0
        };
        self.set(name, next)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read a signal or derivation.
    ///
    /// Inside a derivation or effect the read becomes a dependency of the
    /// node being evaluated. Dirty derivations recompute before returning.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.read(name, true)
    }

    /// Read without recording a dependency.
    pub fn get_untracked(&self, name: &str) -> Result<Value> {
        self.read(name, false)
    }

    fn read(&self, name: &str, track: bool) -> Result<Value> {
        let _turn = self.inner.turn.lock();

        let (node, kind) = self
            .inner
            .state
            .lock()
            .engine
            .lookup(name)
            .ok_or_else(|| ReactiveError::UnknownSignal(name.to_string()))?;

        match kind {
            NodeKind::Signal => {
                let mut guard = self.inner.state.lock();
                let state = &mut *guard;
                if track {
                    record_read(state, node);
                }
                state.signals.value(name).cloned()
            }
            NodeKind::Derivation => self.read_derivation(name, node, track),
            NodeKind::Effect => Err(ReactiveError::UnknownSignal(name.to_string())),
        }
    }

    fn read_derivation(&self, name: &str, node: NodeId, track: bool) -> Result<Value> {
        let compute = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            match state.engine.state(node) {
                NodeState::Computing => {
                    let path = state.context.cycle_path(node, &state.engine);
                    warn!(session = self.inner.id, path = ?path, "cyclic dependency");
                    return Err(ReactiveError::CyclicDependency { path });
                }
                NodeState::Clean => {
                    if track {
                        record_read(state, node);
                    }
                    if let Some(value) = state.derivations.cached(name) {
                        return Ok(value.clone());
                    }
                }
                NodeState::Dirty => {
                    if track {
                        record_read(state, node);
                    }
                }
            }

            state
                .derivations
                .compute_fn(name)
                .ok_or_else(|| ReactiveError::UnknownSignal(name.to_string()))?
        };

        let frame = ContextGuard::enter(&self.inner, node, NodeKind::Derivation);
        trace!(session = self.inner.id, derivation = name, "recomputing");
        let result = compute(&Scope::new(self, name));
        let reads = frame.finish();

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.engine.set_dependencies(node, reads);
        match result {
            Ok(value) => {
                state.derivations.store(name, value.clone());
                state.engine.set_state(node, NodeState::Clean);
                Ok(value)
            }
            Err(err) => {
                state.engine.set_state(node, NodeState::Dirty);
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Derivations
    // ------------------------------------------------------------------

    /// Register a lazy derivation. Nothing is computed until first read.
    pub fn define<F>(&self, name: &str, compute: F) -> Result<()>
    where
        F: Fn(&Scope<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        let _turn = self.inner.turn.lock();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        ensure_free(state, name)?;
        let node = state.engine.add_node(name, NodeKind::Derivation);
        state.derivations.define(name, node, Arc::new(compute));

        trace!(session = self.inner.id, derivation = name, "derivation defined");
        Ok(())
    }

    /// Evaluate every derivation once, surfacing the first error.
    ///
    /// Meant for setup code: cycles and missing inputs show up here instead
    /// of at the first user event.
    pub fn validate(&self) -> Result<()> {
        let _turn = self.inner.turn.lock();
        let names: Vec<String> = self
            .inner
            .state
            .lock()
            .derivations
            .names()
            .map(str::to_string)
            .collect();

        for name in names {
            self.get_untracked(&name)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Register a continuous effect and run it once.
    ///
    /// `dependencies` names signals or derivations that always re-run the
    /// effect, in addition to whatever the callback reads. If the first run
    /// hits a dependency cycle the effect is removed and the cycle returned.
    /// Other failures of the first run are reported like any effect failure.
    pub fn on_change<I, S, F>(&self, name: &str, dependencies: I, callback: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&Scope<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let _turn = self.inner.turn.lock();

        let node = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            ensure_free(state, name)?;
            let declared = resolve_readable(state, dependencies)?;
            let node = state.engine.add_node(name, NodeKind::Effect);
            state.engine.set_dependencies(node, declared.iter().copied());
            state
                .effects
                .register(name, node, EffectKind::Continuous, declared, Arc::new(callback));
            node
        };
        debug!(session = self.inner.id, effect = name, "continuous effect registered");

        let flush = self.begin_flush();
        let mut report = FlushReport::default();
        if let Err(cause) = self.run_effect(node, &mut report) {
            if let Some(ReactiveError::CyclicDependency { path }) = as_reactive(&cause) {
                let err = ReactiveError::CyclicDependency { path: path.clone() };
                drop(flush);
                self.dispose(name);
                return Err(err);
            }
        }

        if let Some(flush) = flush {
            self.drain(flush)?;
        }
        Ok(())
    }

    /// Register an event-gated effect.
    ///
    /// The effect does not run now. It runs after each write to one of
    /// `triggers`, which must be declared signals.
    pub fn on_event<I, S, F>(&self, name: &str, triggers: I, callback: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&Scope<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let _turn = self.inner.turn.lock();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        ensure_free(state, name)?;
        let triggers = triggers
            .into_iter()
            .map(|t| state.signals.node(t.as_ref()))
            .collect::<Result<SmallVec<[NodeId; 2]>>>()?;
        if triggers.is_empty() {
            return Err(ReactiveError::Config(format!(
                "event-gated effect `{name}` needs at least one trigger"
            )));
        }

        let node = state.engine.add_node(name, NodeKind::Effect);
        state.engine.set_triggers(node, triggers);
        state.effects.register(
            name,
            node,
            EffectKind::EventGated,
            SmallVec::new(),
            Arc::new(callback),
        );

        debug!(session = self.inner.id, effect = name, "event-gated effect registered");
        Ok(())
    }

    /// Remove an effect. Returns false if no effect has this name.
    pub fn dispose(&self, name: &str) -> bool {
        let _turn = self.inner.turn.lock();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        match state.effects.remove(name) {
            Some(node) => {
                state.engine.remove_node(node);
                debug!(session = self.inner.id, effect = name, "effect disposed");
                true
            }
            None => false,
        }
    }

    fn run_effect(&self, node: NodeId, report: &mut FlushReport) -> std::result::Result<(), BoxError> {
        let task = {
            let state = self.inner.state.lock();
            let graph_node = state.engine.node(node);
            if graph_node.is_disposed() {
                return Ok(());
            }
            state.effects.task(graph_node.name())
        };
        let Some(task) = task else {
            return Ok(());
        };

        let frame = ContextGuard::enter(&self.inner, node, NodeKind::Effect);
        trace!(session = self.inner.id, effect = %task.name, "running effect");
        let outcome = effect::invoke(
            task.callback.as_ref(),
            &Scope::new(self, &task.name),
        );
        let reads = frame.finish();

        {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if !state.engine.node(node).is_disposed() {
                let deps = reads.iter().chain(task.declared.iter()).copied();
                state.engine.set_dependencies(node, deps);
                state.engine.set_state(node, NodeState::Clean);
            }
            state.effects.record_run(&task.name, outcome.is_err());
        }

        report.ran.push(task.name.clone());
        if let Err(cause) = &outcome {
            let err = effect::failure(&task.name, cause);
            warn!(session = self.inner.id, effect = %task.name, error = %cause, "effect failed");
            self.notify(&err);
            report.failures.push(err);
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Flushing
    // ------------------------------------------------------------------

    /// Mark the session as flushing. `None` if a flush is already running.
    fn begin_flush(&self) -> Option<FlushGuard<'_>> {
        let mut state = self.inner.state.lock();
        if state.flushing {
            return None;
        }
        state.flushing = true;
        Some(FlushGuard { inner: &self.inner })
    }

    fn flush(&self) -> Result<FlushReport> {
        match self.begin_flush() {
            Some(guard) => self.drain(guard),
            None => Ok(FlushReport::default()),
        }
    }

    /// Run queued effects round by round until none are left.
    fn drain(&self, _flushing: FlushGuard<'_>) -> Result<FlushReport> {
        let limit = self.inner.config.max_cascade_rounds;
        let mut report = FlushReport::default();
        let mut rounds = 0;

        loop {
            let queued = self.inner.state.lock().engine.take_pending();
            if queued.is_empty() {
                break;
            }
            if rounds == limit {
                self.inner.state.lock().engine.clear_pending();
                let err = ReactiveError::CascadeLimit { rounds: limit };
                warn!(session = self.inner.id, rounds = limit, "effect cascade aborted");
                self.notify(&err);
                return Err(err);
            }
            rounds += 1;

            for node in queued {
                // Failures are already recorded in the report
                let _ = self.run_effect(node, &mut report);
            }
        }

        if !report.ran.is_empty() {
            debug!(
                session = self.inner.id,
                rounds,
                effects = report.ran.len(),
                failures = report.failures.len(),
                "flush complete"
            );
        }
        Ok(report)
    }

    fn notify(&self, err: &ReactiveError) {
        if let Some(observer) = &self.inner.observer {
            observer(err);
        }
    }

    // ------------------------------------------------------------------
    // Input boundary
    // ------------------------------------------------------------------

    /// Apply one widget event.
    pub fn dispatch(&self, event: InputEvent) -> Result<FlushReport> {
        self.dispatch_all([event])
    }

    /// Apply the events of one user action as a single batch.
    ///
    /// All events are validated before any signal is written.
    pub fn dispatch_all<I>(&self, events: I) -> Result<FlushReport>
    where
        I: IntoIterator<Item = InputEvent>,
    {
        let _turn = self.inner.turn.lock();
        let mut writes: Vec<(String, Value)> = Vec::new();

        for event in events {
            match self.inner.inputs.resolve(&event)? {
                InputWrite::Set { signal, value } => writes.push((signal, value)),
                InputWrite::Trigger { signal } => {
                    let current = match writes.iter().rev().find(|(s, _)| *s == signal) {
                        Some((_, value)) => value.as_f64().unwrap_or(0.0),
                        None => self
                            .inner
                            .state
                            .lock()
                            .signals
                            .value(&signal)?
                            .as_f64()
                            .unwrap_or(0.0),
                    };
                    writes.push((signal, Value::Number(current + 1.0)));
                }
            }
        }

        self.set_many(writes)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// All signal values as a JSON object, in declaration order.
    pub fn snapshot(&self) -> serde_json::Value {
        let _turn = self.inner.turn.lock();
        serde_json::Value::Object(self.inner.state.lock().signals.snapshot())
    }

    pub fn contains(&self, name: &str) -> bool {
        let _turn = self.inner.turn.lock();
        self.inner.state.lock().engine.contains(name)
    }

    /// How many times a signal has been overwritten.
    pub fn version(&self, name: &str) -> Option<u64> {
        let _turn = self.inner.turn.lock();
        self.inner.state.lock().signals.version(name)
    }

    /// How many times a derivation's function has completed.
    pub fn recomputations(&self, name: &str) -> Option<u64> {
        let _turn = self.inner.turn.lock();
        self.inner.state.lock().derivations.recomputations(name)
    }

    /// How many times a derivation went from clean to dirty.
    pub fn invalidations(&self, name: &str) -> Option<u64> {
        let _turn = self.inner.turn.lock();
        self.inner.state.lock().derivations.invalidations(name)
    }

    /// Whether a derivation will recompute on its next read.
    pub fn is_dirty(&self, name: &str) -> Option<bool> {
        let _turn = self.inner.turn.lock();
        let state = self.inner.state.lock();
        let node = state.derivations.node(name)?;
        Some(!state.engine.node(node).is_clean())
    }

    /// How many times an effect has run, failed runs included.
    pub fn runs(&self, name: &str) -> Option<u64> {
        let _turn = self.inner.turn.lock();
        self.inner.state.lock().effects.runs(name)
    }

    pub fn failures(&self, name: &str) -> Option<u64> {
        let _turn = self.inner.turn.lock();
        self.inner.state.lock().effects.failures(name)
    }

    /// Names a derivation or effect read during its last evaluation.
    pub fn dependencies(&self, name: &str) -> Result<Vec<String>> {
        let _turn = self.inner.turn.lock();
        let state = self.inner.state.lock();
        let (node, _) = state
            .engine
            .lookup(name)
            .ok_or_else(|| ReactiveError::UnknownSignal(name.to_string()))?;
        Ok(state.engine.dependency_names(node))
    }

    /// Names of the derivations and effects currently reading `name`.
    pub fn dependents(&self, name: &str) -> Result<Vec<String>> {
        let _turn = self.inner.turn.lock();
        let state = self.inner.state.lock();
        let (node, _) = state
            .engine
            .lookup(name)
            .ok_or_else(|| ReactiveError::UnknownSignal(name.to_string()))?;
        Ok(state.engine.dependent_names(node))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let _turn = self.inner.turn.lock();
        let state = self.inner.state.lock();
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("signals", &state.signals.len())
            .field("derivations", &state.derivations.len())
            .field("effects", &state.effects.len())
            .field("nodes", &state.engine.node_count())
            .finish()
    }
}

/// Clears the flushing flag, also when an effect round unwinds.
struct FlushGuard<'a> {
    inner: &'a Inner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.inner.state.lock().flushing = false;
    }
}

fn ensure_free(state: &State, name: &str) -> Result<()> {
    if state.engine.contains(name) {
        return Err(ReactiveError::DuplicateName(name.to_string()));
    }
    Ok(())
}

/// Record a tracked read against the running evaluation.
///
/// The edge goes into the graph right away so a write later in the same run
/// reaches the reader.
fn record_read(state: &mut State, node: NodeId) {
    if let Some(reader) = state.context.current() {
        state.context.record(node);
        state.engine.add_dependency(reader, node);
    }
}

/// Derivations are pure; writes from inside one are rejected.
fn check_writable(state: &State, signal: &str) -> Result<()> {
    if state.context.current_kind() == Some(NodeKind::Derivation) {
        let derivation = state
            .context
            .current()
            .map(|node| state.engine.name(node).to_string())
            .unwrap_or_default();
        return Err(ReactiveError::WriteInDerivation {
            derivation,
            signal: signal.to_string(),
        });
    }
    Ok(())
}

/// Resolve declared effect dependencies to signal or derivation nodes.
fn resolve_readable<I, S>(state: &State, names: I) -> Result<SmallVec<[NodeId; 4]>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            match state.engine.lookup(name) {
                Some((node, NodeKind::Signal | NodeKind::Derivation)) => Ok(node),
                _ => Err(ReactiveError::UnknownSignal(name.to_string())),
            }
        })
        .collect()
}
