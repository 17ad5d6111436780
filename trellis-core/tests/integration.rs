//! Integration Tests for Reactive System
//!
//! These tests verify that signals, derivations, and effects work together
//! inside a session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{
    ChangeDetection, ReactiveError, Session, SessionConfig, Value, NO_DEPS,
};

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (count.clone(), count)
}

/// Reading a clean derivation twice computes it once.
#[test]
fn derivation_is_memoized() {
    let session = Session::new();
    session.declare_signal("a", 2).unwrap();
    session.declare_signal("unrelated", 0).unwrap();

    let (computed, compute_count) = counter();
    session
        .define("square", move |cx| {
            compute_count.fetch_add(1, Ordering::SeqCst);
            let a = cx.get_f64("a")?;
            Ok(Value::from(a * a))
        })
        .unwrap();

    // Lazy: nothing runs until the first read
    assert_eq!(computed.load(Ordering::SeqCst), 0);

    assert_eq!(session.get("square").unwrap(), Value::from(4));
    assert_eq!(session.get("square").unwrap(), Value::from(4));
    assert_eq!(computed.load(Ordering::SeqCst), 1);

    // Changes to signals it never read leave it clean
    session.set("unrelated", 1).unwrap();
    assert_eq!(session.is_dirty("square"), Some(false));
    session.get("square").unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 1);

    session.set("a", 3).unwrap();
    assert_eq!(session.get("square").unwrap(), Value::from(9));
    assert_eq!(computed.load(Ordering::SeqCst), 2);
    assert_eq!(session.recomputations("square"), Some(2));
    assert_eq!(session.invalidations("square"), Some(1));
}

/// Writing the value a signal already holds changes nothing.
#[test]
fn unchanged_write_is_noop() {
    let session = Session::new();
    session.declare_signal("x", "sepal_length").unwrap();

    let (runs, run_count) = counter();
    session
        .on_change("watch", NO_DEPS, move |cx| {
            cx.get("x")?;
            run_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let report = session.set("x", "sepal_length").unwrap();
    assert!(report.ran().is_empty());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(session.version("x"), Some(0));
}

/// With `ChangeDetection::Always` every write propagates.
#[test]
fn always_detection_propagates_equal_writes() {
    let config = SessionConfig::default().with_change_detection(ChangeDetection::Always);
    let session = Session::from_config(config).unwrap();
    session.declare_signal("x", 1).unwrap();

    let (runs, run_count) = counter();
    session
        .on_change("watch", NO_DEPS, move |cx| {
            cx.get("x")?;
            run_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    session.set("x", 1).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// A batch runs each affected effect once, with the final values.
#[test]
fn batch_runs_effects_once() {
    let session = Session::new();
    session.declare_signal("a", 0).unwrap();
    session.declare_signal("b", 0).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    session
        .on_change("sum", NO_DEPS, move |cx| {
            let total = cx.get_f64("a")? + cx.get_f64("b")?;
            seen_clone.lock().push(total);
            Ok(())
        })
        .unwrap();

    let report = session
        .batch(|batch| {
            batch.set("a", 1).set("b", 2);
        })
        .unwrap();

    assert_eq!(report.runs_of("sum"), 1);
    assert_eq!(*seen.lock(), vec![0.0, 3.0]);
}

/// Later writes in a batch win; writing back the original value is a no-op.
#[test]
fn batch_coalesces_writes_to_same_signal() {
    let session = Session::new();
    session.declare_signal("x", "a").unwrap();

    let (runs, run_count) = counter();
    session
        .on_change("watch", NO_DEPS, move |cx| {
            cx.get("x")?;
            run_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    session.set_many([("x", "b"), ("x", "a")]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

/// A batch with an unknown name writes nothing.
#[test]
fn batch_with_unknown_signal_writes_nothing() {
    let session = Session::new();
    session.declare_signal("a", 0).unwrap();

    let err = session
        .set_many([("a", Value::from(1)), ("ghost", Value::from(2))])
        .unwrap_err();
    assert!(matches!(err, ReactiveError::UnknownSignal(name) if name == "ghost"));
    assert_eq!(session.get("a").unwrap(), Value::from(0));
}

/// Event-gated effects ignore their reads and fire on triggers only.
#[test]
fn event_gated_effect_waits_for_trigger() {
    let session = Session::new();
    session.declare_signal("x", "sepal_length").unwrap();
    session.declare_signal("go", 0).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    session
        .on_event("report", ["go"], move |cx| {
            seen_clone.lock().push(cx.get_str("x")?);
            Ok(())
        })
        .unwrap();

    // Not run at registration
    assert_eq!(session.runs("report"), Some(0));

    session.trigger("go").unwrap();
    session.set("x", "petal_length").unwrap();
    session.set("x", "petal_width").unwrap();
    assert_eq!(*seen.lock(), vec!["sepal_length"]);

    let report = session.trigger("go").unwrap();
    assert_eq!(report.ran(), ["report"]);
    assert_eq!(*seen.lock(), vec!["sepal_length", "petal_width"]);
}

#[test]
fn event_gated_effect_needs_declared_triggers() {
    let session = Session::new();
    session.define("dat", |_| Ok(Value::Null)).unwrap();

    assert!(matches!(
        session.on_event("e", ["missing"], |_| Ok(())),
        Err(ReactiveError::UnknownSignal(_))
    ));
    // Derivations cannot trigger
    assert!(matches!(
        session.on_event("e", ["dat"], |_| Ok(())),
        Err(ReactiveError::UnknownSignal(_))
    ));
    assert!(matches!(
        session.on_event("e", NO_DEPS, |_| Ok(())),
        Err(ReactiveError::Config(_))
    ));
}

/// Two derivations reading each other fail instead of looping.
#[test]
fn cyclic_derivations_are_detected() {
    let session = Session::new();
    session.define("a", |cx| cx.get("b")).unwrap();
    session.define("b", |cx| cx.get("a")).unwrap();

    match session.get("a") {
        Err(ReactiveError::CyclicDependency { path }) => {
            assert_eq!(path, vec!["a", "b", "a"]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }

    // No result was cached
    assert_eq!(session.recomputations("a"), Some(0));
    assert_eq!(session.recomputations("b"), Some(0));
    assert_eq!(session.is_dirty("a"), Some(true));

    assert!(session.validate().unwrap_err().is_cycle());
}

#[test]
fn self_referencing_derivation_is_a_cycle() {
    let session = Session::new();
    session.define("loop", |cx| cx.get("loop")).unwrap();

    match session.get("loop") {
        Err(ReactiveError::CyclicDependency { path }) => assert_eq!(path, vec!["loop", "loop"]),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

/// An effect whose first run hits a cycle is not registered.
#[test]
fn effect_over_cycle_is_rejected() {
    let session = Session::new();
    session.define("a", |cx| cx.get("b")).unwrap();
    session.define("b", |cx| cx.get("a")).unwrap();

    let err = session
        .on_change("show", NO_DEPS, |cx| {
            cx.get("a")?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, ReactiveError::CyclicDependency { .. }));
    assert!(!session.contains("show"));
}

/// Dependencies are re-discovered on every evaluation.
#[test]
fn dependencies_follow_branches() {
    let session = Session::new();
    session.declare_signal("use_a", true).unwrap();
    session.declare_signal("a", 1).unwrap();
    session.declare_signal("b", 2).unwrap();
    session
        .define("pick", |cx| {
            if cx.get("use_a")?.as_bool()? {
                cx.get("a")
            } else {
                cx.get("b")
            }
        })
        .unwrap();

    assert_eq!(session.get("pick").unwrap(), Value::from(1));
    assert_eq!(session.dependencies("pick").unwrap(), vec!["use_a", "a"]);

    session.set("use_a", false).unwrap();
    assert_eq!(session.get("pick").unwrap(), Value::from(2));
    assert_eq!(session.dependencies("pick").unwrap(), vec!["use_a", "b"]);
    assert!(session.dependents("a").unwrap().is_empty());

    // The dropped branch no longer invalidates
    session.set("a", 10).unwrap();
    assert_eq!(session.is_dirty("pick"), Some(false));
}

/// A diamond recomputes its tip once and runs its effect once.
#[test]
fn diamond_dependencies_settle_once() {
    let session = Session::new();
    session.declare_signal("x", 1).unwrap();
    session
        .define("left", |cx| Ok(Value::from(cx.get_f64("x")? + 1.0)))
        .unwrap();
    session
        .define("right", |cx| Ok(Value::from(cx.get_f64("x")? * 2.0)))
        .unwrap();
    session
        .define("tip", |cx| {
            Ok(Value::from(cx.get_f64("left")? + cx.get_f64("right")?))
        })
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    session
        .on_change("show", NO_DEPS, move |cx| {
            seen_clone.lock().push(cx.get_f64("tip")?);
            Ok(())
        })
        .unwrap();

    let report = session.set("x", 5).unwrap();
    assert_eq!(report.runs_of("show"), 1);
    assert_eq!(*seen.lock(), vec![4.0, 16.0]);
    assert_eq!(session.recomputations("tip"), Some(2));
    assert_eq!(session.recomputations("left"), Some(2));
}

/// Effects run in registration order, not name order.
#[test]
fn effects_run_in_registration_order() {
    let session = Session::new();
    session.declare_signal("x", 0).unwrap();

    for name in ["zeta", "alpha", "mid"] {
        session
            .on_change(name, NO_DEPS, |cx| {
                cx.get("x")?;
                Ok(())
            })
            .unwrap();
    }

    let report = session.set("x", 1).unwrap();
    assert_eq!(report.ran(), ["zeta", "alpha", "mid"]);
}

/// A failing or panicking effect does not stop the others.
#[test]
fn effect_failures_are_isolated() {
    let session = Session::new();
    session.declare_signal("x", 0).unwrap();

    session
        .on_change("broken", NO_DEPS, |cx| {
            if cx.get_f64("x")? > 0.0 {
                return Err("output missing".into());
            }
            Ok(())
        })
        .unwrap();
    session
        .on_change("panics", NO_DEPS, |cx| {
            if cx.get_f64("x")? > 0.0 {
                panic!("boom");
            }
            Ok(())
        })
        .unwrap();

    let (runs, run_count) = counter();
    session
        .on_change("healthy", NO_DEPS, move |cx| {
            cx.get("x")?;
            run_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let report = session.set("x", 1).unwrap();
    assert_eq!(report.ran(), ["broken", "panics", "healthy"]);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let failures = report.failures();
    assert_eq!(failures.len(), 2);
    assert!(matches!(
        &failures[1],
        ReactiveError::EffectFailure { name, cause } if name == "panics" && cause.contains("boom")
    ));

    // A failed effect keeps its dependencies and runs again
    let report = session.set("x", 0).unwrap();
    assert!(report.is_clean());
    assert_eq!(session.failures("broken"), Some(1));
    assert_eq!(session.runs("broken"), Some(3));
}

/// A failing derivation stays dirty and is retried on the next read.
#[test]
fn derivation_errors_reach_the_effect() {
    let session = Session::new();
    session.declare_signal("a", 6).unwrap();
    session.declare_signal("b", 3).unwrap();
    session
        .define("ratio", |cx| {
            let b = cx.get_f64("b")?;
            if b == 0.0 {
                return Err(ReactiveError::Config("division by zero".into()));
            }
            Ok(Value::from(cx.get_f64("a")? / b))
        })
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    session
        .on_change("show", NO_DEPS, move |cx| {
            seen_clone.lock().push(cx.get_f64("ratio")?);
            Ok(())
        })
        .unwrap();

    let report = session.set("b", 0).unwrap();
    assert_eq!(report.failures().len(), 1);
    assert_eq!(session.is_dirty("ratio"), Some(true));

    session.set("b", 2).unwrap();
    assert_eq!(*seen.lock(), vec![2.0, 3.0]);
}

/// Signals written by effects propagate in the next round of the same flush.
#[test]
fn effect_writes_cascade() {
    let session = Session::new();
    session.declare_signal("a", 1).unwrap();
    session.declare_signal("b", 0).unwrap();

    session
        .on_change("copy", NO_DEPS, |cx| {
            let a = cx.get_f64("a")?;
            cx.set("b", a * 10.0)?;
            Ok(())
        })
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    session
        .on_change("show", NO_DEPS, move |cx| {
            seen_clone.lock().push(cx.get_f64("b")?);
            Ok(())
        })
        .unwrap();

    let report = session.set("a", 2).unwrap();
    assert_eq!(report.ran(), ["copy", "show"]);
    assert_eq!(*seen.lock(), vec![10.0, 20.0]);
}

/// An effect that starts reading a signal mid-run and then writes it re-runs
/// until the value settles.
#[test]
fn effect_reruns_after_writing_what_it_just_read() {
    let session = Session::new();
    session.declare_signal("go", 0).unwrap();
    session.declare_signal("n", 0).unwrap();

    session
        .on_change("clamp", NO_DEPS, |cx| {
            if cx.get_f64("go")? > 0.0 {
                let n = cx.get_f64("n")?;
                if n < 3.0 {
                    cx.set("n", n + 1.0)?;
                }
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(session.dependencies("clamp").unwrap(), vec!["go"]);

    let report = session.set("go", 1).unwrap();

    assert_eq!(session.get("n").unwrap(), Value::from(3));
    // Three bumping runs plus the one that finds n settled
    assert_eq!(report.runs_of("clamp"), 4);
    assert!(report.is_clean());
    assert_eq!(session.runs("clamp"), Some(5));
    assert_eq!(session.dependencies("clamp").unwrap(), vec!["go", "n"]);
}

/// An effect that keeps re-triggering itself is cut off.
#[test]
fn runaway_cascade_is_aborted() {
    let config = SessionConfig {
        max_cascade_rounds: 5,
        ..SessionConfig::default()
    };
    let session = Session::from_config(config).unwrap();
    session.declare_signal("n", 0).unwrap();

    let err = session
        .on_change("bump", NO_DEPS, |cx| {
            let n = cx.get_f64("n")?;
            cx.set("n", n + 1.0)?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, ReactiveError::CascadeLimit { rounds: 5 }));
    // First run plus five rounds
    assert_eq!(session.get("n").unwrap(), Value::from(6));

    // The queue was cleared; unrelated writes work again
    session.declare_signal("other", 0).unwrap();
    assert!(session.set("other", 1).unwrap().ran().is_empty());
}

/// Disposing an effect inside its own run is safe.
#[test]
fn effect_can_dispose_itself() {
    let session = Session::new();
    session.declare_signal("x", 0).unwrap();

    let (runs, run_count) = counter();
    session
        .on_change("once", NO_DEPS, move |cx| {
            if cx.get_f64("x")? > 0.0 {
                cx.session().dispose(cx.name());
            }
            run_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    session.set("x", 1).unwrap();
    session.set("x", 2).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert!(!session.contains("once"));
}

/// Untracked reads do not subscribe.
#[test]
fn untracked_reads_do_not_subscribe() {
    let session = Session::new();
    session.declare_signal("x", 0).unwrap();
    session.declare_signal("label", "n").unwrap();

    let (runs, run_count) = counter();
    session
        .on_change("show", NO_DEPS, move |cx| {
            cx.get("x")?;
            cx.get_untracked("label")?;
            run_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    session.set("label", "m").unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(session.dependencies("show").unwrap(), vec!["x"]);
}

#[test]
fn sessions_can_be_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();

    let session = Session::new();
    session.declare_signal("n", 0).unwrap();
    session
        .define("double", |cx| Ok(Value::from(cx.get_f64("n")? * 2.0)))
        .unwrap();

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let session = session.clone();
            std::thread::spawn(move || {
                session.set("n", i).unwrap();
                session.get("double").unwrap()
            })
        })
        .collect();

    for handle in handles {
        let value = handle.join().unwrap().as_f64().unwrap();
        assert!(value >= 2.0 && value <= 8.0);
    }
    let n = session.get_untracked("n").unwrap().as_f64().unwrap();
    assert_eq!(session.get("double").unwrap(), Value::from(n * 2.0));
}
