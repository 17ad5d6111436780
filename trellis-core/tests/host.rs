//! Multi-session host tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trellis_core::{
    InputEvent, ReactiveError, Session, SessionConfig, SessionHost, Value, WidgetBinding, NO_DEPS,
};

fn config() -> SessionConfig {
    SessionConfig::default()
        .with_widget(
            WidgetBinding::choice("xcol", ["sepal_length", "petal_length"]).to_signal("x"),
        )
        .with_widget(WidgetBinding::action("go"))
}

fn counting_host(runs: Arc<AtomicUsize>) -> SessionHost {
    SessionHost::new(config(), move |session: &Session| {
        let runs = runs.clone();
        session.on_change("watch", NO_DEPS, move |cx| {
            cx.get("x")?;
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .unwrap()
}

#[tokio::test]
async fn sessions_are_isolated() {
    let runs = Arc::new(AtomicUsize::new(0));
    let host = counting_host(runs.clone());

    let alice = host.open().unwrap();
    let bob = host.open().unwrap();
    assert_eq!(host.len(), 2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let report = alice
        .dispatch(InputEvent::new("xcol", "petal_length"))
        .await
        .unwrap();
    assert_eq!(report.ran(), ["watch"]);
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    let alice_state = alice.snapshot().await.unwrap();
    let bob_state = bob.snapshot().await.unwrap();
    assert_eq!(alice_state["x"], "petal_length");
    assert_eq!(bob_state["x"], "sepal_length");
}

#[tokio::test]
async fn invalid_events_are_returned_to_caller() {
    let host = counting_host(Arc::new(AtomicUsize::new(0)));
    let handle = host.open().unwrap();

    let err = handle
        .dispatch(InputEvent::new("xcol", "colour"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReactiveError::InvalidInput { .. }));

    // The session keeps working
    let report = handle.dispatch(InputEvent::press("go")).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(handle.snapshot().await.unwrap()["go"], 1.0);
}

#[tokio::test]
async fn closed_sessions_reject_commands() {
    let host = counting_host(Arc::new(AtomicUsize::new(0)));
    let handle = host.open().unwrap();
    let id = handle.id();
    assert_eq!(host.ids(), vec![id]);

    assert!(host.close(id).await);
    assert!(!host.close(id).await);
    assert!(host.is_empty());
    assert!(host.get(id).is_none());

    let err = handle.dispatch(InputEvent::press("go")).await.unwrap_err();
    assert!(matches!(err, ReactiveError::SessionClosed(closed) if closed == id));
}

#[tokio::test]
async fn setup_errors_fail_open() {
    let host = SessionHost::new(config(), |session: &Session| {
        session.define("x", |_| Ok(Value::Null))
    })
    .unwrap();

    assert!(matches!(host.open(), Err(ReactiveError::DuplicateName(_))));
    assert!(host.is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let config = SessionConfig {
        channel_capacity: 0,
        ..SessionConfig::default()
    };
    assert!(SessionHost::new(config, |_: &Session| Ok(())).is_err());
}
