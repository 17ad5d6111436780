//! End-to-end scenarios: widgets in, artifacts out.

use std::sync::Arc;

use trellis_core::{
    Artifact, BoxError, InputEvent, ReactiveError, RecordingSink, RenderSink, ScatterPlot, Scope,
    Session, SessionConfig, Table, Value, WidgetBinding, NO_DEPS,
};

const COLUMNS: [&str; 4] = ["sepal_length", "sepal_width", "petal_length", "petal_width"];

fn iris() -> Arc<Table> {
    let table = Table::new()
        .with_column("sepal_length", [5.1, 4.9, 7.0])
        .unwrap()
        .with_column("sepal_width", [3.5, 3.0, 3.2])
        .unwrap()
        .with_column("petal_length", [1.4, 1.4, 4.7])
        .unwrap()
        .with_column("petal_width", [0.2, 0.2, 1.4])
        .unwrap();
    Arc::new(table)
}

fn explorer() -> Session {
    let config = SessionConfig::default()
        .with_widget(
            WidgetBinding::choice("xcol", COLUMNS)
                .to_signal("x")
                .with_initial("sepal_length"),
        )
        .with_widget(
            WidgetBinding::choice("ycol", COLUMNS)
                .to_signal("y")
                .with_initial("sepal_width"),
        )
        .with_widget(WidgetBinding::action("go"));

    let session = Session::builder().config(config).data(iris()).build().unwrap();
    session
        .define("dat", |cx| {
            let x = cx.get_str("x")?;
            let y = cx.get_str("y")?;
            Ok(ScatterPlot::from_columns(cx.data()?, &x, &y)?.points_value())
        })
        .unwrap();
    session
}

fn plot_effect(
    sink: Arc<RecordingSink>,
    target: &'static str,
) -> impl Fn(&Scope<'_>) -> Result<(), BoxError> + Send + Sync + 'static {
    move |cx: &Scope<'_>| -> Result<(), BoxError> {
        let plot = ScatterPlot::from_value(&cx.get_str("x")?, &cx.get_str("y")?, &cx.get("dat")?)?;
        sink.render(target, Artifact::Plot(plot))
    }
}

fn last_plot(sink: &RecordingSink, target: &str) -> ScatterPlot {
    match sink.last(target) {
        Some(Artifact::Plot(plot)) => plot,
        other => panic!("expected a plot, got {other:?}"),
    }
}

#[test]
fn changing_x_redraws_plot_once() {
    let session = explorer();
    let sink = Arc::new(RecordingSink::new());
    session
        .on_change("plot", NO_DEPS, plot_effect(sink.clone(), "plot"))
        .unwrap();

    assert_eq!(sink.count("plot"), 1);
    assert_eq!(session.recomputations("dat"), Some(1));

    let report = session
        .dispatch(InputEvent::new("xcol", "petal_length"))
        .unwrap();

    assert_eq!(report.ran(), ["plot"]);
    assert_eq!(sink.count("plot"), 2);
    assert_eq!(session.recomputations("dat"), Some(2));
    assert_eq!(session.invalidations("dat"), Some(1));

    let plot = last_plot(&sink, "plot");
    assert_eq!(plot.x_label, "petal_length");
    assert_eq!(plot.y_label, "sepal_width");
    assert_eq!(plot.points, vec![(1.4, 3.5), (1.4, 3.0), (4.7, 3.2)]);
}

#[test]
fn action_button_gates_plot() {
    let session = explorer();
    let sink = Arc::new(RecordingSink::new());
    session
        .on_event("plot_on_go", ["go"], plot_effect(sink.clone(), "plot"))
        .unwrap();
    assert!(sink.is_empty());

    assert!(session.dispatch(InputEvent::new("xcol", "petal_width")).unwrap().ran().is_empty());
    assert!(session.dispatch(InputEvent::new("ycol", "petal_length")).unwrap().ran().is_empty());
    assert!(sink.is_empty());

    let report = session.dispatch(InputEvent::press("go")).unwrap();
    assert_eq!(report.runs_of("plot_on_go"), 1);
    assert_eq!(sink.count("plot"), 1);

    let plot = last_plot(&sink, "plot");
    assert_eq!(plot.x_label, "petal_width");
    assert_eq!(plot.y_label, "petal_length");

    // Axis changes after the press wait for the next one
    session.dispatch(InputEvent::new("xcol", "sepal_length")).unwrap();
    assert_eq!(sink.count("plot"), 1);
}

#[test]
fn presses_in_one_action_run_once() {
    let session = explorer();
    let sink = Arc::new(RecordingSink::new());
    session
        .on_event("plot_on_go", ["go"], plot_effect(sink.clone(), "plot"))
        .unwrap();

    let report = session
        .dispatch_all(vec![InputEvent::press("go"), InputEvent::press("go")])
        .unwrap();

    assert_eq!(report.runs_of("plot_on_go"), 1);
    assert_eq!(session.get("go").unwrap(), Value::from(2));
}

#[test]
fn y_choices_exclude_current_x() {
    let session = explorer();
    let sink = Arc::new(RecordingSink::new());
    let choices = sink.clone();
    session
        .on_change("ycol_choices", NO_DEPS, move |cx| {
            let x = cx.get_str("x")?;
            let options = COLUMNS
                .iter()
                .filter(|column| **column != x)
                .map(|column| column.to_string())
                .collect();
            choices.render(
                "ycol",
                Artifact::Choices {
                    options,
                    selected: Some(cx.get_str("y")?),
                },
            )
        })
        .unwrap();

    session.dispatch(InputEvent::new("xcol", "petal_width")).unwrap();

    assert_eq!(
        sink.last("ycol"),
        Some(Artifact::Choices {
            options: vec![
                "sepal_length".to_string(),
                "sepal_width".to_string(),
                "petal_length".to_string(),
            ],
            selected: Some("sepal_width".to_string()),
        })
    );
}

#[test]
fn invalid_events_change_nothing() {
    let session = explorer();
    let sink = Arc::new(RecordingSink::new());
    session
        .on_change("plot", NO_DEPS, plot_effect(sink.clone(), "plot"))
        .unwrap();

    let err = session
        .dispatch_all(vec![
            InputEvent::new("xcol", "petal_length"),
            InputEvent::new("ycol", "species"),
        ])
        .unwrap_err();

    assert!(matches!(err, ReactiveError::InvalidInput { widget, .. } if widget == "ycol"));
    assert_eq!(session.get("x").unwrap(), Value::from("sepal_length"));
    assert_eq!(sink.count("plot"), 1);

    assert!(matches!(
        session.dispatch(InputEvent::press("reset")),
        Err(ReactiveError::UnknownWidget(_))
    ));
}

#[test]
fn missing_column_surfaces_as_effect_failure() {
    let session = explorer();
    let sink = Arc::new(RecordingSink::new());
    session
        .on_change("plot", NO_DEPS, plot_effect(sink.clone(), "plot"))
        .unwrap();

    // Bypasses widget validation on purpose
    let report = session.set("x", "species").unwrap();
    assert_eq!(report.failures().len(), 1);
    assert!(matches!(
        &report.failures()[0],
        ReactiveError::EffectFailure { name, cause } if name == "plot" && cause.contains("species")
    ));
    assert_eq!(sink.count("plot"), 1);
}

#[test]
fn session_from_json_config() {
    let config = SessionConfig::from_json_str(
        r#"{
            "max_cascade_rounds": 8,
            "widgets": [
                { "widget": "xcol", "signal": "x",
                  "domain": { "kind": "choice", "choices": ["sepal_length", "petal_length"] },
                  "initial": "petal_length" },
                { "widget": "size", "domain": { "kind": "numeric", "min": 1, "max": 10 } },
                { "widget": "go", "domain": { "kind": "action" } }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(config.max_cascade_rounds, 8);

    let session = Session::from_config(config).unwrap();
    assert_eq!(
        session.snapshot(),
        serde_json::json!({ "x": "petal_length", "size": 1.0, "go": 0.0 })
    );

    session.dispatch(InputEvent::new("size", 4)).unwrap();
    assert_eq!(session.get("size").unwrap(), Value::from(4));
    assert!(session.dispatch(InputEvent::new("size", 40)).is_err());
}
