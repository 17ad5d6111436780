//! Iris explorer.
//!
//! Two users explore the iris measurements: X and Y selectors, a plot that
//! follows them, a second plot that only refreshes on "go", and a Y selector
//! whose options exclude the current X column. Input events are scripted;
//! every render is logged.
//!
//! ```text
//! RUST_LOG=trellis_core=debug cargo run --bin trellis-demo [config.json]
//! ```

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis_core::{
    Artifact, BoxError, InputEvent, RenderSink, ScatterPlot, Session, SessionConfig,
    SessionHost, Table, WidgetBinding, NO_DEPS,
};

const COLUMNS: [&str; 4] = ["sepal_length", "sepal_width", "petal_length", "petal_width"];

/// First rows of each species.
fn iris() -> trellis_core::Result<Table> {
    Table::new()
        .with_column("sepal_length", [5.1, 4.9, 4.7, 7.0, 6.4, 6.9, 6.3, 5.8, 7.1])?
        .with_column("sepal_width", [3.5, 3.0, 3.2, 3.2, 3.2, 3.1, 3.3, 2.7, 3.0])?
        .with_column("petal_length", [1.4, 1.4, 1.3, 4.7, 4.5, 4.9, 6.0, 5.1, 5.9])?
        .with_column("petal_width", [0.2, 0.2, 0.2, 1.4, 1.5, 1.5, 2.5, 1.9, 2.1])?
        .with_column(
            "species",
            [
                "setosa",
                "setosa",
                "setosa",
                "versicolor",
                "versicolor",
                "versicolor",
                "virginica",
                "virginica",
                "virginica",
            ],
        )
}

fn default_config() -> SessionConfig {
    SessionConfig::default()
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
        .with_widget(WidgetBinding::action("go"))
}

/// Register the explorer's derivation and effects.
fn install(session: &Session, sink: Arc<dyn RenderSink>) -> trellis_core::Result<()> {
    session.define("dat", |cx| {
        let x = cx.get_str("x")?;
        let y = cx.get_str("y")?;
        Ok(ScatterPlot::from_columns(cx.data()?, &x, &y)?.points_value())
    })?;

    let plots = Arc::clone(&sink);
    session.on_change("plot", NO_DEPS, move |cx| {
        let plot = ScatterPlot::from_value(&cx.get_str("x")?, &cx.get_str("y")?, &cx.get("dat")?)?;
        plots.render("plot", Artifact::Plot(plot))
    })?;

    let plots = Arc::clone(&sink);
    session.on_event("plot_on_go", ["go"], move |cx| {
        let plot = ScatterPlot::from_value(&cx.get_str("x")?, &cx.get_str("y")?, &cx.get("dat")?)?;
        plots.render("plot_on_go", Artifact::Plot(plot))
    })?;

    session.on_change("ycol_choices", NO_DEPS, move |cx| {
        let x = cx.get_str("x")?;
        let options = COLUMNS
            .iter()
            .filter(|column| **column != x)
            .map(|column| column.to_string())
            .collect();
        sink.render(
            "ycol",
            Artifact::Choices {
                options,
                selected: Some(cx.get_str("y")?),
            },
        )
    })?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_path(path)?,
        None => default_config(),
    };

    let sink: Arc<dyn RenderSink> = Arc::new(|output: &str, artifact: Artifact| -> Result<(), BoxError> {
        info!(output, artifact = %serde_json::to_string(&artifact)?, "render");
        Ok(())
    });

    let host = SessionHost::new(config, move |session| install(session, Arc::clone(&sink)))?
        .with_data(Arc::new(iris()?));

    let alice = host.open()?;
    let bob = host.open()?;
    info!(sessions = ?host.ids(), "sessions ready");

    // Alice switches X; only her plot and Y choices redraw
    let report = alice.dispatch(InputEvent::new("xcol", "petal_length")).await?;
    info!(session = alice.id(), ran = ?report.ran(), "xcol changed");

    // Bob changes both axes in one action, then presses go
    let report = bob
        .dispatch_all(vec![
            InputEvent::new("xcol", "petal_width"),
            InputEvent::new("ycol", "petal_length"),
        ])
        .await?;
    info!(session = bob.id(), ran = ?report.ran(), "axes changed");

    let report = bob.dispatch(InputEvent::press("go")).await?;
    info!(session = bob.id(), ran = ?report.ran(), "go pressed");

    // Rejected before it reaches the session
    if let Err(err) = alice.dispatch(InputEvent::new("xcol", "species_colour")).await {
        info!(session = alice.id(), error = %err, "invalid event rejected");
    }

    info!(session = alice.id(), state = %alice.snapshot().await?, "final state");
    info!(session = bob.id(), state = %bob.snapshot().await?, "final state");

    for id in host.ids() {
        host.close(id).await;
    }
    info!(open = host.len(), "done");
    Ok(())
}
