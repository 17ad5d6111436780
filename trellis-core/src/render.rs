//! Output boundary.
//!
//! Effects hand finished artifacts to a [`RenderSink`]. How an artifact is
//! drawn (SVG, PNG, terminal) is up to the sink.

use parking_lot::Mutex;
use serde::Serialize;

use crate::data::DataSource;
use crate::error::{BoxError, ReactiveError, Result};
use crate::value::Value;

/// Points of a two-column scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPlot {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

impl ScatterPlot {
    /// Pair two numeric columns row by row.
    pub fn from_columns(data: &dyn DataSource, x: &str, y: &str) -> Result<Self> {
        let xs = data.numeric_column(x)?;
        let ys = data.numeric_column(y)?;
        Ok(Self {
            x_label: x.to_string(),
            y_label: y.to_string(),
            points: xs.into_iter().zip(ys).collect(),
        })
    }

    /// Rebuild a plot from a list of `[x, y]` pairs, as produced by
    /// [`ScatterPlot::points_value`].
    pub fn from_value(x_label: &str, y_label: &str, value: &Value) -> Result<Self> {
        let points = value
            .as_list()?
            .iter()
            .map(|pair| -> Result<(f64, f64)> {
                match pair.as_list()? {
                    [x, y] => Ok((x.as_f64()?, y.as_f64()?)),
                    other => Err(ReactiveError::TypeMismatch {
                        expected: "pair",
                        found: if other.is_empty() { "empty list" } else { "list" },
                    }),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            points,
        })
    }

    /// The points as a reactive value (a list of `[x, y]` pairs).
    pub fn points_value(&self) -> Value {
        Value::from(self.points.clone())
    }
}

/// Something an effect renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Plot(ScatterPlot),

    /// Options for a selector widget.
    Choices {
        options: Vec<String>,
        selected: Option<String>,
    },

    Text { text: String },
}

/// Receives rendered artifacts.
pub trait RenderSink: Send + Sync {
    fn render(&self, target: &str, artifact: Artifact) -> std::result::Result<(), BoxError>;
}

impl<F> RenderSink for F
where
    F: Fn(&str, Artifact) -> std::result::Result<(), BoxError> + Send + Sync,
{
    fn render(&self, target: &str, artifact: Artifact) -> std::result::Result<(), BoxError> {
        self(target, artifact)
    }
}

/// Sink that keeps every call in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<(String, Artifact)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, Artifact)> {
        self.calls.lock().clone()
    }

    /// Number of renders to `target`.
    pub fn count(&self, target: &str) -> usize {
        self.calls.lock().iter().filter(|(t, _)| t == target).count()
    }

    pub fn last(&self, target: &str) -> Option<Artifact> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(t, _)| t == target)
            .map(|(_, a)| a.clone())
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl RenderSink for RecordingSink {
    fn render(&self, target: &str, artifact: Artifact) -> std::result::Result<(), BoxError> {
        self.calls.lock().push((target.to_string(), artifact));
        Ok(())
    }
}
