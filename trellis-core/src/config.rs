//! Session configuration.
//!
//! A [`SessionConfig`] is plain data, usually loaded from JSON:
//!
//! ```json
//! {
//!   "change_detection": "value_changed",
//!   "max_cascade_rounds": 64,
//!   "widgets": [
//!     { "widget": "xcol", "signal": "x", "domain": { "kind": "choice", "choices": ["sepal_length", "petal_length"] } },
//!     { "widget": "go", "domain": { "kind": "action" } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};
use crate::input::WidgetBinding;

/// When a signal write counts as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDetection {
    /// Writing the value a signal already holds does nothing.
    #[default]
    ValueChanged,

    /// Every write invalidates dependents.
    Always,
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub change_detection: ChangeDetection,

    /// Upper bound on effect rounds in one flush. Effects writing signals
    /// start a new round; a cascade that keeps going past this is aborted.
    pub max_cascade_rounds: usize,

    /// Queue depth of a hosted session's input channel.
    pub channel_capacity: usize,

    /// Widget-to-signal bindings declared when the session is built.
    pub widgets: Vec<WidgetBinding>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            change_detection: ChangeDetection::ValueChanged,
            max_cascade_rounds: 64,
            channel_capacity: 32,
            widgets: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        if self.max_cascade_rounds == 0 {
            return Err(ReactiveError::Config(
                "max_cascade_rounds must be at least 1".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ReactiveError::Config(
                "channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn with_change_detection(mut self, detection: ChangeDetection) -> Self {
        self.change_detection = detection;
        self
    }

    pub fn with_widget(mut self, binding: WidgetBinding) -> Self {
        self.widgets.push(binding);
        self
    }
}
