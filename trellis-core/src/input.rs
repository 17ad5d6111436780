//! Input boundary: widget events to signal writes.
//!
//! Widgets live outside the engine. Each one is bound to a signal with a
//! [`WidgetBinding`], and its events arrive as [`InputEvent`]s. The binding's
//! [`ValueDomain`] says which values the widget can produce; anything else is
//! rejected before it reaches the signal store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};
use crate::value::Value;

/// Values a widget can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueDomain {
    /// One of a fixed set of strings (dropdowns, radio buttons).
    Choice { choices: Vec<String> },

    /// Checkboxes.
    Boolean,

    /// Sliders and numeric inputs.
    Numeric {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },

    /// Action buttons. Every press bumps a counter signal.
    Action,

    /// No validation.
    Any,
}

impl ValueDomain {
    /// Check that `value` is something this widget could produce.
    pub fn check(&self, widget: &str, value: &Value) -> Result<()> {
        let invalid = |reason: String| ReactiveError::InvalidInput {
            widget: widget.to_string(),
            reason,
        };

        match self {
            ValueDomain::Choice { choices } => {
                let choice = value
                    .as_str()
                    .map_err(|_| invalid(format!("expected a choice, got {}", value.kind())))?;
                if choices.iter().any(|c| c == choice) {
                    Ok(())
                } else {
                    Err(invalid(format!("`{choice}` is not one of {choices:?}")))
                }
            }
            ValueDomain::Boolean => value
                .as_bool()
                .map(|_| ())
                .map_err(|_| invalid(format!("expected a bool, got {}", value.kind()))),
            ValueDomain::Numeric { min, max } => {
                let n = value
                    .as_f64()
                    .map_err(|_| invalid(format!("expected a number, got {}", value.kind())))?;
                if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
                    return Err(invalid(format!("{n} is out of range")));
                }
                Ok(())
            }
            ValueDomain::Action | ValueDomain::Any => Ok(()),
        }
    }

    /// Value a widget starts with when the binding gives none.
    pub fn default_value(&self) -> Value {
        match self {
            ValueDomain::Choice { choices } => choices
                .first()
                .map(|c| Value::from(c.as_str()))
                .unwrap_or(Value::Null),
            ValueDomain::Boolean => Value::Bool(false),
            ValueDomain::Numeric { min, .. } => Value::Number(min.unwrap_or(0.0)),
            ValueDomain::Action => Value::Number(0.0),
            ValueDomain::Any => Value::Null,
        }
    }
}

/// Binds one widget to one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetBinding {
    pub widget: String,

    /// Signal name; defaults to the widget id.
    #[serde(default)]
    pub signal: Option<String>,

    pub domain: ValueDomain,

    #[serde(default)]
    pub initial: Option<Value>,
}

impl WidgetBinding {
    pub fn new(widget: impl Into<String>, domain: ValueDomain) -> Self {
        Self {
            widget: widget.into(),
            signal: None,
            domain,
            initial: None,
        }
    }

    pub fn choice<I, S>(widget: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            widget,
            ValueDomain::Choice {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn action(widget: impl Into<String>) -> Self {
        Self::new(widget, ValueDomain::Action)
    }

    pub fn to_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    pub fn with_initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn signal_name(&self) -> &str {
        self.signal.as_deref().unwrap_or(&self.widget)
    }

    pub fn initial_value(&self) -> Value {
        self.initial
            .clone()
            .unwrap_or_else(|| self.domain.default_value())
    }
}

/// A widget event as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub widget: String,
    #[serde(default)]
    pub value: Value,
}

impl InputEvent {
    pub fn new(widget: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            widget: widget.into(),
            value: value.into(),
        }
    }

    /// A button press. The value is ignored.
    pub fn press(widget: impl Into<String>) -> Self {
        Self::new(widget, Value::Null)
    }
}

/// What a validated event asks the session to do.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InputWrite {
    Set { signal: String, value: Value },
    Trigger { signal: String },
}

/// Widget bindings of one session, keyed by widget id.
#[derive(Debug, Clone, Default)]
pub(crate) struct InputMap {
    bindings: IndexMap<String, WidgetBinding>,
}

impl InputMap {
    pub fn from_bindings(bindings: &[WidgetBinding]) -> Result<Self> {
        let mut map = IndexMap::new();
        for binding in bindings {
            if let Some(initial) = &binding.initial {
                if binding.domain != ValueDomain::Action {
                    binding.domain.check(&binding.widget, initial)?;
                }
            }
            if map.insert(binding.widget.clone(), binding.clone()).is_some() {
                return Err(ReactiveError::Config(format!(
                    "widget `{}` is bound twice",
                    binding.widget
                )));
            }
        }
        Ok(Self { bindings: map })
    }

    pub fn bindings(&self) -> impl Iterator<Item = &WidgetBinding> {
        self.bindings.values()
    }

    pub fn resolve(&self, event: &InputEvent) -> Result<InputWrite> {
        let binding = self
            .bindings
            .get(&event.widget)
            .ok_or_else(|| ReactiveError::UnknownWidget(event.widget.clone()))?;
        let signal = binding.signal_name().to_string();

        if binding.domain == ValueDomain::Action {
            return Ok(InputWrite::Trigger { signal });
        }

        binding.domain.check(&event.widget, &event.value)?;
        Ok(InputWrite::Set {
            signal,
            value: event.value.clone(),
        })
    }
}
