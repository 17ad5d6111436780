//! Error types for the reactive engine.
//!
//! Everything that can go wrong inside a session is a [`ReactiveError`].
//! Callback code (derivations and effects) may fail with any error type;
//! effect failures are boxed and reported as [`ReactiveError::EffectFailure`].

use thiserror::Error;

/// Boxed error returned by user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Errors raised by sessions, the dependency graph and the input/data
/// boundaries.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A read or write named something that was never declared as a signal
    /// (or, for reads, as a derivation).
    #[error("unknown signal `{0}`")]
    UnknownSignal(String),

    /// A signal, derivation or effect was declared under a taken name.
    #[error("name `{0}` is already declared")]
    DuplicateName(String),

    /// An evaluation re-entered a node that was still computing.
    #[error("cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency {
        /// Evaluation path, outermost first, ending with the re-entered name.
        path: Vec<String>,
    },

    /// An effect callback returned an error or panicked.
    #[error("effect `{name}` failed: {cause}")]
    EffectFailure { name: String, cause: String },

    /// A derivation tried to write a signal.
    #[error("derivation `{derivation}` attempted to write signal `{signal}`")]
    WriteInDerivation { derivation: String, signal: String },

    /// Effects kept writing signals for more rounds than allowed.
    #[error("effect cascade did not settle after {rounds} rounds")]
    CascadeLimit { rounds: usize },

    /// The data source has no column with this name.
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// A value accessor was used on a value of another kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An input event named a widget with no binding.
    #[error("unknown widget `{0}`")]
    UnknownWidget(String),

    /// An input event carried a value outside the widget's domain.
    #[error("invalid input for widget `{widget}`: {reason}")]
    InvalidInput { widget: String, reason: String },

    /// Configuration is structurally valid JSON but semantically wrong.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The session task behind a host handle is no longer running.
    #[error("session {0} is closed")]
    SessionClosed(u64),
}

impl ReactiveError {
    /// Whether this error reports a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, ReactiveError::CyclicDependency { .. })
    }
}

/// Find a [`ReactiveError`] inside a boxed callback error.
pub(crate) fn as_reactive(err: &BoxError) -> Option<&ReactiveError> {
    err.downcast_ref::<ReactiveError>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = ReactiveError::CyclicDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");
        assert!(err.is_cycle());
    }

    #[test]
    fn boxed_errors_downcast() {
        let boxed: BoxError = Box::new(ReactiveError::UnknownSignal("x".into()));
        assert!(matches!(
            as_reactive(&boxed),
            Some(ReactiveError::UnknownSignal(name)) if name == "x"
        ));

        let other: BoxError = "plain".into();
        assert!(as_reactive(&other).is_none());
    }
}
