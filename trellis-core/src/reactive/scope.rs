//! Evaluation scope handed to derivation and effect callbacks.

use crate::data::DataSource;
use crate::error::{ReactiveError, Result};
use crate::value::Value;

use super::session::Session;

/// Access to the session from inside a callback.
///
/// Reads through a scope are tracked: they become dependencies of the
/// derivation or effect being evaluated.
pub struct Scope<'a> {
    session: &'a Session,
    name: &'a str,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(session: &'a Session, name: &'a str) -> Self {
        Self { session, name }
    }

    /// Name of the derivation or effect being evaluated.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Read a signal or derivation and record the dependency.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.session.get(name)
    }

    /// Read a text value.
    pub fn get_str(&self, name: &str) -> Result<String> {
        self.get(name)?.as_str().map(str::to_string)
    }

    /// Read a numeric value.
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.get(name)?.as_f64()
    }

    /// Read without recording a dependency.
    pub fn get_untracked(&self, name: &str) -> Result<Value> {
        self.session.get_untracked(name)
    }

    /// Write a signal. Only effects may write.
    ///
    /// The write invalidates immediately; affected effects run after the
    /// current round.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.session.set(name, value).map(|_| ())
    }

    /// Bump an action counter.
    pub fn trigger(&self, name: &str) -> Result<()> {
        self.session.trigger(name).map(|_| ())
    }

    /// The session's data source.
    pub fn data(&self) -> Result<&'a dyn DataSource> {
        self.session
            .data_ref()
            .ok_or_else(|| ReactiveError::Config("session has no data source".into()))
    }

    /// The session itself, for registering further nodes.
    pub fn session(&self) -> &'a Session {
        self.session
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("session", &self.session.id())
            .finish()
    }
}
