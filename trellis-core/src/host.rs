//! Multi-session host.
//!
//! Every connected user gets their own [`Session`], built from a shared
//! configuration and a shared setup function that registers the app's
//! derivations and effects. Each session runs on its own Tokio task and is
//! driven through a [`SessionHandle`], so one user's event never blocks or
//! observes another's state.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::data::DataSource;
use crate::error::{ReactiveError, Result};
use crate::input::InputEvent;
use crate::reactive::{FlushReport, Session};

/// Registers an app's derivations and effects on a fresh session.
pub type SetupFn = dyn Fn(&Session) -> Result<()> + Send + Sync;

/// Commands sent to a session task.
enum SessionCommand {
    /// Apply the events of one user action as a batch.
    Dispatch {
        events: Vec<InputEvent>,
        reply: oneshot::Sender<Result<FlushReport>>,
    },
    /// Read all signal values.
    Snapshot {
        reply: oneshot::Sender<serde_json::Value>,
    },
    /// Stop the task and drop the session.
    Close,
}

/// Async handle to one hosted session.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn dispatch(&self, event: InputEvent) -> Result<FlushReport> {
        self.dispatch_all(vec![event]).await
    }

    pub async fn dispatch_all(&self, events: Vec<InputEvent>) -> Result<FlushReport> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Dispatch { events, reply }).await?;
        response
            .await
            .map_err(|_| ReactiveError::SessionClosed(self.id))?
    }

    pub async fn snapshot(&self) -> Result<serde_json::Value> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        response
            .await
            .map_err(|_| ReactiveError::SessionClosed(self.id))
    }

    /// Whether the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ReactiveError::SessionClosed(self.id))
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Opens, tracks and closes sessions.
pub struct SessionHost {
    config: SessionConfig,
    data: Option<Arc<dyn DataSource>>,
    setup: Arc<SetupFn>,
    sessions: DashMap<u64, SessionHandle>,
}

impl SessionHost {
    pub fn new<F>(config: SessionConfig, setup: F) -> Result<Self>
    where
        F: Fn(&Session) -> Result<()> + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            data: None,
            setup: Arc::new(setup),
            sessions: DashMap::new(),
        })
    }

    /// Share one dataset between all sessions.
    pub fn with_data(mut self, data: Arc<dyn DataSource>) -> Self {
        self.data = Some(data);
        self
    }

    /// Build a session, run the setup function on it and spawn its task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(&self) -> Result<SessionHandle> {
        let mut builder = Session::builder().config(self.config.clone());
        if let Some(data) = &self.data {
            builder = builder.data(Arc::clone(data));
        }
        let session = builder.build()?;
        (self.setup)(&session)?;

        let id = session.id();
        let (commands, receiver) = mpsc::channel(self.config.channel_capacity);
        tokio::spawn(run_session(session, receiver));

        let handle = SessionHandle { id, commands };
        self.sessions.insert(id, handle.clone());
        info!(session = id, open = self.sessions.len(), "session opened");
        Ok(handle)
    }

    pub fn get(&self, id: u64) -> Option<SessionHandle> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Stop a session's task. Returns false for unknown ids.
    pub async fn close(&self, id: u64) -> bool {
        let Some((_, handle)) = self.sessions.remove(&id) else {
            return false;
        };
        // An already stopped task is closed as well
        let _ = handle.send(SessionCommand::Close).await;
        info!(session = id, open = self.sessions.len(), "session closed");
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of open sessions, ascending.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.sessions.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }
}

async fn run_session(session: Session, mut commands: mpsc::Receiver<SessionCommand>) {
    while let Some(command) = commands.recv().await {
        match command {
            SessionCommand::Dispatch { events, reply } => {
                let result = session.dispatch_all(events);
                if let Err(err) = &result {
                    warn!(session = session.id(), error = %err, "event rejected");
                }
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(session.snapshot());
            }
            SessionCommand::Close => break,
        }
    }
    debug!(session = session.id(), "session task stopped");
}
