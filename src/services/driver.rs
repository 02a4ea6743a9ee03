//! Runs a [`Session`] inside its own tokio task.
//!
//! The task owns the session and is the only place it is mutated: commands
//! from any number of [`SessionHandle`] clones and ticks from the session's
//! [`TickStream`] are serialized through a single `select!` loop. Listener
//! notifications are forwarded to a `watch` channel so async callers can wait
//! for changes instead of polling.

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::snapshot::SessionSnapshot,
    error::EngineError,
    state::{GameRules, Session, TickStream},
};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;
type SettingsUpdate<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Command<G: GameRules> {
    Start(Reply<Result<(), EngineError>>),
    Action(G::Action, Reply<bool>),
    Advance(Reply<bool>),
    TogglePause(Reply<bool>),
    End(Reply<bool>),
    Reset(Reply<()>),
    UpdateSettings(SettingsUpdate<G::Settings>, Reply<Result<(), EngineError>>),
    Snapshot(Reply<SessionSnapshot<G::Settings, G::View>>),
    Shutdown(Reply<()>),
}

/// Cloneable handle on a driven session.
pub struct SessionHandle<G: GameRules> {
    id: Uuid,
    tx: mpsc::Sender<Command<G>>,
    changes: watch::Receiver<u64>,
}

impl<G: GameRules> Clone for SessionHandle<G> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
            changes: self.changes.clone(),
        }
    }
}

/// Move `session` into a new task and return a handle on it.
///
/// `ticks` is the stream paired with the session's scheduler; pass `None` for
/// sessions without a clock (or driven by a manual scheduler).
pub fn spawn<G: GameRules>(
    session: Session<G>,
    ticks: Option<TickStream>,
) -> (SessionHandle<G>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let (changes_tx, changes) = watch::channel(0u64);

    session.add_listener(move || {
        changes_tx.send_modify(|version| *version += 1);
    });

    let handle = SessionHandle {
        id: session.id(),
        tx,
        changes,
    };
    let task = tokio::spawn(run(session, ticks, rx));
    (handle, task)
}

async fn run<G: GameRules>(
    mut session: Session<G>,
    mut ticks: Option<TickStream>,
    mut rx: mpsc::Receiver<Command<G>>,
) {
    info!(session_id = %session.id(), game = G::KIND.slug(), "session driver started");

    loop {
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else {
                    debug!(session_id = %session.id(), "all handles dropped");
                    break;
                };
                if let Some(reply) = handle_command(&mut session, command) {
                    session.destroy();
                    let _ = reply.send(());
                    break;
                }
            }
            Some(()) = next_tick(&mut ticks) => session.tick(),
        }
    }

    session.destroy();
    info!(session_id = %session.id(), "session driver stopped");
}

async fn next_tick(ticks: &mut Option<TickStream>) -> Option<()> {
    match ticks {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

/// Apply one command. Returns the shutdown reply when the loop must stop.
fn handle_command<G: GameRules>(session: &mut Session<G>, command: Command<G>) -> Option<Reply<()>> {
    match command {
        Command::Start(reply) => {
            let _ = reply.send(session.start());
        }
        Command::Action(action, reply) => {
            let _ = reply.send(session.process_action(action));
        }
        Command::Advance(reply) => {
            let _ = reply.send(session.advance());
        }
        Command::TogglePause(reply) => {
            let _ = reply.send(session.toggle_pause());
        }
        Command::End(reply) => {
            let _ = reply.send(session.end());
        }
        Command::Reset(reply) => {
            session.reset();
            let _ = reply.send(());
        }
        Command::UpdateSettings(update, reply) => {
            let _ = reply.send(session.update_settings(update));
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(session.snapshot());
        }
        Command::Shutdown(reply) => return Some(reply),
    }
    None
}

impl<G: GameRules> SessionHandle<G> {
    /// Identifier of the driven session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receiver bumped after every session change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes.clone()
    }

    /// See [`Session::start`].
    pub async fn start(&self) -> Result<(), EngineError> {
        self.request(Command::Start).await?
    }

    /// See [`Session::process_action`].
    pub async fn act(&self, action: G::Action) -> Result<bool, EngineError> {
        self.request(|reply| Command::Action(action, reply)).await
    }

    /// See [`Session::advance`].
    pub async fn advance(&self) -> Result<bool, EngineError> {
        self.request(Command::Advance).await
    }

    /// See [`Session::toggle_pause`].
    pub async fn toggle_pause(&self) -> Result<bool, EngineError> {
        self.request(Command::TogglePause).await
    }

    /// See [`Session::end`].
    pub async fn end(&self) -> Result<bool, EngineError> {
        self.request(Command::End).await
    }

    /// See [`Session::reset`].
    pub async fn reset(&self) -> Result<(), EngineError> {
        self.request(Command::Reset).await
    }

    /// See [`Session::update_settings`].
    pub async fn update_settings<F>(&self, update: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut G::Settings) + Send + 'static,
    {
        self.request(|reply| Command::UpdateSettings(Box::new(update), reply))
            .await?
    }

    /// Copy of the session state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot<G::Settings, G::View>, EngineError> {
        self.request(Command::Snapshot).await
    }

    /// Destroy the session and stop its task. Idempotent.
    pub async fn shutdown(&self) {
        if let Err(err) = self.request(Command::Shutdown).await {
            debug!(session_id = %self.id, error = %err, "driver already stopped");
        }
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command<G>) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| EngineError::DriverClosed)?;
        response.await.map_err(|_| EngineError::DriverClosed)
    }
}
