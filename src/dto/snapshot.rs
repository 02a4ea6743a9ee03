use serde::Serialize;
use uuid::Uuid;

use crate::{
    games::GameKind,
    state::{
        rules::Progress,
        state_machine::{FinishReason, SessionStatus},
    },
};

/// Defensive copy of a session's state, safe to hand to a UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot<S, V> {
    /// Session identifier.
    pub id: Uuid,
    /// Game being played.
    pub game: GameKind,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// State machine version, bumped on every status change.
    pub version: usize,
    /// Why the last run finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Countdown ticks left.
    pub time_left: u32,
    /// Length of the current countdown.
    pub duration: u32,
    /// Whether the countdown is ticking.
    pub timer_running: bool,
    /// Shared counters.
    pub progress: Progress,
    /// Number of usable content items.
    pub content_len: usize,
    /// Settings of the current run.
    pub settings: S,
    /// Game-specific state.
    pub view: V,
}

impl<S, V> SessionSnapshot<S, V> {
    /// Whether the run is paused.
    pub fn is_paused(&self) -> bool {
        self.status == SessionStatus::Paused
    }

    /// Whether the run is over.
    pub fn is_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }
}
