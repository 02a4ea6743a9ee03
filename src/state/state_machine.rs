use serde::Serialize;
use thiserror::Error;

/// High-level phases a session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No run is active; settings and content can be managed.
    Idle,
    /// A run is active and accepts input.
    Playing,
    /// The run was paused by the player; the countdown is frozen.
    Paused,
    /// Turn-based and level-based games wait for an explicit next step.
    AwaitingTransition,
    /// Quiz games show feedback for the current item before moving on.
    RevealingAnswer,
    /// The run is over; results have been handed to the record sink.
    Finished,
}

impl SessionStatus {
    /// Whether a run is in progress (anything between `start` and the finish).
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionStatus::Playing
                | SessionStatus::Paused
                | SessionStatus::AwaitingTransition
                | SessionStatus::RevealingAnswer
        )
    }
}

/// Indicates why a run transitioned to [`SessionStatus::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The session countdown reached zero.
    TimeUp,
    /// The configured target score was reached.
    TargetReached,
    /// Every configured round was played.
    RoundsCompleted,
    /// Every question of the session was served.
    QuestionsExhausted,
    /// The player ran out of lives.
    OutOfLives,
    /// The caller ended the run early.
    Ended,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Begin a run from idle.
    Start,
    /// Freeze the run.
    Pause,
    /// Unfreeze a paused run.
    Resume,
    /// Show feedback for the current item.
    Reveal,
    /// Stop and wait for the caller to trigger the next turn or level.
    AwaitTransition,
    /// Go back to active play after a reveal or a turn/level transition.
    Continue,
    /// Terminate the run.
    Finish(FinishReason),
    /// Return to idle from any phase.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionStatus,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MachineSnapshot {
    /// Current phase of the state machine.
    pub status: SessionStatus,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Why the last run finished, if it did.
    pub finish_reason: Option<FinishReason>,
}

/// State machine implementing the session lifecycle shared by every game.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    status: SessionStatus,
    version: usize,
    finish_reason: Option<FinishReason>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            version: 0,
            finish_reason: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Reason attached to the last [`SessionEvent::Finish`], cleared on start and reset.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            status: self.status,
            version: self.version,
            finish_reason: self.finish_reason,
        }
    }

    /// Apply an event, moving to the next phase when the transition is valid.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionStatus, InvalidTransition> {
        let next = self.compute_transition(event)?;

        match event {
            SessionEvent::Finish(reason) => self.finish_reason = Some(reason),
            SessionEvent::Start | SessionEvent::Reset => self.finish_reason = None,
            _ => {}
        }

        self.status = next;
        self.version += 1;
        Ok(next)
    }

    /// Check whether an event would be accepted without applying it.
    pub fn can_apply(&self, event: SessionEvent) -> bool {
        self.compute_transition(event).is_ok()
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionStatus, InvalidTransition> {
        use SessionStatus::*;

        let next = match (self.status, event) {
            (Idle, SessionEvent::Start) => Playing,
            (Playing, SessionEvent::Pause) => Paused,
            (Paused, SessionEvent::Resume) => Playing,
            (Playing, SessionEvent::Reveal) => RevealingAnswer,
            (Playing, SessionEvent::AwaitTransition) => AwaitingTransition,
            (RevealingAnswer | AwaitingTransition, SessionEvent::Continue) => Playing,
            (Playing | Paused | RevealingAnswer | AwaitingTransition, SessionEvent::Finish(_)) => {
                Finished
            }
            (_, SessionEvent::Reset) => Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionStatus {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.status(), SessionStatus::Idle);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn full_happy_path_through_quiz() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionStatus::Playing);
        assert_eq!(apply(&mut sm, SessionEvent::Pause), SessionStatus::Paused);
        assert_eq!(apply(&mut sm, SessionEvent::Resume), SessionStatus::Playing);
        assert_eq!(
            apply(&mut sm, SessionEvent::Reveal),
            SessionStatus::RevealingAnswer
        );
        assert_eq!(apply(&mut sm, SessionEvent::Continue), SessionStatus::Playing);
        assert_eq!(
            apply(&mut sm, SessionEvent::Finish(FinishReason::QuestionsExhausted)),
            SessionStatus::Finished
        );
        assert_eq!(sm.finish_reason(), Some(FinishReason::QuestionsExhausted));
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionStatus::Idle);
        assert_eq!(sm.finish_reason(), None);
        assert_eq!(sm.snapshot().version, 7);
    }

    #[test]
    fn turn_transition_round_trip() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);

        assert_eq!(
            apply(&mut sm, SessionEvent::AwaitTransition),
            SessionStatus::AwaitingTransition
        );
        assert!(!sm.can_apply(SessionEvent::Pause));
        assert_eq!(apply(&mut sm, SessionEvent::Continue), SessionStatus::Playing);
    }

    #[test]
    fn pause_is_rejected_outside_playing() {
        let mut sm = SessionStateMachine::new();
        let err = sm.apply(SessionEvent::Pause).unwrap_err();
        assert_eq!(err.from, SessionStatus::Idle);
        assert_eq!(err.event, SessionEvent::Pause);

        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::Reveal);
        assert!(sm.apply(SessionEvent::Pause).is_err());
    }

    #[test]
    fn finished_session_only_accepts_reset() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::Finish(FinishReason::TimeUp));

        for event in [
            SessionEvent::Start,
            SessionEvent::Pause,
            SessionEvent::Continue,
            SessionEvent::Finish(FinishReason::Ended),
        ] {
            assert!(sm.apply(event).is_err(), "{event:?} should be rejected");
        }
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionStatus::Idle);
    }

    #[test]
    fn invalid_transition_does_not_bump_version() {
        let mut sm = SessionStateMachine::new();
        let _ = sm.apply(SessionEvent::Reveal);
        assert_eq!(sm.snapshot().version, 0);
        assert_eq!(sm.status(), SessionStatus::Idle);
    }
}
