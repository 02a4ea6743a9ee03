//! Session lifecycle: state machine, countdown, listeners and the generic session.

pub mod listeners;
pub mod rules;
pub mod session;
pub mod state_machine;
pub mod timer;

pub use self::listeners::{ListenerId, ListenerRegistry};
pub use self::rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step};
pub use self::session::Session;
pub use self::state_machine::{FinishReason, InvalidTransition, SessionEvent, SessionStatus};
pub use self::timer::{
    CountdownTimer, DEFAULT_TICK_INTERVAL, ManualScheduler, Scheduler, TickStream, TokioScheduler,
    tokio_scheduler, tokio_scheduler_with_second,
};
