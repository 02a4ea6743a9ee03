//! Extension points through which a concrete game plugs into [`super::Session`].

use std::{fmt::Debug, time::Duration};

use rand::rngs::StdRng;
use serde::{Serialize, de::DeserializeOwned};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::record::RecordDraft,
    error::NotReadyReason,
    games::GameKind,
    services::selector::{self, UsedSet},
    state::{
        state_machine::{FinishReason, SessionStatus},
        timer::{CountdownTimer, DEFAULT_TICK_INTERVAL},
    },
};

/// A playable unit handed over by the content provider.
pub trait ContentItem: DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Identifier used to avoid serving the same item twice in a cycle.
    fn key(&self) -> String;

    /// Minimal shape check; failing items are dropped from the pool at load time.
    fn check_shape(&self) -> Result<(), ValidationErrors>;
}

/// Per-game settings, fixed for the duration of a run.
pub trait GameSettings: Clone + Debug + Default + Validate + Serialize + Send + 'static {
    /// Countdown displayed before the run starts, in ticks.
    fn countdown_ticks(&self) -> u32 {
        0
    }
}

/// Counters shared by every game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Points of the single player (team scores live in the game state).
    pub score: u32,
    /// Items answered or shown.
    pub answered: u32,
    /// Items answered correctly.
    pub correct: u32,
    /// Passes used in the current turn.
    pub passes_used: u32,
    /// Current round (1-based) for multi-round games.
    pub round: u32,
    /// Index of the current item in a fixed-length session (0-based).
    pub position: u32,
}

/// What a rule-set asks the session to do after handling an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Input rejected; nothing changed and no listener is notified.
    Ignored,
    /// State changed, status unchanged.
    Updated,
    /// Show feedback for the current item.
    Reveal,
    /// Return to active play after a reveal or a transition.
    Continue,
    /// Stop the clock and wait for an explicit next step.
    AwaitTransition,
    /// End the run.
    Finish(FinishReason),
}

/// Borrowed view of the session handed to rule-set hooks.
pub struct RuleContext<'a, G: GameRules> {
    /// Settings of the current run.
    pub settings: &'a G::Settings,
    /// Every validated item.
    pub content: &'a [G::Item],
    /// Items already served in the current cycle.
    pub used: &'a mut UsedSet,
    /// Shared counters.
    pub progress: &'a mut Progress,
    /// The session's single countdown.
    pub timer: &'a mut CountdownTimer,
    /// Session random source.
    pub rng: &'a mut StdRng,
    /// Status when the hook was invoked.
    pub status: SessionStatus,
}

impl<G: GameRules> RuleContext<'_, G> {
    /// Next item of the whole pool without immediate repetition.
    pub fn pick_next(&mut self) -> Option<G::Item> {
        selector::pick_next(self.content, self.used, |item: &G::Item| item.key(), self.rng).cloned()
    }

    /// Next item among those matching `predicate`, falling back to the whole
    /// pool when nothing matches.
    pub fn pick_next_where<P>(&mut self, predicate: P) -> Option<G::Item>
    where
        P: Fn(&G::Item) -> bool,
    {
        let content = self.content;
        let pool = selector::pick_filtered(content, predicate);
        selector::pick_next(&pool, self.used, |item: &&G::Item| item.key(), self.rng)
            .map(|item| (*item).clone())
    }

    /// Start a countdown of `seconds` one-second ticks, replacing any running one.
    pub fn start_clock(&mut self, seconds: u32) {
        self.timer.start(seconds, DEFAULT_TICK_INTERVAL);
    }

    /// Start a countdown with a custom tick period.
    pub fn start_clock_with(&mut self, ticks: u32, interval: Duration) {
        self.timer.start(ticks, interval);
    }

    /// Ticks left on the countdown.
    pub fn time_left(&self) -> u32 {
        self.timer.remaining()
    }
}

/// Rules of one concrete game.
///
/// The session owns the lifecycle (status, timer, listeners, content, record
/// sink); the rule-set owns the variant state and decides what each input does.
pub trait GameRules: Sized + Send + 'static {
    /// Content item type.
    type Item: ContentItem;
    /// Settings type.
    type Settings: GameSettings;
    /// Input accepted while playing.
    type Action: Debug + Send + 'static;
    /// Game-specific part of the session snapshot.
    type View: Clone + Debug + Serialize + Send + 'static;

    /// Which game these rules implement.
    const KIND: GameKind;

    /// Extra start preconditions beyond having content.
    fn check_ready(&self, _settings: &Self::Settings) -> Result<(), NotReadyReason> {
        Ok(())
    }

    /// Set up a fresh run: first pick, timer start.
    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step;

    /// Handle one action while the session is playing.
    fn act(&mut self, action: Self::Action, ctx: &mut RuleContext<'_, Self>) -> Step;

    /// Called on every countdown tick that does not expire it.
    fn on_tick(&mut self, _ctx: &mut RuleContext<'_, Self>) -> Step {
        Step::Updated
    }

    /// Called once when the countdown reaches zero.
    fn on_expire(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step;

    /// Explicit next step after a reveal or while awaiting a transition.
    fn advance(&mut self, _ctx: &mut RuleContext<'_, Self>) -> Step {
        Step::Ignored
    }

    /// Whether the player may pause right now.
    fn can_pause(&self) -> bool {
        true
    }

    /// Forget everything about the current run.
    fn clear(&mut self);

    /// Game-specific snapshot.
    fn view(&self) -> Self::View;

    /// Results handed to the record sink when the run finishes.
    fn summarize(&self, progress: &Progress, settings: &Self::Settings) -> RecordDraft;
}
