//! Generic game session: lifecycle, timer, listeners and record hand-off.
//!
//! A [`Session`] owns everything a running game needs and delegates the
//! game-specific decisions to its [`GameRules`]. Every public mutation is
//! synchronous and followed by a listener notification when something changed.

use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{content::ContentCatalog, records::RecordSink},
    dto::{record::GameRecord, snapshot::SessionSnapshot},
    error::{EngineError, NotReadyReason},
    games::GameKind,
    services::selector::UsedSet,
    state::{
        listeners::{ListenerId, ListenerRegistry},
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
        state_machine::{FinishReason, SessionEvent, SessionStateMachine, SessionStatus},
        timer::{CountdownTimer, ManualScheduler, Scheduler, TickOutcome},
    },
};

/// One game instance.
pub struct Session<G: GameRules> {
    id: Uuid,
    rules: G,
    settings: G::Settings,
    content: Vec<G::Item>,
    machine: SessionStateMachine,
    progress: Progress,
    used: UsedSet,
    timer: CountdownTimer,
    listeners: ListenerRegistry,
    sink: Option<Arc<dyn RecordSink>>,
    rng: StdRng,
    /// Whether the countdown was live when the run was paused.
    resume_timer: bool,
    recorded: bool,
    destroyed: bool,
}

impl<G: GameRules> std::fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("game", &G::KIND)
            .field("status", &self.machine.status())
            .field("progress", &self.progress)
            .field("content", &self.content.len())
            .field("timer", &self.timer)
            .finish()
    }
}

impl<G: GameRules> Session<G> {
    /// Session driven by a manual clock; call [`Session::tick`] to advance time.
    pub fn new(rules: G) -> Self {
        Self::with_scheduler(rules, Box::new(ManualScheduler::new()))
    }

    /// Session whose countdown is driven by `scheduler`.
    pub fn with_scheduler(rules: G, scheduler: Box<dyn Scheduler>) -> Self {
        let settings = G::Settings::default();
        let mut timer = CountdownTimer::new(scheduler);
        timer.preset(settings.countdown_ticks());

        Self {
            id: Uuid::new_v4(),
            rules,
            settings,
            content: Vec::new(),
            machine: SessionStateMachine::new(),
            progress: Progress::default(),
            used: UsedSet::new(),
            timer,
            listeners: ListenerRegistry::new(),
            sink: None,
            rng: StdRng::from_os_rng(),
            resume_timer: false,
            recorded: false,
            destroyed: false,
        }
    }

    /// Replace the random source with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Hand finished runs to `sink`.
    pub fn with_record_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Game played by this session.
    pub fn kind(&self) -> GameKind {
        G::KIND
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.machine.status()
    }

    /// Why the last run finished, while finished.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.machine.finish_reason()
    }

    /// Shared counters of the current run.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Settings in effect.
    pub fn settings(&self) -> &G::Settings {
        &self.settings
    }

    /// Validated content pool.
    pub fn content(&self) -> &[G::Item] {
        &self.content
    }

    /// Game rules and their state.
    pub fn rules(&self) -> &G {
        &self.rules
    }

    /// Ticks left on the countdown.
    pub fn time_left(&self) -> u32 {
        self.timer.remaining()
    }

    /// Whether the countdown is live.
    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Whether [`Session::destroy`] was called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Register a listener invoked after every state change.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.add(listener)
    }

    /// Unregister a listener. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Shared handle on the listener registry, usable from inside a listener.
    pub fn listeners(&self) -> ListenerRegistry {
        self.listeners.clone()
    }

    /// Replace the content pool, dropping malformed items.
    ///
    /// Returns the number of items kept. The pool is fixed while a run is active.
    pub fn set_content(&mut self, items: Vec<G::Item>) -> Result<usize, EngineError> {
        if self.destroyed {
            return Ok(0);
        }
        if self.machine.status().is_active() {
            return Err(EngineError::InvalidInput(
                "content cannot change while a run is active".into(),
            ));
        }

        let total = items.len();
        let content: Vec<G::Item> = items
            .into_iter()
            .filter(|item| match item.check_shape() {
                Ok(()) => true,
                Err(err) => {
                    debug!(game = G::KIND.slug(), key = %item.key(), error = %err, "dropping malformed item");
                    false
                }
            })
            .collect();

        let dropped = total - content.len();
        if dropped > 0 {
            warn!(game = G::KIND.slug(), dropped, kept = content.len(), "malformed content items dropped");
        }

        self.content = content;
        self.used.clear();
        self.notify();
        Ok(self.content.len())
    }

    /// Load content through `catalog` unless it is already loaded.
    pub async fn load_content(&mut self, catalog: &ContentCatalog) -> Result<usize, EngineError> {
        if !self.content.is_empty() {
            return Ok(self.content.len());
        }

        let records = match catalog.load(G::KIND).await {
            Ok(records) => records,
            Err(err) => {
                warn!(game = G::KIND.slug(), error = %err, "content provider failed");
                return Err(NotReadyReason::ContentUnavailable(err.to_string()).into());
            }
        };
        let total = records.len();
        let items: Vec<G::Item> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<G::Item>(record) {
                Ok(item) => Some(item),
                Err(err) => {
                    debug!(game = G::KIND.slug(), error = %err, "skipping undecodable record");
                    None
                }
            })
            .collect();

        if items.len() < total {
            warn!(
                game = G::KIND.slug(),
                skipped = total - items.len(),
                "records did not match the expected shape"
            );
        }

        let kept = self.set_content(items)?;
        if kept == 0 {
            return Err(NotReadyReason::ContentMissing.into());
        }
        info!(game = G::KIND.slug(), items = kept, "content loaded");
        Ok(kept)
    }

    /// Apply a partial settings update, validated as a whole.
    ///
    /// Settings are fixed while a run is active.
    pub fn update_settings<F>(&mut self, update: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut G::Settings),
    {
        if self.machine.status().is_active() {
            return Err(EngineError::InvalidInput(
                "settings cannot change while a run is active".into(),
            ));
        }

        let mut next = self.settings.clone();
        update(&mut next);
        next.validate()?;

        self.settings = next;
        if self.machine.status() == SessionStatus::Idle {
            self.timer.preset(self.settings.countdown_ticks());
        }
        debug!(game = G::KIND.slug(), settings = ?self.settings, "settings updated");
        self.notify();
        Ok(())
    }

    /// Begin a fresh run, resetting any previous one.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.destroyed {
            return Err(EngineError::InvalidInput("session destroyed".into()));
        }
        if self.content.is_empty() {
            return Err(NotReadyReason::ContentMissing.into());
        }
        self.rules.check_ready(&self.settings)?;

        if self.machine.status() != SessionStatus::Idle {
            let _ = self.machine.apply(SessionEvent::Reset);
        }
        self.clear_run();

        if let Err(err) = self.machine.apply(SessionEvent::Start) {
            debug!(error = %err, "start rejected");
            return Ok(());
        }

        info!(session_id = %self.id, game = G::KIND.slug(), "session started");
        let step = self.run_hook(|rules, ctx| rules.begin(ctx));
        if !self.apply_step(step) {
            self.notify();
        }
        Ok(())
    }

    /// Feed one player action. Returns whether it had an effect.
    ///
    /// Actions are ignored unless the run is playing.
    pub fn process_action(&mut self, action: G::Action) -> bool {
        if self.destroyed || self.machine.status() != SessionStatus::Playing {
            trace!(game = G::KIND.slug(), status = ?self.machine.status(), ?action, "action ignored");
            return false;
        }

        let step = self.run_hook(|rules, ctx| rules.act(action, ctx));
        self.apply_step(step)
    }

    /// Move past a reveal or a pending transition.
    pub fn advance(&mut self) -> bool {
        if self.destroyed
            || !matches!(
                self.machine.status(),
                SessionStatus::RevealingAnswer | SessionStatus::AwaitingTransition
            )
        {
            return false;
        }

        let step = self.run_hook(|rules, ctx| rules.advance(ctx));
        self.apply_step(step)
    }

    /// Pause a playing run or resume a paused one, keeping the time left.
    pub fn toggle_pause(&mut self) -> bool {
        if self.destroyed {
            return false;
        }

        match self.machine.status() {
            SessionStatus::Playing if self.rules.can_pause() => {
                self.resume_timer = self.timer.is_running();
                self.timer.stop();
                let _ = self.machine.apply(SessionEvent::Pause);
                debug!(session_id = %self.id, time_left = self.timer.remaining(), "session paused");
            }
            SessionStatus::Paused => {
                let _ = self.machine.apply(SessionEvent::Resume);
                if std::mem::take(&mut self.resume_timer) {
                    self.timer.resume();
                }
                debug!(session_id = %self.id, time_left = self.timer.remaining(), "session resumed");
            }
            _ => return false,
        }

        self.notify();
        true
    }

    /// Finish the active run early.
    pub fn end(&mut self) -> bool {
        if self.destroyed || !self.machine.status().is_active() {
            return false;
        }
        self.finish(FinishReason::Ended)
    }

    /// Deliver one countdown tick.
    pub fn tick(&mut self) {
        if self.destroyed || !self.timer.is_running() {
            return;
        }

        let step = match self.timer.tick() {
            TickOutcome::Idle => return,
            TickOutcome::Ticked { .. } => self.run_hook(|rules, ctx| rules.on_tick(ctx)),
            TickOutcome::Expired => {
                debug!(session_id = %self.id, game = G::KIND.slug(), "countdown expired");
                self.run_hook(|rules, ctx| rules.on_expire(ctx))
            }
        };

        if !self.apply_step(step) {
            self.notify();
        }
    }

    /// Return to idle, keeping content and settings.
    pub fn reset(&mut self) {
        if self.destroyed {
            return;
        }

        self.clear_run();
        let _ = self.machine.apply(SessionEvent::Reset);
        self.timer.preset(self.settings.countdown_ticks());
        debug!(session_id = %self.id, "session reset");
        self.notify();
    }

    /// Stop the timer and drop every listener. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.timer.stop();
        self.listeners.clear();
        self.destroyed = true;
        debug!(session_id = %self.id, "session destroyed");
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionSnapshot<G::Settings, G::View> {
        let machine = self.machine.snapshot();
        SessionSnapshot {
            id: self.id,
            game: G::KIND,
            status: machine.status,
            version: machine.version,
            finish_reason: machine.finish_reason,
            time_left: self.timer.remaining(),
            duration: self.timer.duration(),
            timer_running: self.timer.is_running(),
            progress: self.progress,
            content_len: self.content.len(),
            settings: self.settings.clone(),
            view: self.rules.view(),
        }
    }

    /// Mutable access for game-specific session methods.
    pub(crate) fn rules_mut(&mut self) -> &mut G {
        &mut self.rules
    }

    /// Notify listeners after a game-specific mutation.
    pub(crate) fn changed(&self) {
        self.notify();
    }

    fn clear_run(&mut self) {
        self.timer.stop();
        self.progress = Progress::default();
        self.used.clear();
        self.rules.clear();
        self.resume_timer = false;
        self.recorded = false;
    }

    fn run_hook<R>(&mut self, hook: impl FnOnce(&mut G, &mut RuleContext<'_, G>) -> R) -> R {
        let status = self.machine.status();
        let mut ctx = RuleContext {
            settings: &self.settings,
            content: &self.content,
            used: &mut self.used,
            progress: &mut self.progress,
            timer: &mut self.timer,
            rng: &mut self.rng,
            status,
        };
        hook(&mut self.rules, &mut ctx)
    }

    /// Apply the outcome of a hook. Returns whether listeners were notified.
    fn apply_step(&mut self, step: Step) -> bool {
        let event = match step {
            Step::Ignored => return false,
            Step::Updated => {
                self.notify();
                return true;
            }
            Step::Finish(reason) => return self.finish(reason),
            Step::Reveal => SessionEvent::Reveal,
            Step::Continue => SessionEvent::Continue,
            Step::AwaitTransition => {
                self.timer.stop();
                SessionEvent::AwaitTransition
            }
        };

        // Continue while already playing only refreshes the current item.
        let redundant = event == SessionEvent::Continue && self.machine.status() == SessionStatus::Playing;
        if !redundant {
            if let Err(err) = self.machine.apply(event) {
                debug!(session_id = %self.id, error = %err, "transition ignored");
            }
        }
        self.notify();
        true
    }

    fn finish(&mut self, reason: FinishReason) -> bool {
        self.timer.stop();
        if let Err(err) = self.machine.apply(SessionEvent::Finish(reason)) {
            debug!(session_id = %self.id, error = %err, "finish ignored");
            return false;
        }

        info!(
            session_id = %self.id,
            game = G::KIND.slug(),
            ?reason,
            score = self.progress.score,
            answered = self.progress.answered,
            "session finished"
        );
        self.save_record();
        self.notify();
        true
    }

    fn save_record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;

        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let draft = self.rules.summarize(&self.progress, &self.settings);
        let record = GameRecord::from_draft(G::KIND, draft);
        let record_id = record.id.clone();
        match sink.save_result(record) {
            Ok(()) => debug!(session_id = %self.id, record_id, "record saved"),
            Err(err) => warn!(session_id = %self.id, error = %err, "failed to save game record"),
        }
    }

    fn notify(&self) {
        if self.destroyed {
            return;
        }
        self.listeners.notify();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        dao::records::MemoryRecordSink,
        games::who_am_i::{Person, WhoAmI, WhoAmIAction},
    };

    fn people() -> Vec<Person> {
        ["Freud", "Jung", "Adler", "Piaget", "Skinner"]
            .into_iter()
            .map(|name| Person::new(name, "theorists"))
            .collect()
    }

    fn session() -> Session<WhoAmI> {
        let mut session = Session::new(WhoAmI::default()).with_seed(11);
        session.set_content(people()).unwrap();
        session
    }

    #[test]
    fn start_without_content_is_not_ready() {
        let mut session = Session::new(WhoAmI::default());
        let err = session.start().unwrap_err();
        assert!(matches!(err, EngineError::NotReady(NotReadyReason::ContentMissing)));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn actions_are_ignored_unless_playing() {
        let mut session = session();
        assert!(!session.process_action(WhoAmIAction::Correct));
        assert_eq!(session.progress().score, 0);

        session.start().unwrap();
        assert!(session.toggle_pause());
        assert!(!session.process_action(WhoAmIAction::Correct));
        assert_eq!(session.progress().score, 0);

        assert!(session.toggle_pause());
        assert!(session.process_action(WhoAmIAction::Correct));
        assert_eq!(session.progress().score, 1);
    }

    #[test]
    fn pause_then_resume_keeps_time_left() {
        let mut session = session();
        session.start().unwrap();
        session.tick();
        session.tick();
        let before = session.time_left();

        session.toggle_pause();
        session.tick();
        assert_eq!(session.time_left(), before);
        assert!(!session.timer_running());

        session.toggle_pause();
        assert_eq!(session.time_left(), before);
        assert!(session.timer_running());
    }

    #[test]
    fn listeners_run_after_each_mutation() {
        let mut session = session();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = session.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.start().unwrap();
        let after_start = calls.load(Ordering::SeqCst);
        assert!(after_start >= 1);

        session.process_action(WhoAmIAction::Pass);
        assert_eq!(calls.load(Ordering::SeqCst), after_start + 1);

        assert!(session.remove_listener(id));
        session.process_action(WhoAmIAction::Pass);
        assert_eq!(calls.load(Ordering::SeqCst), after_start + 1);
    }

    #[test]
    fn expiry_finishes_and_saves_one_record() {
        let sink = Arc::new(MemoryRecordSink::new());
        let mut session = session().with_record_sink(sink.clone());
        session.update_settings(|settings| settings.duration = 3).unwrap();
        session.start().unwrap();
        session.process_action(WhoAmIAction::Correct);

        for _ in 0..5 {
            session.tick();
        }
        assert_eq!(session.status(), SessionStatus::Finished);
        assert_eq!(session.finish_reason(), Some(FinishReason::TimeUp));
        assert!(!session.end());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].game_type, GameKind::WhoAmI);
    }

    #[test]
    fn settings_are_validated_and_frozen_while_active() {
        let mut session = session();
        let err = session.update_settings(|settings| settings.duration = 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSettings(_)));

        session.update_settings(|settings| settings.duration = 45).unwrap();
        assert_eq!(session.time_left(), 45);

        session.start().unwrap();
        assert!(session.update_settings(|settings| settings.duration = 30).is_err());
        assert_eq!(session.settings().duration, 45);
    }

    #[test]
    fn reset_keeps_content_and_restart_resets_progress() {
        let mut session = session();
        session.start().unwrap();
        session.process_action(WhoAmIAction::Correct);
        session.start().unwrap();
        assert_eq!(session.progress().score, 0);
        assert_eq!(session.status(), SessionStatus::Playing);

        session.reset();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.content().len(), 5);
        assert!(!session.timer_running());
    }

    #[test]
    fn destroy_silences_the_session() {
        let mut session = session();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        session.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        session.start().unwrap();
        let seen = calls.load(Ordering::SeqCst);

        session.destroy();
        session.destroy();
        assert!(session.is_destroyed());
        assert!(!session.timer_running());
        assert!(!session.process_action(WhoAmIAction::Correct));
        session.tick();
        session.reset();
        assert!(matches!(session.start(), Err(EngineError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn content_is_frozen_while_a_run_is_active() {
        let mut session = session();
        session.start().unwrap();

        let err = session.set_content(Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(session.content().len(), 5);
        assert!(session.current_person().is_some());

        session.toggle_pause();
        assert!(session.set_content(Vec::new()).is_err());

        session.end();
        assert_eq!(session.set_content(people()[..2].to_vec()).unwrap(), 2);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut session = session();
        session.start().unwrap();
        let snapshot = session.snapshot();
        session.process_action(WhoAmIAction::Correct);

        assert_eq!(snapshot.progress.score, 0);
        assert_eq!(session.snapshot().progress.score, 1);
        assert_eq!(snapshot.status, SessionStatus::Playing);
        assert_eq!(snapshot.game, GameKind::WhoAmI);
    }
}
