//! Countdown timer shared by every game, plus the tick sources that drive it.
//!
//! The countdown itself is a plain counter. Wall-clock ticking is delegated to a
//! [`Scheduler`]: [`ManualScheduler`] for deterministic tests and headless hosts
//! that call [`crate::state::Session::tick`] themselves, and [`TokioScheduler`]
//! which spawns an interval task and hands ticks to a [`TickStream`].

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::trace;

/// Default period between two ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Result of feeding one tick to a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The countdown is not running; the tick was discarded.
    Idle,
    /// The counter was decremented and is still above zero.
    Ticked {
        /// Ticks left after this one.
        remaining: u32,
    },
    /// The counter reached zero; the countdown stopped itself.
    Expired,
}

/// Pure countdown counter without any notion of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    remaining: u32,
    duration: u32,
    running: bool,
}

impl Countdown {
    /// Load a fresh counter without starting it.
    pub fn preset(&mut self, ticks: u32) {
        self.duration = ticks;
        self.remaining = ticks;
        self.running = false;
    }

    /// Load a fresh counter and mark it running.
    pub fn arm(&mut self, ticks: u32) {
        self.preset(ticks);
        self.running = ticks > 0;
    }

    /// Resume counting from the current remaining value.
    pub fn resume(&mut self) {
        self.running = self.remaining > 0;
    }

    /// Stop counting, keeping the remaining value.
    pub fn halt(&mut self) {
        self.running = false;
    }

    /// Apply one tick.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Ticked {
                remaining: self.remaining,
            }
        }
    }

    /// Ticks left before expiry.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Length of the current run in ticks.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Ticks already consumed in the current run.
    pub fn elapsed(&self) -> u32 {
        self.duration - self.remaining
    }

    /// Whether ticks are currently being counted.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Source of periodic ticks for a [`CountdownTimer`].
///
/// Implementations only decide *when* ticks are produced. Delivering the tick
/// to the session is the host's job (see [`crate::services::driver`]).
pub trait Scheduler: Send {
    /// Begin producing a tick every `period`, cancelling any previous run.
    fn start(&mut self, period: Duration);
    /// Cancel pending ticks. Idempotent.
    fn stop(&mut self);
    /// Whether ticks are currently being produced.
    fn is_running(&self) -> bool;
}

/// Scheduler that produces no ticks on its own.
///
/// Used as a fake clock: the caller advances time by invoking
/// [`crate::state::Session::tick`] directly.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    period: Option<Duration>,
    starts: usize,
}

impl ManualScheduler {
    /// Build a stopped manual scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Period of the current run, if any.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// How many times [`Scheduler::start`] was called.
    pub fn starts(&self) -> usize {
        self.starts
    }
}

impl Scheduler for ManualScheduler {
    fn start(&mut self, period: Duration) {
        self.period = Some(period);
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.period = None;
    }

    fn is_running(&self) -> bool {
        self.period.is_some()
    }
}

/// Tick message produced by a [`TokioScheduler`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerTick {
    generation: u64,
}

/// Scheduler backed by a spawned `tokio::time::interval` task.
///
/// Every run gets its own generation number; [`TokioScheduler::stop`] bumps the
/// generation so that ticks already sitting in the channel are discarded by the
/// paired [`TickStream`].
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerTick>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
    /// Wall-clock factor applied to every requested period.
    scale: f64,
}

/// Receiving half of a [`TokioScheduler`], yielding only ticks of the live run.
pub struct TickStream {
    rx: mpsc::UnboundedReceiver<TimerTick>,
    generation: Arc<AtomicU64>,
}

/// Build a tokio-backed scheduler and the stream its ticks are delivered on.
pub fn tokio_scheduler() -> (TokioScheduler, TickStream) {
    tokio_scheduler_with_second(DEFAULT_TICK_INTERVAL)
}

/// Like [`tokio_scheduler`], but a nominal one-second tick lasts `second`.
///
/// Periods are scaled proportionally, so sub-second display ticks keep their
/// ratio to the session clock. A zero `second` falls back to real time.
pub fn tokio_scheduler_with_second(second: Duration) -> (TokioScheduler, TickStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let generation = Arc::new(AtomicU64::new(0));
    let scale = if second.is_zero() {
        1.0
    } else {
        second.as_secs_f64() / DEFAULT_TICK_INTERVAL.as_secs_f64()
    };
    (
        TokioScheduler {
            tx,
            generation: generation.clone(),
            task: None,
            scale,
        },
        TickStream { rx, generation },
    )
}

impl Scheduler for TokioScheduler {
    /// Spawn the interval task. Must be called from within a tokio runtime.
    fn start(&mut self, period: Duration) {
        self.stop();
        let period = period.mul_f64(self.scale);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let tx = self.tx.clone();

        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(TimerTick { generation }).is_err() {
                    break;
                }
            }
        }));
        trace!(generation, ?period, "timer task started");
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.generation.fetch_add(1, Ordering::AcqRel);
            trace!("timer task stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TickStream {
    /// Wait for the next tick of the live run.
    ///
    /// Returns `None` once the scheduler has been dropped.
    pub async fn recv(&mut self) -> Option<()> {
        loop {
            let tick = self.rx.recv().await?;
            if tick.generation == self.generation.load(Ordering::Acquire) {
                return Some(());
            }
            trace!(generation = tick.generation, "discarding stale tick");
        }
    }
}

/// Countdown paired with the scheduler producing its ticks.
///
/// Owned exclusively by a session, which guarantees a single live timer.
pub struct CountdownTimer {
    countdown: Countdown,
    scheduler: Box<dyn Scheduler>,
    interval: Duration,
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("countdown", &self.countdown)
            .field("interval", &self.interval)
            .field("scheduled", &self.scheduler.is_running())
            .finish()
    }
}

impl CountdownTimer {
    /// Wrap a scheduler with an idle countdown.
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            countdown: Countdown::default(),
            scheduler,
            interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Start a new run of `ticks` ticks spaced by `interval`, cancelling the previous one.
    pub fn start(&mut self, ticks: u32, interval: Duration) {
        self.scheduler.stop();
        self.interval = interval;
        self.countdown.arm(ticks);
        if self.countdown.is_running() {
            self.scheduler.start(interval);
        }
    }

    /// Cancel pending ticks, keeping the remaining counter.
    pub fn stop(&mut self) {
        self.countdown.halt();
        self.scheduler.stop();
    }

    /// Restart ticking from the remaining counter with the last interval.
    pub fn resume(&mut self) {
        self.scheduler.stop();
        self.countdown.resume();
        if self.countdown.is_running() {
            self.scheduler.start(self.interval);
        }
    }

    /// Stop and load a counter for display without running it.
    pub fn preset(&mut self, ticks: u32) {
        self.scheduler.stop();
        self.countdown.preset(ticks);
    }

    /// Feed one tick from the scheduler.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Expired {
            self.scheduler.stop();
        }
        outcome
    }

    /// Ticks left in the current run.
    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    /// Length of the current run.
    pub fn duration(&self) -> u32 {
        self.countdown.duration()
    }

    /// Ticks consumed in the current run.
    pub fn elapsed(&self) -> u32 {
        self.countdown.elapsed()
    }

    /// Period between ticks of the current run.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the countdown is live.
    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_tick_countdown_expires_exactly_once() {
        let mut countdown = Countdown::default();
        countdown.arm(5);

        let outcomes: Vec<_> = (0..6).map(|_| countdown.tick()).collect();
        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Ticked { remaining: 4 },
                TickOutcome::Ticked { remaining: 3 },
                TickOutcome::Ticked { remaining: 2 },
                TickOutcome::Ticked { remaining: 1 },
                TickOutcome::Expired,
                TickOutcome::Idle,
            ]
        );
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn zero_length_countdown_never_runs() {
        let mut countdown = Countdown::default();
        countdown.arm(0);
        assert!(!countdown.is_running());
        assert_eq!(countdown.tick(), TickOutcome::Idle);
    }

    #[test]
    fn halt_and_resume_keep_remaining() {
        let mut countdown = Countdown::default();
        countdown.arm(10);
        countdown.tick();
        countdown.tick();
        countdown.halt();
        assert_eq!(countdown.tick(), TickOutcome::Idle);
        countdown.resume();
        assert_eq!(countdown.tick(), TickOutcome::Ticked { remaining: 7 });
        assert_eq!(countdown.elapsed(), 3);
    }

    #[test]
    fn timer_stop_is_idempotent_and_cancels_schedule() {
        let mut timer = CountdownTimer::new(Box::new(ManualScheduler::new()));
        timer.start(3, Duration::from_millis(500));
        assert!(timer.is_running());
        assert_eq!(timer.interval(), Duration::from_millis(500));

        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.tick(), TickOutcome::Idle);
        assert_eq!(timer.remaining(), 3);
    }

    #[test]
    fn restarting_replaces_the_previous_run() {
        let mut timer = CountdownTimer::new(Box::new(ManualScheduler::new()));
        timer.start(3, DEFAULT_TICK_INTERVAL);
        timer.tick();
        timer.start(8, DEFAULT_TICK_INTERVAL);
        assert_eq!(timer.remaining(), 8);
        assert_eq!(timer.duration(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_delivers_ticks_per_period() {
        let (mut scheduler, mut ticks) = tokio_scheduler();
        scheduler.start(Duration::from_secs(1));

        let started = Instant::now();
        ticks.recv().await.unwrap();
        ticks.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_generation_ticks_are_discarded() {
        let (mut scheduler, mut ticks) = tokio_scheduler();
        scheduler.start(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(55)).await;
        // Several ticks of the first run are now queued.
        scheduler.stop();
        scheduler.start(Duration::from_secs(5));

        let started = Instant::now();
        ticks.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn scaled_scheduler_shortens_the_period() {
        let (mut scheduler, mut ticks) = tokio_scheduler_with_second(Duration::from_millis(100));
        scheduler.start(DEFAULT_TICK_INTERVAL);

        let started = Instant::now();
        ticks.recv().await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn stream_ends_when_scheduler_is_dropped() {
        let (scheduler, mut ticks) = tokio_scheduler();
        drop(scheduler);
        assert!(ticks.recv().await.is_none());
    }
}
