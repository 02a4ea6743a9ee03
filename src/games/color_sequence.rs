//! Show-then-recall color sequence memory game.
//!
//! The sequence is displayed by the session countdown: each color is lit for
//! `show_ticks` ticks followed by `gap_ticks` dark ticks. When the countdown
//! expires the player repeats the sequence. A completed sequence waits in
//! [`SessionStatus::AwaitingTransition`] until [`Session::next_level`].

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::record::{RecordDraft, RecordEntry},
    games::GameKind,
    state::{
        FinishReason, Session, SessionStatus,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// Colors of the pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// Blue pad.
    Blue,
    /// Green pad.
    Green,
    /// Red pad.
    Red,
    /// Yellow pad.
    Yellow,
}

impl Color {
    /// The default palette.
    pub const ALL: [Color; 4] = [Color::Blue, Color::Green, Color::Red, Color::Yellow];
}

impl ContentItem for Color {
    fn key(&self) -> String {
        format!("{self:?}")
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Settings of a color-sequence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ColorSequenceSettings {
    /// Length of one display tick, in milliseconds.
    #[validate(range(min = 50, max = 5000))]
    pub tick_ms: u64,
    /// Ticks a color stays lit.
    #[validate(range(min = 1, max = 20))]
    pub show_ticks: u32,
    /// Dark ticks between two colors.
    #[validate(range(max = 20))]
    pub gap_ticks: u32,
    /// Length of the first sequence.
    #[validate(range(min = 1, max = 20))]
    pub start_length: u32,
    /// Mistakes allowed before the run ends.
    #[validate(range(min = 1, max = 10))]
    pub max_lives: u32,
}

impl Default for ColorSequenceSettings {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            show_ticks: 4,
            gap_ticks: 1,
            start_length: 3,
            max_lives: 3,
        }
    }
}

impl ColorSequenceSettings {
    fn slot_ticks(&self) -> u32 {
        self.show_ticks + self.gap_ticks
    }
}

impl GameSettings for ColorSequenceSettings {}

/// Sub-phase of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPhase {
    /// No run yet.
    #[default]
    Ready,
    /// The sequence is being shown; input is ignored.
    Showing,
    /// The player repeats the sequence.
    Recall,
    /// The whole sequence was repeated.
    LevelComplete,
    /// No lives left.
    GameOver,
}

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorAction {
    /// Press a pad.
    Select(Color),
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorSequenceView {
    /// Current level, 1-based.
    pub level: u32,
    /// Sequence to repeat.
    pub sequence: Vec<Color>,
    /// Pads pressed so far in this attempt.
    pub input: Vec<Color>,
    /// Index of the lit color while showing.
    pub showing_index: Option<usize>,
    /// Sub-phase.
    pub phase: ColorPhase,
    /// Mistakes left.
    pub lives: u32,
    /// Best score since the rules were created.
    pub highest_score: u32,
}

/// Color-sequence rules.
#[derive(Debug, Default)]
pub struct ColorSequence {
    level: u32,
    sequence: Vec<Color>,
    input: Vec<Color>,
    showing_index: Option<usize>,
    phase: ColorPhase,
    lives: u32,
    highest_score: u32,
}

impl ColorSequence {
    fn random_color(ctx: &mut RuleContext<'_, Self>) -> Option<Color> {
        if ctx.content.is_empty() {
            return None;
        }
        Some(ctx.content[ctx.rng.random_range(0..ctx.content.len())])
    }

    fn show_sequence(&mut self, ctx: &mut RuleContext<'_, Self>) {
        self.input.clear();
        self.phase = ColorPhase::Showing;
        self.showing_index = if self.sequence.is_empty() { None } else { Some(0) };

        let ticks = self.sequence.len() as u32 * ctx.settings.slot_ticks();
        ctx.start_clock_with(ticks, Duration::from_millis(ctx.settings.tick_ms));
    }

    fn lit_index(&self, elapsed: u32, settings: &ColorSequenceSettings) -> Option<usize> {
        let slot = elapsed / settings.slot_ticks();
        let within = elapsed % settings.slot_ticks();
        let slot = slot as usize;
        (within < settings.show_ticks && slot < self.sequence.len()).then_some(slot)
    }
}

impl GameRules for ColorSequence {
    type Item = Color;
    type Settings = ColorSequenceSettings;
    type Action = ColorAction;
    type View = ColorSequenceView;

    const KIND: GameKind = GameKind::ColorSequence;

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        self.level = 1;
        self.lives = ctx.settings.max_lives;
        self.sequence = (0..ctx.settings.start_length)
            .filter_map(|_| Self::random_color(ctx))
            .collect();
        ctx.progress.round = self.level;
        self.show_sequence(ctx);
        Step::Updated
    }

    fn act(&mut self, action: ColorAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        let ColorAction::Select(color) = action;
        if self.phase != ColorPhase::Recall {
            return Step::Ignored;
        }
        let Some(&expected) = self.sequence.get(self.input.len()) else {
            return Step::Ignored;
        };

        if color != expected {
            self.lives = self.lives.saturating_sub(1);
            if self.lives == 0 {
                self.phase = ColorPhase::GameOver;
                return Step::Finish(FinishReason::OutOfLives);
            }
            self.show_sequence(ctx);
            return Step::Updated;
        }

        self.input.push(color);
        ctx.progress.answered += 1;
        if self.input.len() < self.sequence.len() {
            return Step::Updated;
        }

        ctx.progress.correct += 1;
        ctx.progress.score = self.level + 1;
        self.highest_score = self.highest_score.max(ctx.progress.score);
        self.phase = ColorPhase::LevelComplete;
        Step::AwaitTransition
    }

    fn on_tick(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.phase == ColorPhase::Showing {
            self.showing_index = self.lit_index(ctx.timer.elapsed(), ctx.settings);
        }
        Step::Updated
    }

    fn on_expire(&mut self, _ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.phase != ColorPhase::Showing {
            return Step::Ignored;
        }
        self.showing_index = None;
        self.phase = ColorPhase::Recall;
        Step::Updated
    }

    fn advance(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.phase != ColorPhase::LevelComplete {
            return Step::Ignored;
        }
        let Some(color) = Self::random_color(ctx) else {
            return Step::Ignored;
        };

        self.level += 1;
        ctx.progress.round = self.level;
        self.sequence.push(color);
        self.show_sequence(ctx);
        Step::Continue
    }

    fn can_pause(&self) -> bool {
        self.phase != ColorPhase::Showing
    }

    fn clear(&mut self) {
        let highest_score = self.highest_score;
        *self = Self {
            highest_score,
            ..Self::default()
        };
    }

    fn view(&self) -> ColorSequenceView {
        ColorSequenceView {
            level: self.level,
            sequence: self.sequence.clone(),
            input: self.input.clone(),
            showing_index: self.showing_index,
            phase: self.phase,
            lives: self.lives,
            highest_score: self.highest_score,
        }
    }

    fn summarize(&self, progress: &Progress, _settings: &ColorSequenceSettings) -> RecordDraft {
        RecordDraft {
            results: vec![
                RecordEntry::new("Player", progress.score),
                RecordEntry::new("Level", self.level),
            ],
            winner: None,
        }
    }
}

impl Session<ColorSequence> {
    /// Load the four default pads as content. Kept as-is while a run is active.
    pub fn with_default_palette(mut self) -> Self {
        if let Err(err) = self.set_content(Color::ALL.to_vec()) {
            warn!(error = %err, "default palette not applied");
        }
        self
    }

    /// Press a pad during recall.
    pub fn select_color(&mut self, color: Color) -> bool {
        self.process_action(ColorAction::Select(color))
    }

    /// Start the next, one color longer, level.
    pub fn next_level(&mut self) -> bool {
        self.advance()
    }

    /// Sequence of the current level.
    pub fn sequence(&self) -> &[Color] {
        &self.rules().sequence
    }

    /// Whether the sequence is being displayed.
    pub fn is_showing(&self) -> bool {
        self.rules().phase == ColorPhase::Showing
    }

    /// Whether the player may press pads.
    pub fn is_user_turn(&self) -> bool {
        self.status() == SessionStatus::Playing && self.rules().phase == ColorPhase::Recall
    }

    /// Best score seen by this session.
    pub fn highest_score(&self) -> u32 {
        self.rules().highest_score
    }
}
