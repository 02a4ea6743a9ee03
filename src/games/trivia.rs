//! Multiple-choice quiz: answer, see the feedback, then move on.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        record::{RecordDraft, RecordEntry},
        validation::{validate_exactly_one, validate_no_blank},
    },
    games::GameKind,
    services::{
        scoring::{self, ScoreInput, Scoring, Verdict},
        selector,
    },
    state::{
        FinishReason, Session,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// One answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaOption {
    /// Text shown on the button.
    #[serde(alias = "metin")]
    pub text: String,
    /// Whether this is the right answer.
    #[serde(alias = "dogruMu")]
    pub correct: bool,
}

impl TriviaOption {
    /// Build an option.
    pub fn new(text: impl Into<String>, correct: bool) -> Self {
        Self {
            text: text.into(),
            correct,
        }
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriviaQuestion {
    /// Identifier.
    pub id: String,
    /// Category label.
    #[serde(alias = "kategori", default)]
    pub category: String,
    /// Question text.
    #[serde(alias = "soru")]
    pub question: String,
    /// Options, exactly one of them correct.
    #[serde(alias = "secenekler")]
    pub options: Vec<TriviaOption>,
}

impl Validate for TriviaQuestion {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_no_blank(std::slice::from_ref(&self.question)) {
            errors.add("question", e);
        }
        let flags: Vec<bool> = self.options.iter().map(|option| option.correct).collect();
        if let Err(e) = validate_exactly_one(&flags, "single_correct_option", "correct option") {
            errors.add("options", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ContentItem for TriviaQuestion {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }
}

/// Settings of a trivia run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TriviaSettings {
    /// Questions per run (fewer when the pool is smaller).
    #[validate(range(min = 1, max = 100))]
    pub question_count: u32,
    /// Seconds per question.
    #[validate(range(min = 3, max = 300))]
    pub question_duration: u32,
    /// Points for any correct answer.
    #[validate(range(min = 1, max = 100))]
    pub points_per_correct: u32,
    /// Add one point per second left on the clock.
    pub time_bonus: bool,
}

impl Default for TriviaSettings {
    fn default() -> Self {
        Self {
            question_count: 10,
            question_duration: 15,
            points_per_correct: 5,
            time_bonus: true,
        }
    }
}

impl TriviaSettings {
    fn scoring(&self) -> Scoring {
        Scoring::TimeBonus {
            base: self.points_per_correct,
            divisor: 1,
            cap: if self.time_bonus { self.question_duration } else { 0 },
        }
    }
}

impl GameSettings for TriviaSettings {
    fn countdown_ticks(&self) -> u32 {
        self.question_duration
    }
}

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaAction {
    /// Pick the displayed option at this index.
    Select(usize),
}

/// Outcome of the current question, once revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriviaAnswer {
    /// Index picked, `None` when the clock ran out.
    pub selected: Option<usize>,
    /// Whether the pick was right.
    pub correct: bool,
    /// Points earned.
    pub points: u32,
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriviaView {
    /// Question on screen.
    pub question: Option<TriviaQuestion>,
    /// Its options, in display order.
    pub options: Vec<TriviaOption>,
    /// Question number, 1-based.
    pub number: u32,
    /// Questions in this run.
    pub total: u32,
    /// Outcome while revealed.
    pub answer: Option<TriviaAnswer>,
}

/// Trivia rules.
#[derive(Debug, Default)]
pub struct Trivia {
    questions: Vec<TriviaQuestion>,
    index: usize,
    options: Vec<TriviaOption>,
    answer: Option<TriviaAnswer>,
}

impl Trivia {
    fn present(&mut self, ctx: &mut RuleContext<'_, Self>) {
        self.answer = None;
        self.options = match self.questions.get(self.index) {
            Some(question) => selector::shuffle_options_keeping_answer(
                question.options.clone(),
                |option| option.correct,
                ctx.rng,
            ),
            None => Vec::new(),
        };
        ctx.progress.position = self.index as u32;
        ctx.start_clock(ctx.settings.question_duration);
    }
}

impl GameRules for Trivia {
    type Item = TriviaQuestion;
    type Settings = TriviaSettings;
    type Action = TriviaAction;
    type View = TriviaView;

    const KIND: GameKind = GameKind::Trivia;

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        self.questions = selector::sample(ctx.content, ctx.settings.question_count as usize, ctx.rng);
        self.index = 0;
        self.present(ctx);
        Step::Updated
    }

    fn act(&mut self, action: TriviaAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        let TriviaAction::Select(index) = action;
        if self.answer.is_some() {
            return Step::Ignored;
        }
        let Some(option) = self.options.get(index) else {
            return Step::Ignored;
        };

        let time_left = ctx.time_left();
        ctx.timer.stop();

        let verdict = if option.correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        };
        let points = ctx.settings.scoring().points(&ScoreInput {
            verdict,
            time_left,
            accuracy: None,
        });
        ctx.progress.score = scoring::apply_delta(ctx.progress.score, points);
        ctx.progress.answered += 1;
        if option.correct {
            ctx.progress.correct += 1;
        }

        self.answer = Some(TriviaAnswer {
            selected: Some(index),
            correct: option.correct,
            points: u32::try_from(points).unwrap_or(0),
        });
        Step::Reveal
    }

    fn on_expire(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        ctx.progress.answered += 1;
        self.answer = Some(TriviaAnswer {
            selected: None,
            correct: false,
            points: 0,
        });
        Step::Reveal
    }

    fn advance(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.answer.is_none() {
            return Step::Ignored;
        }
        if self.index + 1 >= self.questions.len() {
            return Step::Finish(FinishReason::QuestionsExhausted);
        }
        self.index += 1;
        self.present(ctx);
        Step::Continue
    }

    fn clear(&mut self) {
        self.questions.clear();
        self.index = 0;
        self.options.clear();
        self.answer = None;
    }

    fn view(&self) -> TriviaView {
        TriviaView {
            question: self.questions.get(self.index).cloned(),
            options: self.options.clone(),
            number: self.index as u32 + 1,
            total: self.questions.len() as u32,
            answer: self.answer,
        }
    }

    fn summarize(&self, progress: &Progress, _settings: &TriviaSettings) -> RecordDraft {
        RecordDraft {
            results: vec![
                RecordEntry::new("Player", progress.score),
                RecordEntry::new(
                    "Correct",
                    format!("{}/{}", progress.correct, self.questions.len()),
                ),
            ],
            winner: None,
        }
    }
}

impl Session<Trivia> {
    /// Answer the current question with the displayed option at `index`.
    ///
    /// Rejected once the question is revealed.
    pub fn select_answer(&mut self, index: usize) -> bool {
        self.process_action(TriviaAction::Select(index))
    }

    /// Move on after the feedback was shown.
    pub fn next_question(&mut self) -> bool {
        self.advance()
    }

    /// Options of the current question, in display order.
    pub fn options(&self) -> &[TriviaOption] {
        &self.rules().options
    }
}
