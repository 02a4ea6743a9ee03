//! Numeric estimation: the closer the guess, the more points.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        record::{RecordDraft, RecordEntry},
        validation::{validate_no_blank, validate_range_contains},
    },
    games::GameKind,
    services::{
        scoring::{self, RunningAverage, ScoreInput, Scoring, Verdict},
        selector,
    },
    state::{
        FinishReason, Session,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// A question whose answer is a number within a declared range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationQuestion {
    /// Identifier.
    pub id: String,
    /// Question text.
    pub question: String,
    /// True value.
    pub answer: f64,
    /// Unit shown next to the value.
    #[serde(default)]
    pub unit: String,
    /// Lowest plausible value.
    pub min: f64,
    /// Highest plausible value.
    pub max: f64,
    /// Shown after answering.
    #[serde(default)]
    pub explanation: String,
    /// Where the figure comes from.
    #[serde(default)]
    pub source: String,
    /// Link to the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Validate for EstimationQuestion {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_no_blank(std::slice::from_ref(&self.question)) {
            errors.add("question", e);
        }
        if let Err(e) = validate_range_contains(self.min, self.max, self.answer) {
            errors.add("answer", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ContentItem for EstimationQuestion {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }
}

/// Settings of an estimation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EstimationSettings {
    /// Seconds per question.
    #[validate(range(min = 5, max = 600))]
    pub question_duration: u32,
    /// Factor applied to the accuracy points.
    #[validate(range(min = 0.1, max = 10.0))]
    pub score_multiplier: f64,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            question_duration: 30,
            score_multiplier: 1.0,
        }
    }
}

impl GameSettings for EstimationSettings {
    fn countdown_ticks(&self) -> u32 {
        self.question_duration
    }
}

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimationAction {
    /// Submit a numeric guess.
    Guess(f64),
}

/// Scored outcome of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationResult {
    /// Value submitted.
    pub guess: f64,
    /// True value.
    pub answer: f64,
    /// Accuracy, 0..=100.
    pub accuracy: u32,
    /// Points earned.
    pub points: u32,
    /// Whether the clock ran out and the midpoint was submitted.
    pub auto_submitted: bool,
    /// Explanation of the answer.
    pub explanation: String,
    /// Source of the figure.
    pub source: String,
    /// Link to the source.
    pub link: Option<String>,
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationView {
    /// Question on screen.
    pub question: Option<EstimationQuestion>,
    /// Result while revealed.
    pub result: Option<EstimationResult>,
    /// Average accuracy so far.
    pub average_accuracy: u32,
    /// Question number, 1-based.
    pub number: u32,
    /// Questions in this run.
    pub total: u32,
}

/// Estimation rules.
#[derive(Debug, Default)]
pub struct Estimation {
    questions: Vec<EstimationQuestion>,
    index: usize,
    result: Option<EstimationResult>,
    average: RunningAverage,
}

impl Estimation {
    fn present(&mut self, ctx: &mut RuleContext<'_, Self>) {
        self.result = None;
        ctx.progress.position = self.index as u32;
        ctx.start_clock(ctx.settings.question_duration);
    }

    fn submit(&mut self, guess: f64, auto_submitted: bool, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.result.is_some() {
            return Step::Ignored;
        }
        let Some(question) = self.questions.get(self.index) else {
            return Step::Ignored;
        };
        ctx.timer.stop();

        let accuracy = scoring::accuracy(guess, question.answer, question.min, question.max);
        let strategy = Scoring::Proximity {
            multiplier: ctx.settings.score_multiplier,
        };
        let points = strategy.points(&ScoreInput {
            verdict: Verdict::Correct,
            time_left: ctx.time_left(),
            accuracy: Some(accuracy),
        });

        ctx.progress.score = scoring::apply_delta(ctx.progress.score, points);
        ctx.progress.answered += 1;
        self.average.push(accuracy);

        self.result = Some(EstimationResult {
            guess,
            answer: question.answer,
            accuracy,
            points: u32::try_from(points).unwrap_or(0),
            auto_submitted,
            explanation: question.explanation.clone(),
            source: question.source.clone(),
            link: question.link.clone(),
        });
        Step::Reveal
    }
}

impl GameRules for Estimation {
    type Item = EstimationQuestion;
    type Settings = EstimationSettings;
    type Action = EstimationAction;
    type View = EstimationView;

    const KIND: GameKind = GameKind::Estimation;

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        self.questions = selector::shuffle(ctx.content.to_vec(), ctx.rng);
        self.index = 0;
        self.average = RunningAverage::default();
        self.present(ctx);
        Step::Updated
    }

    fn act(&mut self, action: EstimationAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        let EstimationAction::Guess(guess) = action;
        if !guess.is_finite() {
            return Step::Ignored;
        }
        self.submit(guess, false, ctx)
    }

    fn on_expire(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        let Some(question) = self.questions.get(self.index) else {
            return Step::Ignored;
        };
        let guess = scoring::midpoint(question.min, question.max);
        self.submit(guess, true, ctx)
    }

    fn advance(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.result.is_none() {
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
        *self = Self::default();
    }

    fn view(&self) -> EstimationView {
        EstimationView {
            question: self.questions.get(self.index).cloned(),
            result: self.result.clone(),
            average_accuracy: self.average.value(),
            number: self.index as u32 + 1,
            total: self.questions.len() as u32,
        }
    }

    fn summarize(&self, progress: &Progress, _settings: &EstimationSettings) -> RecordDraft {
        RecordDraft {
            results: vec![
                RecordEntry::new("Player", progress.score),
                RecordEntry::new("Average accuracy", format!("{}%", self.average.value())),
            ],
            winner: None,
        }
    }
}

impl Session<Estimation> {
    /// Submit a guess for the current question.
    pub fn submit_guess(&mut self, guess: f64) -> bool {
        self.process_action(EstimationAction::Guess(guess))
    }

    /// Move on after the result was shown.
    pub fn next_question(&mut self) -> bool {
        self.advance()
    }

    /// Result of the current question, once revealed.
    pub fn last_result(&self) -> Option<&EstimationResult> {
        self.rules().result.as_ref()
    }

    /// Average accuracy over the answered questions.
    pub fn average_accuracy(&self) -> u32 {
        self.rules().average.value()
    }
}
