//! Classify short clinical vignettes against a session-wide clock.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        record::{RecordDraft, RecordEntry},
        validation::{validate_listed, validate_no_blank},
    },
    error::NotReadyReason,
    games::GameKind,
    services::scoring::{self, Verdict},
    state::{
        FinishReason, Session,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// Family of concepts a case illustrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    /// Defense mechanisms.
    #[serde(alias = "savunma_mekanizmasi")]
    DefenseMechanism,
    /// Cognitive distortions.
    #[serde(alias = "bilissel_carpitma")]
    CognitiveDistortion,
    /// Maladaptive schemas.
    #[serde(alias = "uyumsuz_sema")]
    MaladaptiveSchema,
}

/// One vignette with its multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectiveCase {
    /// Identifier.
    pub id: u32,
    /// Family of the expected answer.
    #[serde(rename = "type")]
    pub kind: CaseKind,
    /// Vignette.
    pub case_text: String,
    /// Question about the vignette.
    pub question: String,
    /// Possible answers.
    pub options: Vec<String>,
    /// Expected answer, one of `options`.
    pub correct_answer: String,
    /// Shown after answering.
    #[serde(default)]
    pub explanation: String,
}

impl Validate for DetectiveCase {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_no_blank(std::slice::from_ref(&self.case_text)) {
            errors.add("case_text", e);
        }
        if let Err(e) = validate_no_blank(&self.options) {
            errors.add("options", e);
        }
        if let Err(e) = validate_listed(&self.options, &self.correct_answer) {
            errors.add("correct_answer", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ContentItem for DetectiveCase {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }
}

/// Settings of a case-detective run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CaseDetectiveSettings {
    /// Family of cases to play; required before starting.
    pub kind: Option<CaseKind>,
    /// Length of the run in seconds.
    #[validate(range(min = 10, max = 3600))]
    pub duration: u32,
    /// Score that ends the run.
    #[validate(range(min = 1, max = 1000))]
    pub target_score: u32,
}

impl Default for CaseDetectiveSettings {
    fn default() -> Self {
        Self {
            kind: None,
            duration: 300,
            target_score: 10,
        }
    }
}

impl GameSettings for CaseDetectiveSettings {
    fn countdown_ticks(&self) -> u32 {
        self.duration
    }
}

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseAction {
    /// Pick the option at this index.
    Answer(usize),
}

/// Feedback for the answered case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseFeedback {
    /// Option the player picked.
    pub selected: String,
    /// Whether it was the expected one.
    pub correct: bool,
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseDetectiveView {
    /// Case on screen.
    pub current: Option<DetectiveCase>,
    /// Feedback while the answer is revealed.
    pub feedback: Option<CaseFeedback>,
}

/// Case-detective rules.
#[derive(Debug, Default)]
pub struct CaseDetective {
    current: Option<DetectiveCase>,
    feedback: Option<CaseFeedback>,
}

impl CaseDetective {
    fn next_case(&mut self, ctx: &mut RuleContext<'_, Self>) {
        let kind = ctx.settings.kind;
        self.feedback = None;
        self.current = ctx.pick_next_where(|case| Some(case.kind) == kind);
    }
}

impl GameRules for CaseDetective {
    type Item = DetectiveCase;
    type Settings = CaseDetectiveSettings;
    type Action = CaseAction;
    type View = CaseDetectiveView;

    const KIND: GameKind = GameKind::CaseDetective;

    fn check_ready(&self, settings: &CaseDetectiveSettings) -> Result<(), NotReadyReason> {
        match settings.kind {
            Some(_) => Ok(()),
            None => Err(NotReadyReason::FilterMissing),
        }
    }

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        self.next_case(ctx);
        ctx.start_clock(ctx.settings.duration);
        Step::Updated
    }

    fn act(&mut self, action: CaseAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        let CaseAction::Answer(index) = action;
        let Some(case) = &self.current else {
            return Step::Ignored;
        };
        let Some(selected) = case.options.get(index) else {
            return Step::Ignored;
        };

        let correct = *selected == case.correct_answer;
        if correct {
            ctx.progress.score = scoring::apply_delta(ctx.progress.score, scoring::flat(Verdict::Correct));
            ctx.progress.correct += 1;
        }
        ctx.progress.answered += 1;
        self.feedback = Some(CaseFeedback {
            selected: selected.clone(),
            correct,
        });
        Step::Reveal
    }

    fn on_expire(&mut self, _ctx: &mut RuleContext<'_, Self>) -> Step {
        Step::Finish(FinishReason::TimeUp)
    }

    fn advance(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.feedback.is_none() {
            return Step::Ignored;
        }
        if ctx.progress.score >= ctx.settings.target_score {
            return Step::Finish(FinishReason::TargetReached);
        }
        self.next_case(ctx);
        Step::Continue
    }

    fn clear(&mut self) {
        self.current = None;
        self.feedback = None;
    }

    fn view(&self) -> CaseDetectiveView {
        CaseDetectiveView {
            current: self.current.clone(),
            feedback: self.feedback.clone(),
        }
    }

    fn summarize(&self, progress: &Progress, _settings: &CaseDetectiveSettings) -> RecordDraft {
        RecordDraft {
            results: vec![RecordEntry::new(
                "Player",
                format!("{}/{}", progress.score, progress.answered),
            )],
            winner: None,
        }
    }
}

impl Session<CaseDetective> {
    /// Answer the current case with the option at `index`.
    pub fn select_answer(&mut self, index: usize) -> bool {
        self.process_action(CaseAction::Answer(index))
    }

    /// Move on after the feedback was shown.
    pub fn next_question(&mut self) -> bool {
        self.advance()
    }

    /// Case on screen.
    pub fn current_case(&self) -> Option<&DetectiveCase> {
        self.rules().current.as_ref()
    }

    /// Share of answered cases that were right, in percent.
    pub fn accuracy(&self) -> u32 {
        scoring::accuracy_percent(self.progress().correct, self.progress().answered)
    }
}
