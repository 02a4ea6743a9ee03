//! Spot the lie among a handful of statements. No clock.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        record::{RecordDraft, RecordEntry},
        validation::{validate_exactly_one, validate_no_blank},
    },
    games::GameKind,
    services::{
        scoring::{self, PerformanceTier, Verdict},
        selector,
    },
    state::{
        FinishReason, Session,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// One statement of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement text.
    #[serde(alias = "metin")]
    pub text: String,
    /// Whether the statement is true.
    #[serde(alias = "dogruMu")]
    pub truth: bool,
}

impl Statement {
    /// Build a statement.
    pub fn new(text: impl Into<String>, truth: bool) -> Self {
        Self {
            text: text.into(),
            truth,
        }
    }
}

/// Statements about one topic, exactly one of them false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthRound {
    /// Topic, also used as the identifier.
    #[serde(alias = "konu")]
    pub topic: String,
    /// Category label.
    #[serde(alias = "kategori", default)]
    pub category: String,
    /// Statements.
    #[serde(alias = "ifadeler")]
    pub statements: Vec<Statement>,
}

impl Validate for TruthRound {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_no_blank(std::slice::from_ref(&self.topic)) {
            errors.add("topic", e);
        }
        let lies: Vec<bool> = self.statements.iter().map(|statement| !statement.truth).collect();
        if let Err(e) = validate_exactly_one(&lies, "single_lie", "false statement") {
            errors.add("statements", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ContentItem for TruthRound {
    fn key(&self) -> String {
        self.topic.clone()
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }
}

/// Settings of a two-truths run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TwoTruthsSettings {
    /// Rounds per run (fewer when the pool is smaller).
    #[validate(range(min = 1, max = 100))]
    pub round_count: u32,
}

impl Default for TwoTruthsSettings {
    fn default() -> Self {
        Self { round_count: 10 }
    }
}

impl GameSettings for TwoTruthsSettings {}

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoTruthsAction {
    /// Accuse the displayed statement at this index of being the lie.
    Select(usize),
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwoTruthsView {
    /// Round on screen.
    pub topic: Option<String>,
    /// Statements in display order.
    pub statements: Vec<Statement>,
    /// Index accused, while revealed.
    pub selected: Option<usize>,
    /// Round number, 1-based.
    pub number: u32,
    /// Rounds in this run.
    pub total: u32,
    /// Correct answers so far, in percent.
    pub accuracy: u32,
    /// Band for that percentage.
    pub tier: PerformanceTier,
}

/// Two-truths-one-lie rules.
#[derive(Debug, Default)]
pub struct TwoTruths {
    rounds: Vec<TruthRound>,
    index: usize,
    statements: Vec<Statement>,
    selected: Option<usize>,
    correct: u32,
    answered: u32,
}

impl TwoTruths {
    fn present(&mut self, ctx: &mut RuleContext<'_, Self>) {
        self.selected = None;
        self.statements = match self.rounds.get(self.index) {
            Some(round) => selector::shuffle_options_keeping_answer(
                round.statements.clone(),
                |statement| !statement.truth,
                ctx.rng,
            ),
            None => Vec::new(),
        };
        ctx.progress.position = self.index as u32;
    }

    fn accuracy(&self) -> u32 {
        scoring::accuracy_percent(self.correct, self.answered)
    }
}

impl GameRules for TwoTruths {
    type Item = TruthRound;
    type Settings = TwoTruthsSettings;
    type Action = TwoTruthsAction;
    type View = TwoTruthsView;

    const KIND: GameKind = GameKind::TwoTruths;

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        self.rounds = selector::sample(ctx.content, ctx.settings.round_count as usize, ctx.rng);
        self.index = 0;
        self.present(ctx);
        Step::Updated
    }

    fn act(&mut self, action: TwoTruthsAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        let TwoTruthsAction::Select(index) = action;
        if self.selected.is_some() {
            return Step::Ignored;
        }
        let Some(statement) = self.statements.get(index) else {
            return Step::Ignored;
        };

        let found_lie = !statement.truth;
        self.selected = Some(index);
        self.answered += 1;
        ctx.progress.answered += 1;
        if found_lie {
            self.correct += 1;
            ctx.progress.correct += 1;
            ctx.progress.score = scoring::apply_delta(ctx.progress.score, scoring::flat(Verdict::Correct));
        }
        Step::Reveal
    }

    fn on_expire(&mut self, _ctx: &mut RuleContext<'_, Self>) -> Step {
        Step::Ignored
    }

    fn advance(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.selected.is_none() {
            return Step::Ignored;
        }
        if self.index + 1 >= self.rounds.len() {
            return Step::Finish(FinishReason::QuestionsExhausted);
        }
        self.index += 1;
        self.present(ctx);
        Step::Continue
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn view(&self) -> TwoTruthsView {
        TwoTruthsView {
            topic: self.rounds.get(self.index).map(|round| round.topic.clone()),
            statements: self.statements.clone(),
            selected: self.selected,
            number: self.index as u32 + 1,
            total: self.rounds.len() as u32,
            accuracy: self.accuracy(),
            tier: scoring::performance_tier(self.accuracy()),
        }
    }

    fn summarize(&self, progress: &Progress, _settings: &TwoTruthsSettings) -> RecordDraft {
        RecordDraft {
            results: vec![RecordEntry::new(
                "Player",
                format!("{}/{}", progress.correct, progress.answered),
            )],
            winner: None,
        }
    }
}

impl Session<TwoTruths> {
    /// Accuse the displayed statement at `index`.
    pub fn select_answer(&mut self, index: usize) -> bool {
        self.process_action(TwoTruthsAction::Select(index))
    }

    /// Move on to the next round.
    pub fn next_question(&mut self) -> bool {
        self.advance()
    }

    /// Statements of the current round, in display order.
    pub fn statements(&self) -> &[Statement] {
        &self.rules().statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionStatus;

    fn rounds(count: usize) -> Vec<TruthRound> {
        (0..count)
            .map(|i| TruthRound {
                topic: format!("topic {i}"),
                category: "social".into(),
                statements: vec![
                    Statement::new("true one", true),
                    Statement::new("true two", true),
                    Statement::new("the lie", false),
                ],
            })
            .collect()
    }

    #[test]
    fn finding_the_lie_scores_and_runs_are_capped() {
        let mut session = Session::new(TwoTruths::default()).with_seed(8);
        session.set_content(rounds(15)).unwrap();
        session.start().unwrap();
        assert_eq!(session.snapshot().view.total, 10);
        assert!(!session.timer_running());

        let lie = session.statements().iter().position(|s| !s.truth).unwrap();
        assert!(session.select_answer(lie));
        assert_eq!(session.status(), SessionStatus::RevealingAnswer);
        assert_eq!(session.progress().score, 1);
        assert!(session.next_question());

        let truth = session.statements().iter().position(|s| s.truth).unwrap();
        session.select_answer(truth);
        assert_eq!(session.progress().score, 1);
        let view = session.snapshot().view;
        assert_eq!(view.accuracy, 50);
        assert_eq!(view.tier, PerformanceTier::Fair);
    }

    #[test]
    fn last_round_finishes() {
        let mut session = Session::new(TwoTruths::default()).with_seed(8);
        session.set_content(rounds(1)).unwrap();
        session.start().unwrap();
        session.select_answer(0);
        session.next_question();
        assert_eq!(session.finish_reason(), Some(FinishReason::QuestionsExhausted));
        let view = session.snapshot().view;
        assert_eq!((view.number, view.total), (1, 1));
        assert!(view.topic.is_some());
    }

    #[test]
    fn rounds_need_exactly_one_lie() {
        let mut round = rounds(1).remove(0);
        round.statements[0].truth = false;
        assert!(round.check_shape().is_err());

        let decoded: TruthRound = serde_json::from_str(
            r#"{"konu": "sleep", "kategori": "bio", "ifadeler": [
                {"metin": "a", "dogruMu": true}, {"metin": "b", "dogruMu": false}]}"#,
        )
        .unwrap();
        assert!(decoded.check_shape().is_ok());
    }
}
