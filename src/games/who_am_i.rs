//! Single-player person guessing against a session-wide clock.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::record::{RecordDraft, RecordEntry},
    games::GameKind,
    services::scoring::{self, Verdict},
    state::{
        FinishReason, Session,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// How hard a person is to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Well-known names.
    #[serde(alias = "kolay")]
    Easy,
    /// Names most players have heard of.
    #[serde(alias = "orta")]
    Medium,
    /// Specialist knowledge.
    #[serde(alias = "zor")]
    Hard,
}

/// Difficulty selection for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyFilter {
    /// Every person, whatever the difficulty.
    #[default]
    Mixed,
    /// Only people of the given difficulty (falls back to everyone when none match).
    Only(Difficulty),
}

impl DifficultyFilter {
    fn accepts(self, person: &Person) -> bool {
        match self {
            DifficultyFilter::Mixed => true,
            DifficultyFilter::Only(level) => person.difficulty == Some(level),
        }
    }
}

/// A person (or concept) to be guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Person {
    /// Name shown to the describer.
    #[serde(alias = "kisi")]
    #[validate(length(min = 1))]
    pub name: String,
    /// Category label.
    #[serde(alias = "kategori", default)]
    pub category: String,
    /// Optional difficulty tag.
    #[serde(alias = "zorluk", default)]
    pub difficulty: Option<Difficulty>,
}

impl Person {
    /// Untagged person.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            difficulty: None,
        }
    }

    /// Tag with a difficulty.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }
}

impl ContentItem for Person {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }
}

/// Settings of a who-am-I run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WhoAmISettings {
    /// Length of the run in seconds.
    #[validate(range(min = 1, max = 3600))]
    pub duration: u32,
    /// Score that ends the run early.
    #[validate(range(min = 1, max = 1000))]
    pub target_score: u32,
    /// Difficulty selection.
    pub difficulty: DifficultyFilter,
    /// Passes allowed per run; `None` means unlimited.
    pub pass_allowance: Option<u32>,
}

impl Default for WhoAmISettings {
    fn default() -> Self {
        Self {
            duration: 90,
            target_score: 15,
            difficulty: DifficultyFilter::Mixed,
            pass_allowance: None,
        }
    }
}

impl GameSettings for WhoAmISettings {
    fn countdown_ticks(&self) -> u32 {
        self.duration
    }
}

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhoAmIAction {
    /// The person was guessed.
    Correct,
    /// Skip to another person.
    Pass,
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhoAmIView {
    /// Person currently shown.
    pub current: Option<Person>,
    /// People skipped during this run, in order.
    pub passed: Vec<String>,
    /// Passes still available, `None` when unlimited.
    pub passes_left: Option<u32>,
}

/// Who-am-I rules.
#[derive(Debug, Default)]
pub struct WhoAmI {
    current: Option<Person>,
    passed: Vec<String>,
    passes_left: Option<u32>,
}

impl WhoAmI {
    fn next_person(&mut self, ctx: &mut RuleContext<'_, Self>) {
        let filter = ctx.settings.difficulty;
        self.current = ctx.pick_next_where(|person| filter.accepts(person));
    }
}

impl GameRules for WhoAmI {
    type Item = Person;
    type Settings = WhoAmISettings;
    type Action = WhoAmIAction;
    type View = WhoAmIView;

    const KIND: GameKind = GameKind::WhoAmI;

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        self.passes_left = ctx.settings.pass_allowance;
        self.next_person(ctx);
        ctx.start_clock(ctx.settings.duration);
        Step::Updated
    }

    fn act(&mut self, action: WhoAmIAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        match action {
            WhoAmIAction::Correct => {
                ctx.progress.score = scoring::apply_delta(ctx.progress.score, scoring::flat(Verdict::Correct));
                ctx.progress.correct += 1;
            }
            WhoAmIAction::Pass => {
                if let Some(left) = self.passes_left.as_mut() {
                    if *left == 0 {
                        return Step::Ignored;
                    }
                    *left -= 1;
                }
                ctx.progress.passes_used += 1;
                if let Some(person) = &self.current {
                    self.passed.push(person.name.clone());
                }
            }
        }
        ctx.progress.answered += 1;

        if ctx.progress.score >= ctx.settings.target_score {
            return Step::Finish(FinishReason::TargetReached);
        }

        self.next_person(ctx);
        Step::Updated
    }

    fn on_expire(&mut self, _ctx: &mut RuleContext<'_, Self>) -> Step {
        Step::Finish(FinishReason::TimeUp)
    }

    fn clear(&mut self) {
        self.current = None;
        self.passed.clear();
        self.passes_left = None;
    }

    fn view(&self) -> WhoAmIView {
        WhoAmIView {
            current: self.current.clone(),
            passed: self.passed.clone(),
            passes_left: self.passes_left,
        }
    }

    fn summarize(&self, progress: &Progress, _settings: &WhoAmISettings) -> RecordDraft {
        RecordDraft {
            results: vec![RecordEntry::new(
                "Player",
                format!("{}/{}", progress.score, progress.answered),
            )],
            winner: None,
        }
    }
}

impl Session<WhoAmI> {
    /// Person currently shown.
    pub fn current_person(&self) -> Option<&Person> {
        self.rules().current.as_ref()
    }

    /// Share of shown people that were guessed, in percent.
    pub fn accuracy(&self) -> u32 {
        scoring::accuracy_percent(self.progress().correct, self.progress().answered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionStatus;

    fn session() -> Session<WhoAmI> {
        let mut session = Session::new(WhoAmI::default()).with_seed(3);
        session.set_content(vec![
            Person::new("Freud", "psychoanalysis").with_difficulty(Difficulty::Easy),
            Person::new("Klein", "psychoanalysis").with_difficulty(Difficulty::Hard),
            Person::new("Winnicott", "psychoanalysis").with_difficulty(Difficulty::Hard),
            Person::new("Rogers", "humanistic"),
        ]).unwrap();
        session
    }

    #[test]
    fn target_score_finishes_the_run() {
        let mut session = session();
        session.update_settings(|settings| settings.target_score = 2).unwrap();
        session.start().unwrap();

        session.process_action(WhoAmIAction::Correct);
        assert_eq!(session.status(), SessionStatus::Playing);
        session.process_action(WhoAmIAction::Pass);
        session.process_action(WhoAmIAction::Correct);

        assert_eq!(session.status(), SessionStatus::Finished);
        assert_eq!(session.finish_reason(), Some(FinishReason::TargetReached));
        assert_eq!(session.progress().answered, 3);
        assert_eq!(session.accuracy(), 67);
    }

    #[test]
    fn passes_respect_the_allowance() {
        let mut session = session();
        session.update_settings(|settings| settings.pass_allowance = Some(1)).unwrap();
        session.start().unwrap();

        assert!(session.process_action(WhoAmIAction::Pass));
        assert!(!session.process_action(WhoAmIAction::Pass));
        assert_eq!(session.progress().passes_used, 1);
        assert_eq!(session.snapshot().view.passed.len(), 1);
    }

    #[test]
    fn difficulty_filter_picks_matching_people() {
        let mut session = session();
        session
            .update_settings(|settings| settings.difficulty = DifficultyFilter::Only(Difficulty::Hard))
            .unwrap();
        session.start().unwrap();

        for _ in 0..6 {
            let person = session.current_person().unwrap();
            assert_eq!(person.difficulty, Some(Difficulty::Hard));
            session.process_action(WhoAmIAction::Pass);
        }
    }

    #[test]
    fn blank_names_are_dropped_and_aliases_decode() {
        let person: Person =
            serde_json::from_str(r#"{"kisi": "Jung", "kategori": "analytical", "zorluk": "orta"}"#).unwrap();
        assert_eq!(person.difficulty, Some(Difficulty::Medium));

        let mut session = Session::new(WhoAmI::default());
        let kept = session.set_content(vec![person, Person::new("", "none")]).unwrap();
        assert_eq!(kept, 1);
    }
}
