//! Ethical dilemma browser: read a case, reveal its discussion, move on.
//!
//! There is no score and no clock. A run lasts until [`Session::end`].

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        record::{RecordDraft, RecordEntry},
        validation::validate_no_blank,
    },
    games::GameKind,
    state::{
        Session,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// Publication a case was adapted from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaseSource {
    /// Book title.
    #[serde(alias = "kitap", default)]
    pub book: String,
    /// Book authors.
    #[serde(alias = "yazarlar", default)]
    pub authors: String,
    /// Who adapted the case.
    #[serde(alias = "uyarlayan", default)]
    pub adapted_by: String,
    /// Bulletin the adaptation appeared in.
    #[serde(alias = "bulten", default)]
    pub bulletin: String,
}

/// One dilemma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DilemmaCase {
    /// Identifier.
    pub id: String,
    /// Short title.
    #[serde(alias = "baslik")]
    pub title: String,
    /// The situation to discuss.
    #[serde(alias = "senaryo")]
    pub scenario: String,
    /// Discussion, hidden until toggled.
    #[serde(alias = "tartisma", default)]
    pub discussion: String,
    /// Where the case comes from.
    #[serde(alias = "kaynak", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CaseSource>,
}

impl Validate for DilemmaCase {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_no_blank(&[self.title.clone(), self.scenario.clone()]) {
            errors.add("scenario", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl ContentItem for DilemmaCase {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }
}

/// The browser has nothing to configure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DilemmaSettings {}

impl Validate for DilemmaSettings {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl GameSettings for DilemmaSettings {}

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DilemmaAction {
    /// Show or hide the discussion of the current case.
    ToggleDiscussion,
    /// Draw another case.
    NextCase,
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DilemmaView {
    /// Case on screen.
    pub current: Option<DilemmaCase>,
    /// Whether its discussion is visible.
    pub show_discussion: bool,
    /// Size of the pool.
    pub total: usize,
}

/// Dilemma browser rules.
#[derive(Debug, Default)]
pub struct Dilemma {
    current: Option<DilemmaCase>,
    show_discussion: bool,
    total: usize,
}

impl Dilemma {
    fn draw(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        let Some(case) = ctx.pick_next() else {
            return Step::Ignored;
        };
        self.current = Some(case);
        self.show_discussion = false;
        ctx.progress.answered += 1;
        Step::Updated
    }
}

impl GameRules for Dilemma {
    type Item = DilemmaCase;
    type Settings = DilemmaSettings;
    type Action = DilemmaAction;
    type View = DilemmaView;

    const KIND: GameKind = GameKind::Dilemma;

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        self.total = ctx.content.len();
        self.draw(ctx)
    }

    fn act(&mut self, action: DilemmaAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        match action {
            DilemmaAction::ToggleDiscussion if self.current.is_some() => {
                self.show_discussion = !self.show_discussion;
                Step::Updated
            }
            DilemmaAction::ToggleDiscussion => Step::Ignored,
            DilemmaAction::NextCase => self.draw(ctx),
        }
    }

    fn on_expire(&mut self, _ctx: &mut RuleContext<'_, Self>) -> Step {
        Step::Ignored
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn view(&self) -> DilemmaView {
        DilemmaView {
            current: self.current.clone(),
            show_discussion: self.show_discussion,
            total: self.total,
        }
    }

    fn summarize(&self, progress: &Progress, _settings: &DilemmaSettings) -> RecordDraft {
        RecordDraft {
            results: vec![RecordEntry::new("Cases discussed", progress.answered)],
            winner: None,
        }
    }
}

impl Session<Dilemma> {
    /// Show or hide the discussion.
    pub fn toggle_discussion(&mut self) -> bool {
        self.process_action(DilemmaAction::ToggleDiscussion)
    }

    /// Draw another case.
    pub fn next_case(&mut self) -> bool {
        self.process_action(DilemmaAction::NextCase)
    }

    /// Case on screen.
    pub fn current_case(&self) -> Option<&DilemmaCase> {
        self.rules().current.as_ref()
    }

    /// Whether the discussion is visible.
    pub fn discussion_visible(&self) -> bool {
        self.rules().show_discussion
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::state::{FinishReason, SessionStatus};

    fn cases(count: usize) -> Vec<DilemmaCase> {
        (0..count)
            .map(|i| DilemmaCase {
                id: format!("case-{i}"),
                title: format!("Dilemma {i}"),
                scenario: "A client asks you to keep a secret.".into(),
                discussion: "Confidentiality has limits.".into(),
                source: None,
            })
            .collect()
    }

    #[test]
    fn discussion_toggles_and_resets_on_next_case() {
        let mut session = Session::new(Dilemma::default()).with_seed(3);
        session.set_content(cases(4)).unwrap();
        session.start().unwrap();
        assert!(!session.discussion_visible());

        assert!(session.toggle_discussion());
        assert!(session.discussion_visible());
        assert!(session.next_case());
        assert!(!session.discussion_visible());
        assert_eq!(session.progress().answered, 2);
    }

    #[test]
    fn cases_do_not_repeat_within_a_cycle() {
        let mut session = Session::new(Dilemma::default()).with_seed(5);
        session.set_content(cases(5)).unwrap();
        session.start().unwrap();

        let mut seen = HashSet::new();
        seen.insert(session.current_case().unwrap().id.clone());
        for _ in 0..4 {
            session.next_case();
            seen.insert(session.current_case().unwrap().id.clone());
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn runs_only_end_on_request() {
        let mut session = Session::new(Dilemma::default());
        session.set_content(cases(1)).unwrap();
        session.start().unwrap();
        assert!(!session.timer_running());
        session.tick();
        assert_eq!(session.status(), SessionStatus::Playing);

        assert!(session.end());
        assert_eq!(session.finish_reason(), Some(FinishReason::Ended));
    }

    #[test]
    fn decodes_the_source_block() {
        let case: DilemmaCase = serde_json::from_str(
            r#"{"id": "1", "baslik": "Gift", "senaryo": "A client brings a gift.",
                "tartisma": "Boundaries.", "kaynak": {"kitap": "Ethics", "yazarlar": "A. B.",
                "uyarlayan": "C. D.", "bulten": "No. 4"}}"#,
        )
        .unwrap();
        assert_eq!(case.source.unwrap().adapted_by, "C. D.");
    }
}
