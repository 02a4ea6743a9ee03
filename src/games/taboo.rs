//! Team word-description game played in fixed-length turns.
//!
//! Each team describes words for one turn while the clock runs. When the turn
//! ends the session waits in [`SessionStatus::AwaitingTransition`] until the
//! host calls [`Session::start_next_turn`]. The run is over after every team
//! played `round_count` turns.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        record::{RecordDraft, RecordEntry},
        validation::validate_no_blank,
    },
    error::{EngineError, NotReadyReason},
    games::GameKind,
    services::scoring::{self, Verdict},
    state::{
        FinishReason, Session, SessionStatus,
        rules::{ContentItem, GameRules, GameSettings, Progress, RuleContext, Step},
    },
};

/// Minimum number of teams for a run.
pub const MIN_TEAMS: usize = 2;

/// Word to describe, with the words that may not be said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabooWord {
    /// Word to make the team guess.
    #[serde(alias = "kelime")]
    pub word: String,
    /// Forbidden words.
    #[serde(alias = "yasaklar", default)]
    pub forbidden: Vec<String>,
    /// Category label.
    #[serde(alias = "kategori", default)]
    pub category: String,
}

impl Validate for TabooWord {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_no_blank(std::slice::from_ref(&self.word)) {
            errors.add("word", e);
        }
        if let Err(e) = validate_no_blank(&self.forbidden) {
            errors.add("forbidden", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ContentItem for TabooWord {
    fn key(&self) -> String {
        self.word.clone()
    }

    fn check_shape(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }
}

/// A competing team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Points scored so far; never negative.
    pub score: u32,
}

/// Settings of a taboo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TabooSettings {
    /// Length of one turn in seconds.
    #[validate(range(min = 5, max = 600))]
    pub turn_duration: u32,
    /// Turns each team plays.
    #[validate(range(min = 1, max = 20))]
    pub round_count: u32,
    /// Passes allowed per turn.
    #[validate(range(max = 20))]
    pub pass_allowance: u32,
}

impl Default for TabooSettings {
    fn default() -> Self {
        Self {
            turn_duration: 60,
            round_count: 3,
            pass_allowance: 3,
        }
    }
}

impl GameSettings for TabooSettings {
    fn countdown_ticks(&self) -> u32 {
        self.turn_duration
    }
}

/// Describer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabooAction {
    /// The team guessed the word.
    Correct,
    /// A forbidden word was said.
    Forbidden,
    /// Skip the word.
    Pass,
}

/// Game-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabooView {
    /// Teams in play order.
    pub teams: Vec<Team>,
    /// Index of the team whose turn it is.
    pub current_team: usize,
    /// Word being described.
    pub current_word: Option<TabooWord>,
    /// Passes left in this turn.
    pub passes_left: u32,
}

/// Taboo rules and team roster.
#[derive(Debug, Default)]
pub struct Taboo {
    teams: IndexMap<Uuid, Team>,
    current_team: usize,
    current: Option<TabooWord>,
    passes_left: u32,
}

impl Taboo {
    /// Rules with an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Team with the strictly highest score, first registered on ties.
    ///
    /// `None` when nobody scored.
    fn leader(&self) -> Option<&Team> {
        self.teams.values().fold(None, |best: Option<&Team>, team| {
            let best_score = best.map_or(0, |best| best.score);
            if team.score > best_score { Some(team) } else { best }
        })
    }

    fn scoreboard(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.teams.values().cloned().collect();
        teams.sort_by(|a, b| b.score.cmp(&a.score));
        teams
    }

    fn current_team_mut(&mut self) -> Option<&mut Team> {
        self.teams.get_index_mut(self.current_team).map(|(_, team)| team)
    }

    fn is_last_turn(&self, progress: &Progress, settings: &TabooSettings) -> bool {
        self.current_team + 1 >= self.teams.len() && progress.round >= settings.round_count
    }

    fn begin_turn(&mut self, ctx: &mut RuleContext<'_, Self>) {
        ctx.progress.passes_used = 0;
        self.passes_left = ctx.settings.pass_allowance;
        self.current = ctx.pick_next();
        ctx.start_clock(ctx.settings.turn_duration);
    }
}

impl GameRules for Taboo {
    type Item = TabooWord;
    type Settings = TabooSettings;
    type Action = TabooAction;
    type View = TabooView;

    const KIND: GameKind = GameKind::Taboo;

    fn check_ready(&self, _settings: &TabooSettings) -> Result<(), NotReadyReason> {
        if self.teams.len() < MIN_TEAMS {
            return Err(NotReadyReason::NotEnoughTeams {
                required: MIN_TEAMS,
                actual: self.teams.len(),
            });
        }
        Ok(())
    }

    fn begin(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        ctx.progress.round = 1;
        self.current_team = 0;
        self.begin_turn(ctx);
        Step::Updated
    }

    fn act(&mut self, action: TabooAction, ctx: &mut RuleContext<'_, Self>) -> Step {
        let verdict = match action {
            TabooAction::Correct => Verdict::Correct,
            TabooAction::Forbidden => Verdict::Penalty,
            TabooAction::Pass => {
                if self.passes_left == 0 {
                    return Step::Ignored;
                }
                self.passes_left -= 1;
                ctx.progress.passes_used += 1;
                self.current = ctx.pick_next();
                return Step::Updated;
            }
        };

        let Some(team) = self.current_team_mut() else {
            return Step::Ignored;
        };
        team.score = scoring::apply_delta(team.score, scoring::flat(verdict));

        ctx.progress.answered += 1;
        if verdict == Verdict::Correct {
            ctx.progress.correct += 1;
        }
        self.current = ctx.pick_next();
        Step::Updated
    }

    fn on_expire(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if self.is_last_turn(ctx.progress, ctx.settings) {
            ctx.progress.round = ctx.settings.round_count + 1;
            return Step::Finish(FinishReason::RoundsCompleted);
        }
        Step::AwaitTransition
    }

    fn advance(&mut self, ctx: &mut RuleContext<'_, Self>) -> Step {
        if ctx.status != SessionStatus::AwaitingTransition || self.teams.is_empty() {
            return Step::Ignored;
        }

        self.current_team = (self.current_team + 1) % self.teams.len();
        if self.current_team == 0 {
            ctx.progress.round += 1;
        }
        if ctx.progress.round > ctx.settings.round_count {
            return Step::Finish(FinishReason::RoundsCompleted);
        }

        self.begin_turn(ctx);
        Step::Continue
    }

    fn clear(&mut self) {
        for team in self.teams.values_mut() {
            team.score = 0;
        }
        self.current_team = 0;
        self.current = None;
        self.passes_left = 0;
    }

    fn view(&self) -> TabooView {
        TabooView {
            teams: self.teams.values().cloned().collect(),
            current_team: self.current_team,
            current_word: self.current.clone(),
            passes_left: self.passes_left,
        }
    }

    fn summarize(&self, progress: &Progress, settings: &TabooSettings) -> RecordDraft {
        let winner = if progress.round > settings.round_count {
            self.leader().map(|team| team.name.clone())
        } else {
            None
        };

        RecordDraft {
            results: self
                .scoreboard()
                .into_iter()
                .map(|team| RecordEntry::new(team.name, team.score))
                .collect(),
            winner,
        }
    }
}

impl Session<Taboo> {
    /// Register a team. Only allowed while no run is active.
    pub fn add_team(&mut self, name: &str) -> Result<Uuid, EngineError> {
        self.ensure_roster_editable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput("team name must not be empty".into()));
        }

        let team = Team {
            id: Uuid::new_v4(),
            name: name.to_string(),
            score: 0,
        };
        let id = team.id;
        self.rules_mut().teams.insert(id, team);
        self.changed();
        Ok(id)
    }

    /// Remove a team. Returns whether it existed.
    pub fn remove_team(&mut self, id: Uuid) -> Result<bool, EngineError> {
        self.ensure_roster_editable()?;
        let removed = self.rules_mut().teams.shift_remove(&id).is_some();
        if removed {
            self.changed();
        }
        Ok(removed)
    }

    /// Registered teams, in play order.
    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.rules().teams.values()
    }

    /// Team whose turn it is.
    pub fn current_team(&self) -> Option<&Team> {
        let rules = self.rules();
        rules.teams.get_index(rules.current_team).map(|(_, team)| team)
    }

    /// Word being described.
    pub fn current_word(&self) -> Option<&TabooWord> {
        self.rules().current.as_ref()
    }

    /// Whether a turn ended and the host must call [`Session::start_next_turn`].
    pub fn needs_turn_transition(&self) -> bool {
        self.status() == SessionStatus::AwaitingTransition
    }

    /// Hand over to the next team.
    pub fn start_next_turn(&mut self) -> bool {
        self.advance()
    }

    /// Winner of a completed run; `None` before the last turn ended.
    pub fn winner(&self) -> Option<&Team> {
        if self.status() != SessionStatus::Finished
            || self.progress().round <= self.settings().round_count
        {
            return None;
        }
        self.rules().leader()
    }

    /// Teams sorted by descending score.
    pub fn scoreboard(&self) -> Vec<Team> {
        self.rules().scoreboard()
    }

    /// Distinct word categories, in content order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for word in self.content() {
            if !word.category.is_empty() && !categories.contains(&word.category) {
                categories.push(word.category.clone());
            }
        }
        categories
    }

    fn ensure_roster_editable(&self) -> Result<(), EngineError> {
        if self.status().is_active() {
            return Err(EngineError::InvalidInput(
                "teams cannot change while a run is active".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> Vec<TabooWord> {
        ["Ego", "Id", "Superego", "Libido", "Transference"]
            .into_iter()
            .map(|word| TabooWord {
                word: word.to_string(),
                forbidden: vec!["Freud".to_string()],
                category: "psychoanalysis".to_string(),
            })
            .collect()
    }

    fn session_with_teams(round_count: u32) -> Session<Taboo> {
        let mut session = Session::new(Taboo::new()).with_seed(5);
        session.set_content(words()).unwrap();
        session
            .update_settings(|settings| {
                settings.turn_duration = 5;
                settings.round_count = round_count;
                settings.pass_allowance = 1;
            })
            .unwrap();
        session.add_team("Red").unwrap();
        session.add_team("Blue").unwrap();
        session
    }

    fn run_out_the_clock(session: &mut Session<Taboo>) {
        for _ in 0..5 {
            session.tick();
        }
    }

    #[test]
    fn start_requires_two_teams() {
        let mut session = Session::new(Taboo::new());
        session.set_content(words()).unwrap();
        session.add_team("Solo").unwrap();
        let err = session.start().unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotReady(NotReadyReason::NotEnoughTeams { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn forbidden_words_never_push_scores_below_zero() {
        let mut session = session_with_teams(1);
        session.start().unwrap();
        for _ in 0..4 {
            session.process_action(TabooAction::Forbidden);
        }
        assert_eq!(session.current_team().unwrap().score, 0);

        session.process_action(TabooAction::Correct);
        session.process_action(TabooAction::Correct);
        session.process_action(TabooAction::Forbidden);
        assert_eq!(session.current_team().unwrap().score, 1);
    }

    #[test]
    fn passes_are_capped_per_turn() {
        let mut session = session_with_teams(2);
        session.start().unwrap();
        assert!(session.process_action(TabooAction::Pass));
        assert!(!session.process_action(TabooAction::Pass));

        run_out_the_clock(&mut session);
        assert!(session.start_next_turn());
        assert!(session.process_action(TabooAction::Pass));
    }

    #[test]
    fn two_rounds_with_two_teams_play_four_turns() {
        let mut session = session_with_teams(2);
        session.start().unwrap();

        let mut turns = 0;
        loop {
            turns += 1;
            if session.current_team().unwrap().name == "Blue" {
                session.process_action(TabooAction::Correct);
            }
            assert!(session.winner().is_none());
            run_out_the_clock(&mut session);

            if session.status() == SessionStatus::Finished {
                break;
            }
            assert!(session.needs_turn_transition());
            assert!(!session.process_action(TabooAction::Correct));
            assert!(session.start_next_turn());
        }

        assert_eq!(turns, 4);
        assert_eq!(session.finish_reason(), Some(FinishReason::RoundsCompleted));
        let winner = session.winner().unwrap();
        assert_eq!(winner.name, "Blue");
        assert_eq!(winner.score, 2);
        assert_eq!(session.scoreboard()[0].name, "Blue");
    }

    #[test]
    fn ties_go_to_the_first_team_and_zero_scores_have_no_winner() {
        let mut session = session_with_teams(1);
        session.start().unwrap();
        run_out_the_clock(&mut session);
        session.start_next_turn();
        run_out_the_clock(&mut session);
        assert_eq!(session.status(), SessionStatus::Finished);
        assert!(session.winner().is_none());

        session.start().unwrap();
        session.process_action(TabooAction::Correct);
        run_out_the_clock(&mut session);
        session.start_next_turn();
        session.process_action(TabooAction::Correct);
        run_out_the_clock(&mut session);
        assert_eq!(session.winner().unwrap().name, "Red");
    }

    #[test]
    fn roster_is_frozen_during_a_run() {
        let mut session = session_with_teams(1);
        session.start().unwrap();
        assert!(session.add_team("Green").is_err());
        session.reset();
        assert!(session.add_team("  ").is_err());
        let id = session.add_team("Green").unwrap();
        assert!(session.remove_team(id).unwrap());
        assert_eq!(session.teams().count(), 2);
        assert_eq!(session.categories(), vec!["psychoanalysis".to_string()]);
    }
}
