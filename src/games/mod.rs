//! Concrete games, each a small [`crate::state::GameRules`] implementation.

use serde::{Deserialize, Serialize};

pub mod case_detective;
pub mod color_sequence;
pub mod dilemma;
pub mod estimation;
pub mod taboo;
pub mod trivia;
pub mod two_truths;
pub mod who_am_i;

pub use case_detective::CaseDetective;
pub use color_sequence::ColorSequence;
pub use dilemma::Dilemma;
pub use estimation::Estimation;
pub use taboo::Taboo;
pub use trivia::Trivia;
pub use two_truths::TwoTruths;
pub use who_am_i::WhoAmI;

/// Identifies one of the available games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Team word-description game with forbidden words.
    Taboo,
    /// Single-player "guess the person" game.
    WhoAmI,
    /// Multiple-choice quiz with a per-question timer.
    Trivia,
    /// Classify short clinical vignettes.
    CaseDetective,
    /// Spot the lie among three statements.
    TwoTruths,
    /// Guess a number; closer guesses score more.
    Estimation,
    /// Repeat a growing color sequence.
    ColorSequence,
    /// Browse discussion cases.
    Dilemma,
}

impl GameKind {
    /// Every game, in menu order.
    pub const ALL: [GameKind; 8] = [
        GameKind::Taboo,
        GameKind::WhoAmI,
        GameKind::Trivia,
        GameKind::CaseDetective,
        GameKind::TwoTruths,
        GameKind::Estimation,
        GameKind::ColorSequence,
        GameKind::Dilemma,
    ];

    /// Stable machine name, identical to the serialized form.
    pub fn slug(self) -> &'static str {
        match self {
            GameKind::Taboo => "taboo",
            GameKind::WhoAmI => "who_am_i",
            GameKind::Trivia => "trivia",
            GameKind::CaseDetective => "case_detective",
            GameKind::TwoTruths => "two_truths",
            GameKind::Estimation => "estimation",
            GameKind::ColorSequence => "color_sequence",
            GameKind::Dilemma => "dilemma",
        }
    }

    /// Name of the content collection the game reads (file stem for JSON providers).
    pub fn content_key(self) -> &'static str {
        match self {
            GameKind::Taboo => "taboo_words",
            GameKind::WhoAmI => "who_am_i_people",
            GameKind::Trivia => "trivia_questions",
            GameKind::CaseDetective => "detective_cases",
            GameKind::TwoTruths => "two_truths_rounds",
            GameKind::Estimation => "estimation_questions",
            GameKind::ColorSequence => "color_palette",
            GameKind::Dilemma => "dilemmas",
        }
    }

    /// Human readable name.
    pub fn label(self) -> &'static str {
        match self {
            GameKind::Taboo => "Taboo",
            GameKind::WhoAmI => "Who Am I?",
            GameKind::Trivia => "Trivia",
            GameKind::CaseDetective => "Case Detective",
            GameKind::TwoTruths => "Two Truths One Lie",
            GameKind::Estimation => "Estimation",
            GameKind::ColorSequence => "Color Sequence",
            GameKind::Dilemma => "Dilemmas",
        }
    }

    /// Look a game up by its slug.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_match_serialized_names() {
        for kind in GameKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.slug());
            assert_eq!(GameKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(GameKind::from_slug("chess"), None);
    }
}
