use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::warn;
use uuid::Uuid;

use crate::games::GameKind;

/// Score column of a result line: either a number or a formatted text such as `7/12`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    /// Plain numeric score.
    Points(i64),
    /// Preformatted score.
    Text(String),
}

impl From<u32> for ScoreValue {
    fn from(value: u32) -> Self {
        ScoreValue::Points(i64::from(value))
    }
}

impl From<String> for ScoreValue {
    fn from(value: String) -> Self {
        ScoreValue::Text(value)
    }
}

/// One participant line of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Team or player name.
    pub name: String,
    /// Final score.
    pub score: ScoreValue,
}

impl RecordEntry {
    /// Build a result line.
    pub fn new(name: impl Into<String>, score: impl Into<ScoreValue>) -> Self {
        Self {
            name: name.into(),
            score: score.into(),
        }
    }
}

/// Results produced by a rule-set, before the session stamps them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    /// Result lines, best first.
    pub results: Vec<RecordEntry>,
    /// Winner name, for competitive games.
    pub winner: Option<String>,
}

/// Record handed to the record sink once per completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Unique record identifier (`<game>_<uuid>`).
    pub id: String,
    /// Game that produced the record.
    pub game_type: GameKind,
    /// Completion time, RFC 3339.
    pub game_date: String,
    /// Result lines.
    pub results: Vec<RecordEntry>,
    /// Winner, when the game has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl GameRecord {
    /// Stamp a draft with an identifier and the current time.
    pub fn from_draft(game: GameKind, draft: RecordDraft) -> Self {
        Self {
            id: format!("{}_{}", game.slug(), Uuid::new_v4().simple()),
            game_type: game,
            game_date: now_rfc3339(),
            results: draft.results,
            winner: draft.winner,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|err| {
            warn!(error = %err, "failed to format record date");
            String::new()
        })
}
