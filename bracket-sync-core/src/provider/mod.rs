//! Provider payloads and their reduction to [`TournamentBracket`]s.
//!
//! - [`template`]: Brackets described by an HTML template and position codes.
//! - [`feed`]: Events whose matches point at the match their winner advances to.
pub mod feed;
pub mod template;

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::slot::{MatchId, ResolvedSlot};
use crate::Result;

/// The bracket map linking every group of a group play stage.
pub const GROUP_QUALIFIER_MAP: &str = "group_qualifier.json";

/// Standard brackets whose edges come from a bracket map, by bracket title.
pub const BRACKET_MAPS: &[(&str, &str)] = &[("Kickoff Classic Bracket", "2022_kickoff_classic.json")];

/// Returns the bracket map of the standard bracket titled `title`, if it has one.
pub fn bracket_map_file(title: &str) -> Option<&'static str> {
    BRACKET_MAPS
        .iter()
        .find(|(bracket, _)| *bracket == title.trim())
        .map(|(_, file)| *file)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TournamentFormat {
    /// An elimination bracket.
    Bracket,
    /// Round based play without progression edges.
    Round,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketType {
    SingleElimination,
    DoubleElimination,
}

impl BracketType {
    /// Returns [`DoubleElimination`] if any of `slots` is on the lower side.
    ///
    /// [`DoubleElimination`]: Self::DoubleElimination
    pub fn of(slots: &[ResolvedSlot]) -> Self {
        if slots.iter().any(|slot| slot.side.is_lower()) {
            Self::DoubleElimination
        } else {
            Self::SingleElimination
        }
    }
}

impl Display for BracketType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::SingleElimination => f.write_str("SINGLE_ELIMINATION"),
            Self::DoubleElimination => f.write_str("DOUBLE_ELIMINATION"),
        }
    }
}

/// A tournament as reconstructed from a provider, ready to be ingested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentBracket {
    /// The provider's identifier of the tournament, if it has one.
    pub id: Option<u64>,
    pub name: String,
    pub format: TournamentFormat,
    pub bracket_type: Option<BracketType>,
    /// Slots in bracket order.
    pub slots: Vec<ResolvedSlot>,
    /// The bracket map to link the slots with instead of inferring the edges.
    pub map_file: Option<String>,
    /// Independently progressing sub-brackets, ingested as child tournaments.
    pub groups: Vec<TournamentBracket>,
    /// Matches of the tournament that are not part of the bracket.
    pub matches: Vec<MatchId>,
}

/// Something that can be reduced to a [`TournamentBracket`].
pub trait BracketSource {
    /// A human readable name, used to report failures.
    fn name(&self) -> &str;

    /// Reconstructs the bracket.
    fn into_bracket(self) -> Result<TournamentBracket>;
}

/// Any supported provider payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    GroupTemplate(template::GroupBracket),
    Template(template::StandardBracket),
    Feed(feed::EventPayload),
}

impl Payload {
    /// Sets the season year template brackets fall back to when their title has no year.
    pub fn with_season_year(self, year: Option<u16>) -> Self {
        match self {
            Self::GroupTemplate(bracket) => Self::GroupTemplate(bracket.with_season_year(year)),
            Self::Template(bracket) => Self::Template(bracket.with_season_year(year)),
            Self::Feed(event) => Self::Feed(event),
        }
    }
}

impl BracketSource for Payload {
    fn name(&self) -> &str {
        match self {
            Self::GroupTemplate(bracket) => bracket.name(),
            Self::Template(bracket) => bracket.name(),
            Self::Feed(event) => event.name(),
        }
    }

    fn into_bracket(self) -> Result<TournamentBracket> {
        match self {
            Self::GroupTemplate(bracket) => bracket.into_bracket(),
            Self::Template(bracket) => bracket.into_bracket(),
            Self::Feed(event) => event.into_bracket(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BracketSource, Payload};

    #[test]
    fn test_payload_untagged() {
        let payload: Payload = serde_json::from_str(
            r#"{"title": "2024 Major 1 Bracket", "htmlTemplate": "", "matches": []}"#,
        )
        .unwrap();
        assert!(matches!(payload, Payload::Template(_)));
        assert_eq!(payload.name(), "2024 Major 1 Bracket");

        let payload: Payload = serde_json::from_str(
            r#"{"title": "Qualifiers", "htmlTemplate": "", "groups": [], "shapedMatches": []}"#,
        )
        .unwrap();
        assert!(matches!(payload, Payload::GroupTemplate(_)));

        let payload: Payload = serde_json::from_str(
            r#"{"event": {"id": 3, "name": "Open", "number_of_tournament_bracket_teams": null}, "matches": []}"#,
        )
        .unwrap();
        assert!(matches!(payload, Payload::Feed(_)));
        assert_eq!(payload.name(), "Open");
    }
}
