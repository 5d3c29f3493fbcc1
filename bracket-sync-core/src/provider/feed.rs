//! # Feed Events
//!
//! Events whose matches carry no position codes. Each match only names the match its winner
//! advances to, the bracket order is recovered by the [`BackwardMatchSequencer`].
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Deserializer, Serialize};

use super::{BracketSource, BracketType, TournamentBracket, TournamentFormat, GROUP_QUALIFIER_MAP};
use crate::patches;
use crate::sequencer::{BackwardMatchSequencer, RoundMatch, SequencedRound, TeamPosition};
use crate::slot::{MatchId, ResolvedSlot, Side, TeamId, GRAND_FINALS, LOSERS_FINALS, WINNERS_FINALS};
use crate::Result;

/// Round name prefixes of matches that are played outside of the bracket.
const NON_BRACKET_ROUNDS: &[&str] = &["Major Qualifier"];

static GROUP_PLAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Group Play (\S+?)\b").unwrap());
static GROUP_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^GP \S+\s*").unwrap());
static ELIMINATION_ROUND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ER(\d+)$").unwrap());

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(deserialize_with = "decoded")]
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub tournament_elimination_type: Option<String>,
    pub number_of_tournament_bracket_teams: Option<u32>,
}

impl Event {
    pub fn format(&self) -> TournamentFormat {
        match self.number_of_tournament_bracket_teams {
            Some(_) => TournamentFormat::Bracket,
            None => TournamentFormat::Round,
        }
    }

    fn bracket_type(&self) -> Option<BracketType> {
        match self.tournament_elimination_type.as_deref()?.to_lowercase().as_str() {
            "single" | "single_elimination" => Some(BracketType::SingleElimination),
            "double" | "double_elimination" => Some(BracketType::DoubleElimination),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRound {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(deserialize_with = "decoded")]
    pub name: String,
    #[serde(default)]
    pub name_short: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMatch {
    pub id: MatchId,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub team_1_id: Option<TeamId>,
    #[serde(default)]
    pub team_2_id: Option<TeamId>,
    #[serde(default)]
    pub winner_id: Option<TeamId>,
    #[serde(default)]
    pub winner_next_match_id: Option<MatchId>,
    #[serde(default, deserialize_with = "team_position")]
    pub winner_next_match_team_position: Option<TeamPosition>,
    #[serde(default)]
    pub round: Option<FeedRound>,
}

/// Names arrive with HTML entities (`&amp;`, `&#8211;`) left in.
fn decoded<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(decode_entities(&value))
}

/// Replaces the HTML character references in `s`.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }

    Html::parse_fragment(s).root_element().text().collect()
}

fn team_position<'de, D>(deserializer: D) -> std::result::Result<Option<TeamPosition>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(TeamPosition::parse))
}

impl FeedMatch {
    fn is_bracket_match(&self) -> bool {
        match &self.round {
            Some(round) => !NON_BRACKET_ROUNDS
                .iter()
                .any(|prefix| round.name.starts_with(prefix)),
            None => false,
        }
    }

    fn into_round_match(self) -> RoundMatch {
        let round = self.round.unwrap_or_default();

        RoundMatch {
            id: self.id,
            round_name: round.name,
            round_short_name: round.name_short,
            teams: [self.team_1_id, self.team_2_id],
            winner: self.winner_id,
            next_match: self.winner_next_match_id,
            next_team_position: self.winner_next_match_team_position,
        }
    }
}

/// An event together with all of its matches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event: Event,
    pub matches: Vec<FeedMatch>,
}

impl BracketSource for EventPayload {
    fn name(&self) -> &str {
        &self.event.name
    }

    fn into_bracket(self) -> Result<TournamentBracket> {
        let Self { event, mut matches } = self;
        log::info!("Reconstructing event {} \"{}\"", event.id, event.name);

        patches::fix_ewc_2024(event.id, &mut matches);

        let format = event.format();

        let (bracket, other): (Vec<_>, Vec<_>) =
            matches.into_iter().partition(FeedMatch::is_bracket_match);

        let mut main = Vec::new();
        let mut groups: Vec<(String, Vec<RoundMatch>)> = Vec::new();
        for m in bracket {
            let m = m.into_round_match();

            match GROUP_PLAY.captures(&m.round_name) {
                Some(captures) => {
                    let label = captures[1].to_owned();
                    match groups.iter_mut().find(|(name, _)| *name == label) {
                        Some((_, group)) => group.push(m),
                        None => groups.push((label, vec![m])),
                    }
                }
                None => main.push(m),
            }
        }

        let sequencer = BackwardMatchSequencer::new();

        let slots = if main.is_empty() {
            Vec::new()
        } else {
            sequenced_slots(&sequencer.sequence(main)?, None)
        };

        let groups = groups
            .into_iter()
            .map(|(label, matches)| {
                let slots = sequenced_slots(&sequencer.sequence(matches)?, Some(&label));

                Ok(TournamentBracket {
                    id: None,
                    name: format!("Group Play {}", label),
                    format: TournamentFormat::Bracket,
                    bracket_type: Some(BracketType::of(&slots)),
                    slots,
                    map_file: Some(GROUP_QUALIFIER_MAP.to_owned()),
                    groups: Vec::new(),
                    matches: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TournamentBracket {
            id: Some(event.id),
            bracket_type: match format {
                TournamentFormat::Bracket => event.bracket_type().or(Some(BracketType::of(&slots))),
                TournamentFormat::Round => None,
            },
            name: event.name,
            format,
            slots,
            map_file: None,
            groups,
            matches: other.iter().map(|m| m.id).collect(),
        })
    }
}

fn sequenced_slots(rounds: &[SequencedRound], group: Option<&str>) -> Vec<ResolvedSlot> {
    rounds
        .iter()
        .flat_map(|round| {
            let short_round_name = short_round_name(round);

            round
                .matches
                .iter()
                .enumerate()
                .map(move |(index, m)| ResolvedSlot {
                    match_id: m.id,
                    round: round.number,
                    position: index as u32 + 1,
                    side: round.side,
                    short_round_name: short_round_name.clone(),
                    round_name: round.name.clone(),
                    position_code: None,
                    group: group.map(str::to_owned),
                })
        })
        .collect()
}

/// Returns the canonical short name of a sequenced round.
pub fn short_round_name(round: &SequencedRound) -> String {
    let Some(short) = round.short_name.as_deref() else {
        return derived_short_name(round);
    };

    let short = GROUP_PREFIX.replace(short.trim(), "");
    match short.as_ref() {
        "WQR" => format!("WR{}", round.number),
        "LQR" => format!("LR{}", round.number),
        "EF" => LOSERS_FINALS.to_owned(),
        short => match ELIMINATION_ROUND.captures(short) {
            Some(captures) => format!("LR{}", &captures[1]),
            None => short.to_owned(),
        },
    }
}

fn derived_short_name(round: &SequencedRound) -> String {
    let name = round.name.to_lowercase();

    if name.starts_with("grand finals") {
        GRAND_FINALS.to_owned()
    } else if name.starts_with("winners finals") {
        WINNERS_FINALS.to_owned()
    } else if name.starts_with("elimination finals") || name.starts_with("losers finals") {
        LOSERS_FINALS.to_owned()
    } else {
        match round.side {
            Side::Upper => format!("WR{}", round.number),
            Side::Lower => format!("LR{}", round.number),
        }
    }
}
