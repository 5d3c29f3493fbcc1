//! # Backward Match Sequencing
//!
//! Feeds that describe a bracket with forward "next match" pointers carry no position codes. The
//! [`BackwardMatchSequencer`] recovers the visual order of every round by ranking the rounds by
//! name and then walking each side of the bracket from its final round backwards: a match sorts
//! by the position of the match its winner advances to.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::slot::{MatchId, Side, TeamId};
use crate::{Error, Result};

/// Round name patterns and their rank. A lower rank is closer to the grand finals. The patterns
/// may match anywhere in the name and are checked in this order; the first match wins.
static ROUND_RANKS: LazyLock<Vec<(Regex, u8)>> = LazyLock::new(|| {
    [
        (r"Group Play .* (Elimination|Losers) Round", 7),
        (r"(Elimination|Losers) Round", 6),
        (r"Group Play .* Winners Round", 5),
        (r"Winners Round", 4),
        (r"Group Play .* (Elimination|Losers) Qualifier Round", 3),
        (r"Group Play .* Winners Qualifier Round", 2),
        (r"(Elimination|Losers) Finals", 3),
        (r"Winners Finals", 1),
        (r"Grand Finals", 0),
    ]
    .into_iter()
    .map(|(pattern, rank)| (Regex::new(&format!("(?i){}", pattern)).unwrap(), rank))
    .collect()
});

static ROUND_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// The team slot of the next match a winner advances into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamPosition {
    Team1,
    Team2,
}

impl TeamPosition {
    /// Parses the provider spellings `team1`, `team 1`, `team2` and `team 2`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "team1" | "team 1" => Some(Self::Team1),
            "team2" | "team 2" => Some(Self::Team2),
            _ => None,
        }
    }
}

/// A bracket match as reported by a next-match pointer feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundMatch {
    pub id: MatchId,
    pub round_name: String,
    pub round_short_name: Option<String>,
    pub teams: [Option<TeamId>; 2],
    pub winner: Option<TeamId>,
    pub next_match: Option<MatchId>,
    pub next_team_position: Option<TeamPosition>,
}

/// A round whose matches are in bracket order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequencedRound {
    pub name: String,
    pub short_name: Option<String>,
    pub side: Side,
    /// 1-based, counted separately per side.
    pub number: u32,
    pub matches: Vec<RoundMatch>,
}

/// Returns the rank of a round name and the first number embedded in it.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedRoundName`] if the name matches none of the known round patterns.
pub fn round_rank(name: &str) -> Result<(u8, u32)> {
    let rank = ROUND_RANKS
        .iter()
        .find(|(pattern, _)| pattern.is_match(name))
        .map(|(_, rank)| *rank)
        .ok_or_else(|| Error::UnrecognizedRoundName(name.to_owned()))?;

    let number = ROUND_NUMBER
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    Ok((rank, number))
}

/// The outcome of resolving a match against the already ordered succeeding round.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Resolution {
    Resolved(usize),
    Ambiguous,
    NotFound,
}

#[derive(Copy, Clone, Debug)]
enum Tier {
    /// The explicit next match reference.
    NextMatchId,
    /// The succeeding match the winner of this match plays in.
    WinningTeam,
}

impl Tier {
    const ALL: [Self; 2] = [Self::NextMatchId, Self::WinningTeam];

    fn resolve(self, m: &RoundMatch, succeeding: &[RoundMatch]) -> Resolution {
        let mut found = match self {
            Self::NextMatchId => {
                let Some(next) = m.next_match else {
                    return Resolution::NotFound;
                };

                succeeding
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.id == next)
                    .map(|(index, _)| index)
                    .collect::<Vec<_>>()
            }
            Self::WinningTeam => {
                let Some(winner) = m.winner else {
                    return Resolution::NotFound;
                };

                succeeding
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.teams.contains(&Some(winner)))
                    .map(|(index, _)| index)
                    .collect::<Vec<_>>()
            }
        };

        match found.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Resolved(found.remove(0)),
            _ => Resolution::Ambiguous,
        }
    }
}

/// Orders the matches of next-match pointer feeds.
#[derive(Copy, Clone, Debug, Default)]
pub struct BackwardMatchSequencer;

impl BackwardMatchSequencer {
    pub fn new() -> Self {
        Self
    }

    /// Groups `matches` by round name and returns all rounds in bracket order: the upper side
    /// rounds first, then the lower side rounds, each side ascending from its first round.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedRoundName`] if a round cannot be ranked, or
    /// [`Error::AmbiguousMatchOrdering`] if two matches of a round cannot be ordered.
    pub fn sequence(&self, matches: Vec<RoundMatch>) -> Result<Vec<SequencedRound>> {
        let mut rounds: Vec<(String, Vec<RoundMatch>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for m in matches {
            match index.get(&m.round_name) {
                Some(i) => rounds[*i].1.push(m),
                None => {
                    index.insert(m.round_name.clone(), rounds.len());
                    rounds.push((m.round_name.clone(), vec![m]));
                }
            }
        }

        let mut ranked = Vec::with_capacity(rounds.len());
        for (name, matches) in rounds {
            let (rank, number) = round_rank(&name)?;
            ranked.push((rank, number, name, matches));
        }

        // Closest to the grand finals first.
        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| b.2.cmp(&a.2))
        });

        let mut upper = Vec::new();
        let mut lower = Vec::new();
        for (_, _, name, matches) in ranked {
            match Side::from_round_name(&name) {
                Side::Upper => upper.push((name, matches)),
                Side::Lower => lower.push((name, matches)),
            }
        }

        let mut output = self.sequence_side(Side::Upper, upper)?;
        output.extend(self.sequence_side(Side::Lower, lower)?);
        Ok(output)
    }

    /// Sequences the rounds of one side, given closest to the final round first.
    fn sequence_side(
        &self,
        side: Side,
        reversed: Vec<(String, Vec<RoundMatch>)>,
    ) -> Result<Vec<SequencedRound>> {
        let mut rounds: Vec<(String, Vec<RoundMatch>)> = Vec::with_capacity(reversed.len());

        for (name, mut matches) in reversed {
            match rounds.last() {
                Some((_, succeeding)) => sort_round(&name, &mut matches, succeeding)?,
                // Final round of the side. A single match unless the feed models bracket resets.
                None => matches.sort_by_key(|m| m.id),
            }

            log::debug!(
                "Sequenced {} round \"{}\": {:?}",
                side,
                name,
                matches.iter().map(|m| m.id.0).collect::<Vec<_>>()
            );

            rounds.push((name, matches));
        }

        rounds.reverse();

        Ok(rounds
            .into_iter()
            .enumerate()
            .map(|(index, (name, matches))| SequencedRound {
                short_name: matches.iter().find_map(|m| m.round_short_name.clone()),
                name,
                side,
                number: index as u32 + 1,
                matches,
            })
            .collect())
    }
}

/// Insertion sort with a fallible comparator.
fn sort_round(name: &str, matches: &mut [RoundMatch], succeeding: &[RoundMatch]) -> Result<()> {
    for i in 1..matches.len() {
        let mut j = i;
        while j > 0 && compare(name, &matches[j - 1], &matches[j], succeeding)? == Ordering::Greater
        {
            matches.swap(j - 1, j);
            j -= 1;
        }
    }

    Ok(())
}

fn compare(
    name: &str,
    a: &RoundMatch,
    b: &RoundMatch,
    succeeding: &[RoundMatch],
) -> Result<Ordering> {
    if a.next_match.is_some() && a.next_match == b.next_match {
        return Ok(by_team_position(a, b));
    }

    for tier in Tier::ALL {
        let resolved = (tier.resolve(a, succeeding), tier.resolve(b, succeeding));

        if let (Resolution::Resolved(x), Resolution::Resolved(y)) = resolved {
            if matches!(tier, Tier::WinningTeam) {
                log::debug!(
                    "Ordered {} and {} in \"{}\" by {:?}",
                    a.id,
                    b.id,
                    name,
                    tier
                );
            }

            return Ok(x.cmp(&y).then_with(|| by_team_position(a, b)));
        }
    }

    Err(Error::AmbiguousMatchOrdering {
        round: name.to_owned(),
        first: a.id,
        second: b.id,
    })
}

/// The match feeding the `team1` slot sorts first.
fn by_team_position(a: &RoundMatch, b: &RoundMatch) -> Ordering {
    let key = |m: &RoundMatch| match m.next_team_position {
        Some(TeamPosition::Team1) => 0,
        Some(TeamPosition::Team2) => 1,
        None => 2,
    };

    key(a).cmp(&key(b)).then_with(|| a.id.cmp(&b.id))
}
