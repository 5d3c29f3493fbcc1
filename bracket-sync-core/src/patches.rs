//! Known data-quality problems of single historical brackets, keyed by raw provider identifiers.
//!
//! Each patch is applied to the raw payload before any reconstruction runs and is a no-op for
//! every other bracket.
use crate::provider::feed::FeedMatch;
use crate::provider::template::BracketMatch;
use crate::sequencer::TeamPosition;
use crate::slot::MatchId;

pub const MAJOR_1_2022_TITLE: &str = "2022 Major 1 Bracket";

/// The first two winners round matches of the 2022 Major 1 bracket reference the wrong matches.
///
/// Returns `true` if the patch applied.
pub fn fix_2022_major_1(title: &str, matches: &mut [BracketMatch]) -> bool {
    if title != MAJOR_1_2022_TITLE {
        return false;
    }

    log::info!("Patching match ids of \"{}\"", title);

    for m in matches.iter_mut() {
        match m.bracket_position.as_str() {
            "WR1-M1" => m.id = MatchId(5740),
            "WR1-M2" => m.id = MatchId(5741),
            _ => (),
        }
    }

    true
}

pub const EWC_2024_EVENT: u64 = 51;

/// The 2024 EWC bracket shipped with next match references missing from its first round.
///
/// The patch only applies while match 92256 still has no next match. Returns `true` if the patch
/// applied.
pub fn fix_ewc_2024(event: u64, matches: &mut [FeedMatch]) -> bool {
    if event != EWC_2024_EVENT {
        return false;
    }

    let unpatched = matches
        .iter()
        .any(|m| m.id == MatchId(92256) && m.winner_next_match_id.is_none());
    if !unpatched {
        return false;
    }

    log::info!("Patching next matches of event {}", event);

    for m in matches.iter_mut() {
        match m.id.0 {
            92256 | 92257 => m.winner_next_match_id = Some(MatchId(92261)),
            92258 | 92259 => m.winner_next_match_id = Some(MatchId(93237)),
            _ => continue,
        }

        match m.id.0 {
            92256 => m.winner_next_match_team_position = Some(TeamPosition::Team1),
            92259 => m.winner_next_match_team_position = Some(TeamPosition::Team2),
            _ => (),
        }
    }

    true
}
