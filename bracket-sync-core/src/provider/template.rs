//! # Template Brackets
//!
//! Brackets published as an HTML template together with a flat list of matches, each carrying a
//! position code like `WR2-M1`. Round names only exist in the template, see [`TemplateFormat`].
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    bracket_map_file, BracketSource, BracketType, TournamentBracket, TournamentFormat,
    GROUP_QUALIFIER_MAP,
};
use crate::labels::{RoundLabel, TemplateFormat};
use crate::patches;
use crate::position::{correct_alt_single_elimination, discard_rogue_positions, resolve_positions};
use crate::slot::{MatchId, ResolvedSlot, TeamId};
use crate::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    #[serde(default)]
    pub id: Option<TeamId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub abbreviated_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketMatch {
    pub id: MatchId,
    pub bracket_position: String,
    #[serde(default)]
    pub scores: Vec<u32>,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub link: Option<String>,
}

/// A single elimination or double elimination bracket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardBracket {
    pub title: String,
    pub html_template: String,
    pub matches: Vec<BracketMatch>,
    /// The year of the season the bracket belongs to.
    #[serde(skip)]
    pub season_year: Option<u16>,
}

impl StandardBracket {
    pub fn with_season_year(mut self, year: Option<u16>) -> Self {
        self.season_year = year;
        self
    }
}

impl BracketSource for StandardBracket {
    fn name(&self) -> &str {
        &self.title
    }

    fn into_bracket(mut self) -> Result<TournamentBracket> {
        log::info!("Reconstructing bracket \"{}\"", self.title);

        patches::fix_2022_major_1(&self.title, &mut self.matches);
        discard_rogue_positions(&mut self.matches, |m| m.bracket_position.as_str());

        let mut codes: Vec<String> = self
            .matches
            .iter()
            .map(|m| m.bracket_position.clone())
            .collect();
        let markup = correct_alt_single_elimination(&mut codes, &self.html_template)?;

        let ids: Vec<MatchId> = self.matches.iter().map(|m| m.id).collect();
        let format = TemplateFormat::detect(&self.title, self.season_year);

        let slots = if codes.is_empty() {
            Vec::new()
        } else {
            let labels = format.extract_headings(&self.title, &markup, &codes)?;
            resolve_slots(&self.title, &ids, &codes, &labels, None)?
        };

        Ok(TournamentBracket {
            id: None,
            format: TournamentFormat::Bracket,
            bracket_type: Some(BracketType::of(&slots)),
            map_file: bracket_map_file(&self.title).map(str::to_owned),
            name: self.title,
            slots,
            groups: Vec::new(),
            matches: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPosition {
    pub match_id: MatchId,
    pub bracket_position: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPositions {
    pub group_label: String,
    pub matches: Vec<GroupPosition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTeam {
    #[serde(default)]
    pub id: Option<TeamId>,
    #[serde(default)]
    pub large_text: Option<String>,
    #[serde(default)]
    pub small_text: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapedMatch {
    /// The match id, as a string.
    pub match_id: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub teams: Vec<GroupTeam>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapedGroup {
    pub group_label: String,
    pub matches: Vec<ShapedMatch>,
}

/// A group play stage. Every group is its own bracket sharing the same template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBracket {
    pub title: String,
    pub html_template: String,
    pub groups: Vec<GroupPositions>,
    pub shaped_matches: Vec<ShapedGroup>,
    #[serde(skip)]
    pub season_year: Option<u16>,
}

impl GroupBracket {
    pub fn with_season_year(mut self, year: Option<u16>) -> Self {
        self.season_year = year;
        self
    }

    fn group(&self, format: TemplateFormat, group: &GroupPositions) -> Result<TournamentBracket> {
        let mut positions = group.matches.clone();
        discard_rogue_positions(&mut positions, |p| p.bracket_position.as_str());

        let codes: Vec<String> = positions
            .iter()
            .map(|p| p.bracket_position.clone())
            .collect();
        let ids: Vec<MatchId> = positions.iter().map(|p| p.match_id).collect();

        let name = format!("{} {}", self.title, group.group_label);
        let labels = format.extract_headings(&name, &self.html_template, &codes)?;
        let slots = resolve_slots(&name, &ids, &codes, &labels, Some(&group.group_label))?;

        Ok(TournamentBracket {
            id: None,
            name: group.group_label.clone(),
            format: TournamentFormat::Bracket,
            bracket_type: Some(BracketType::of(&slots)),
            slots,
            map_file: Some(GROUP_QUALIFIER_MAP.to_owned()),
            groups: Vec::new(),
            matches: Vec::new(),
        })
    }
}

impl BracketSource for GroupBracket {
    fn name(&self) -> &str {
        &self.title
    }

    fn into_bracket(self) -> Result<TournamentBracket> {
        log::info!("Reconstructing group bracket \"{}\"", self.title);

        let positioned: HashMap<String, &str> = self
            .groups
            .iter()
            .flat_map(|group| {
                group
                    .matches
                    .iter()
                    .map(move |m| (m.match_id.to_string(), group.group_label.as_str()))
            })
            .collect();

        for shaped in &self.shaped_matches {
            for m in &shaped.matches {
                if !positioned.contains_key(m.match_id.trim()) {
                    log::warn!(
                        "Match {} of group {} has no bracket position",
                        m.match_id,
                        shaped.group_label
                    );
                }
            }
        }

        let format = TemplateFormat::detect(&self.title, self.season_year);

        let groups = self
            .groups
            .iter()
            .map(|group| self.group(format, group))
            .collect::<Result<Vec<_>>>()?;

        Ok(TournamentBracket {
            id: None,
            name: self.title,
            format: TournamentFormat::Bracket,
            bracket_type: None,
            slots: Vec::new(),
            map_file: None,
            groups,
            matches: Vec::new(),
        })
    }
}

/// Joins matches, their position codes and the round labels into slots.
fn resolve_slots(
    title: &str,
    ids: &[MatchId],
    codes: &[String],
    labels: &[RoundLabel],
    group: Option<&str>,
) -> Result<Vec<ResolvedSlot>> {
    let names: HashMap<usize, &str> = labels
        .iter()
        .map(|label| (label.position, label.round_name.as_str()))
        .collect();

    let positions = resolve_positions(codes)?;

    let mut slots = Vec::with_capacity(codes.len());
    for (index, ((id, code), position)) in ids.iter().zip(codes).zip(positions).enumerate() {
        let round_name = names
            .get(&(index + 1))
            .ok_or_else(|| Error::EmptyExtraction {
                bracket: title.to_owned(),
                reason: format!("no round label for position \"{}\"", code),
            })?;

        log::debug!(
            "Slot {} ({} {}): match {}",
            code,
            position.side,
            position.round,
            id
        );

        slots.push(ResolvedSlot {
            match_id: *id,
            round: position.round,
            position: position.position,
            side: position.side,
            short_round_name: position.prefix,
            round_name: (*round_name).to_owned(),
            position_code: Some(code.clone()),
            group: group.map(str::to_owned),
        });
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::provider::{BracketSource, BracketType, GROUP_QUALIFIER_MAP};
    use crate::slot::{MatchId, Side};
    use crate::Error;

    use super::{GroupBracket, StandardBracket};

    const INLINE_TEMPLATE: &str = r#"
        <div class="round">
            <div data-position="1"><span class="round-label">Winners Round 1</span></div>
            <div data-position="2"></div>
            <div data-position="3"></div>
            <div data-position="4"></div>
        </div>
        <div class="round">
            <div data-position="5"><span class="round-label">Winners Round 2</span></div>
            <div data-position="6"></div>
        </div>
        <div class="round">
            <div data-position="7"><span class="round-label">Elimination Round 1</span></div>
            <div data-position="8"></div>
        </div>
        <div class="round">
            <div data-position="9"><span class="round-label">Winners Finals</span></div>
            <div data-position="10"><span class="round-label">Elimination Finals</span></div>
            <div data-position="11"><span class="round-label">Grand Finals</span></div>
        </div>
    "#;

    fn standard(title: &str, template: &str, positions: &[&str]) -> StandardBracket {
        let json = serde_json::json!({
            "title": title,
            "htmlTemplate": template,
            "matches": (positions
                .iter()
                .enumerate()
                .map(|(index, position)| serde_json::json!({
                    "id": 100 + index as u64,
                    "bracketPosition": position,
                    "scores": [3, 1],
                    "competitors": [{"id": 1, "name": "A"}, {"name": "TBD"}],
                    "status": "COMPLETED",
                    "startDate": 1700000000000i64,
                }))
                .collect::<Vec<_>>()),
        });

        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_standard_bracket() {
        let bracket = standard(
            "2024 Major 2 Bracket",
            INLINE_TEMPLATE,
            &[
                "WR1-M1", "WR1-M2", "WR1-M3", "WR1-M4", "WR2-M1", "WR2-M2", "LR1-M1", "LR1-M2",
                "WF", "LF", "GF",
            ],
        )
        .into_bracket()
        .unwrap();

        assert_eq!(bracket.bracket_type, Some(BracketType::DoubleElimination));
        assert_eq!(bracket.slots.len(), 11);

        let slot = &bracket.slots[5];
        assert_eq!(slot.match_id, MatchId(105));
        assert_eq!(
            (slot.side, slot.round, slot.position),
            (Side::Upper, 2, 2)
        );
        assert_eq!(slot.short_round_name, "WR2");
        assert_eq!(slot.round_name, "Winners Round 2");

        let slot = &bracket.slots[9];
        assert_eq!((slot.side, slot.round, slot.position), (Side::Lower, 2, 1));
        assert_eq!(slot.short_round_name, "LF");
        assert_eq!(slot.round_name, "Elimination Finals");
    }

    #[test]
    fn test_standard_bracket_properties() {
        let bracket = standard(
            "2024 Major 2 Bracket",
            INLINE_TEMPLATE,
            &[
                "WR1-M1", "WR1-M2", "WR1-M3", "WR1-M4", "WR2-M1", "WR2-M2", "LR1-M1", "LR1-M2",
                "WF", "LF", "GF",
            ],
        )
        .into_bracket()
        .unwrap();

        let mut rounds: HashMap<(Side, u32), Vec<u32>> = HashMap::new();
        for slot in &bracket.slots {
            rounds.entry((slot.side, slot.round)).or_default().push(slot.position);
        }

        for side in [Side::Upper, Side::Lower] {
            let mut numbers: Vec<u32> = rounds
                .keys()
                .filter(|(s, _)| *s == side)
                .map(|(_, round)| *round)
                .collect();
            numbers.sort_unstable();
            let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
            assert_eq!(numbers, expected);
        }

        for positions in rounds.values_mut() {
            positions.sort_unstable();
            let expected: Vec<u32> = (1..=positions.len() as u32).collect();
            assert_eq!(*positions, expected);
        }
    }

    #[test]
    fn test_standard_bracket_rogue_position() {
        let template = r#"
            <h3>Semifinals</h3>
            <div data-position="1"></div>
            <div data-position="2"></div>
            <h3>Finals</h3>
            <div data-position="3"></div>
        "#;

        let bracket = standard("2021 Champs Bracket", template, &["WR1-M1", "zero", "WR1-M2", "GF"])
            .into_bracket()
            .unwrap();

        assert_eq!(bracket.bracket_type, Some(BracketType::SingleElimination));
        let codes: Vec<&str> = bracket
            .slots
            .iter()
            .map(|slot| slot.position_code.as_deref().unwrap())
            .collect();
        assert_eq!(codes, ["WR1-M1", "WR1-M2", "GF"]);
        assert!(bracket.slots.iter().all(|slot| slot.match_id != MatchId(101)));
        assert_eq!(bracket.slots[2].round_name, "Finals");
    }

    #[test]
    fn test_standard_bracket_alt_single_elimination() {
        let template = r#"
            <div class="bracket-round R1"><p class="round-name">Quarterfinals</p></div>
            <div class="bracket-round SF"><p class="round-name">Semifinals</p></div>
            <div class="bracket-round Finals"><p class="round-name">Finals</p></div>
        "#;

        let bracket = standard(
            "2022 Major 4 Bracket",
            template,
            &["R1-M1", "R1-M2", "R1-M3", "R1-M4", "SF-M1", "SF-M2", "GF"],
        )
        .into_bracket()
        .unwrap();

        let slots: Vec<(&str, u32, &str)> = bracket
            .slots
            .iter()
            .map(|s| (s.short_round_name.as_str(), s.position, s.round_name.as_str()))
            .collect();

        assert_eq!(
            slots,
            [
                ("WR1", 1, "Quarterfinals"),
                ("WR1", 2, "Quarterfinals"),
                ("WR1", 3, "Quarterfinals"),
                ("WR1", 4, "Quarterfinals"),
                ("WR2", 1, "Semifinals"),
                ("WR2", 2, "Semifinals"),
                ("GF", 1, "Finals"),
            ]
        );
    }

    #[test]
    fn test_standard_bracket_major_1_2022() {
        let template = r#"
            <div class="bracket-round WR1"><p class="round-name">Winners Round 1</p></div>
            <div class="bracket-round GF"><p class="round-name">Grand Finals</p></div>
        "#;

        let bracket = standard("2022 Major 1 Bracket", template, &["WR1-M1", "WR1-M2", "GF"])
            .into_bracket()
            .unwrap();

        let ids: Vec<MatchId> = bracket.slots.iter().map(|s| s.match_id).collect();
        assert_eq!(ids, [MatchId(5740), MatchId(5741), MatchId(102)]);
    }

    #[test]
    fn test_standard_bracket_map_file() {
        let template = r#"
            <div data-position="1"><span class="round-label">Semifinals</span></div>
            <div data-position="2"></div>
            <div data-position="3"><span class="round-label">Finals</span></div>
        "#;

        let bracket = standard("Kickoff Classic Bracket", template, &["WR1-M1", "WR1-M2", "GF"])
            .into_bracket()
            .unwrap();
        assert_eq!(bracket.map_file.as_deref(), Some("2022_kickoff_classic.json"));

        let bracket = standard("2024 Major 2 Bracket", template, &["WR1-M1", "WR1-M2", "GF"])
            .into_bracket()
            .unwrap();
        assert_eq!(bracket.map_file, None);
    }

    #[test]
    fn test_standard_bracket_duplicate_position() {
        let result = standard("2024 Major 2 Bracket", INLINE_TEMPLATE, &["WR1-M1", "WR1-M1", "GF"])
            .into_bracket();

        assert!(matches!(result, Err(Error::DuplicatePosition(code)) if code == "WR1-M1"));
    }

    #[test]
    fn test_standard_bracket_empty_extraction() {
        let result = standard("2024 Major 3 Bracket", "<div></div>", &["WR1-M1", "GF"])
            .into_bracket();

        assert!(matches!(result, Err(Error::EmptyExtraction { .. })));
    }

    #[test]
    fn test_group_bracket() {
        let template = r#"
            <div data-position="1"><b class="round-label">Winners Round 1</b></div>
            <div data-position="2"></div>
            <div data-position="3"><b class="round-label">Winners Qualifier Round</b></div>
            <div data-position="4"><b class="round-label">Elimination Round 1</b></div>
            <div data-position="5"><b class="round-label">Elimination Qualifier Round</b></div>
        "#;

        let group = |label: &str, first: u64| {
            serde_json::json!({
                "groupLabel": label,
                "matches": (["WR1-M1", "WR1-M2", "WR2-M1", "LR1-M1", "LR2-M1"]
                    .iter()
                    .enumerate()
                    .map(|(i, p)| serde_json::json!({"matchId": first + i as u64, "bracketPosition": p}))
                    .collect::<Vec<_>>()),
            })
        };

        let json = serde_json::json!({
            "title": "2023 Major 1 Qualifiers",
            "htmlTemplate": template,
            "groups": [group("A", 10), group("B", 20)],
            "shapedMatches": [{
                "groupLabel": "A",
                "matches": [{"matchId": "10", "href": "/match/10", "startDate": 0, "teams": []}],
            }],
        });

        let bracket: GroupBracket = serde_json::from_value(json).unwrap();
        let bracket = bracket.into_bracket().unwrap();

        assert!(bracket.slots.is_empty());
        assert_eq!(bracket.groups.len(), 2);

        let b = &bracket.groups[1];
        assert_eq!(b.name, "B");
        assert_eq!(b.map_file.as_deref(), Some(GROUP_QUALIFIER_MAP));
        assert_eq!(b.bracket_type, Some(BracketType::DoubleElimination));
        assert!(b.slots.iter().all(|slot| slot.group.as_deref() == Some("B")));

        let keys: Vec<String> = b.slots.iter().map(|slot| slot.key()).collect();
        assert_eq!(keys, ["WR1-1", "WR1-2", "WR2-1", "LR1-1", "LR2-1"]);
        assert_eq!(b.slots[2].round_name, "Winners Qualifier Round");
        assert_eq!(b.slots[2].match_id, MatchId(22));
    }
}
