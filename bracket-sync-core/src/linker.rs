//! # Bracket Linking
//!
//! Once every slot of a tournament exists, the [`BracketLinker`] sets the progression edges: the
//! slot the winner of each match advances to and the slot its loser drops to. Irregular brackets
//! are wired from a hand-authored [`BracketMap`], everything else is inferred from the round and
//! position arithmetic of the slots.
//!
//! Slots of different groups are linked independently of each other.
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::slot::{
    ResolvedSlot, Side, Slot, SlotId, TournamentId, GRAND_FINALS, LOSERS_FINALS, WINNERS_FINALS,
};
use crate::store::SlotStore;
use crate::{Error, Result};

/// The edges of a single map entry, given as slot keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    #[serde(rename = "W")]
    pub winner: Option<String>,
    #[serde(rename = "L")]
    pub loser: Option<String>,
}

/// A hand-authored bracket layout keyed by slot key (see [`slot_key`]).
///
/// [`slot_key`]: crate::slot::slot_key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BracketMap {
    entries: HashMap<String, MapEntry>,
}

impl BracketMap {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the map at `path`.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        let json = fs::read_to_string(path).map_err(|source| Error::MapFile {
            file: path.to_owned(),
            source,
        })?;

        Self::from_json(&json)
    }

    pub fn get(&self, key: &str) -> Option<&MapEntry> {
        self.entries.get(key)
    }
}

/// The progression edges computed for one slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Edges {
    pub slot: SlotId,
    pub next_winner: Option<SlotId>,
    pub next_loser: Option<SlotId>,
}

/// A lower side round with more slots than the lower side round before it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShrinkageViolation {
    pub group: Option<String>,
    pub round: String,
    pub slots: usize,
    pub previous_slots: usize,
}

/// The outcome of [`BracketLinker::link`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkReport {
    /// The tournament already had edges, nothing was changed.
    AlreadyLinked,
    Linked {
        /// Number of non-null edges set.
        edges: usize,
        /// Rounds that break the shrinkage of the lower side. These brackets should get a
        /// bracket map instead of relying on inferred edges.
        shrinkage: Vec<ShrinkageViolation>,
    },
}

/// Builds the progression edges of a tournament's slots.
#[derive(Clone, Debug)]
pub struct BracketLinker {
    map_dir: PathBuf,
}

impl BracketLinker {
    /// Creates a new `BracketLinker` loading map files from `map_dir`.
    pub fn new<P>(map_dir: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            map_dir: map_dir.into(),
        }
    }

    /// Links all slots of `tournament`. When `map_file` is given, the edges are taken from that
    /// map, otherwise they are inferred geometrically.
    ///
    /// All edges are computed before the first one is written, so a failing tournament keeps no
    /// partial edges. Tournaments that already have edges are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the map file cannot be loaded, a slot has no entry in it
    /// ([`Error::MissingMapKey`]) or an entry names an unknown slot
    /// ([`Error::UnresolvedMapTarget`]).
    pub fn link<S>(
        &self,
        store: &mut S,
        tournament: TournamentId,
        map_file: Option<&str>,
    ) -> Result<LinkReport>
    where
        S: SlotStore + ?Sized,
    {
        let slots = store.slots(tournament);

        if slots.iter().any(Slot::is_linked) {
            log::info!("Tournament {} is already linked", tournament);
            return Ok(LinkReport::AlreadyLinked);
        }

        let mut groups: BTreeMap<Option<&str>, Vec<&Slot>> = BTreeMap::new();
        for slot in &slots {
            groups.entry(slot.group.as_deref()).or_default().push(slot);
        }

        let mut edges = Vec::with_capacity(slots.len());
        let mut shrinkage = Vec::new();

        match map_file {
            Some(file) => {
                let path = self.map_dir.join(file);
                log::info!("Linking tournament {} from map {}", tournament, path.display());

                let map = BracketMap::load(&path)?;
                for slots in groups.values() {
                    edges.extend(map_edges(slots, &map, &path)?);
                }
            }
            None => {
                log::info!("Linking tournament {}", tournament);

                for (group, slots) in &groups {
                    let rounds = BracketRounds::new(slots);

                    shrinkage.extend(rounds.shrinkage_violations(*group));
                    edges.extend(rounds.edges());
                }
            }
        }

        for violation in &shrinkage {
            log::warn!(
                "Lower round {} of tournament {} has {} slots after a round with {}, its inferred edges need a bracket map",
                violation.round,
                tournament,
                violation.slots,
                violation.previous_slots
            );
        }

        let mut count = 0;
        for edge in &edges {
            log::debug!(
                "Slot {}: winner {:?}, loser {:?}",
                edge.slot,
                edge.next_winner,
                edge.next_loser
            );

            store.set_edges(edge.slot, edge.next_winner, edge.next_loser)?;
            count += edge.next_winner.is_some() as usize + edge.next_loser.is_some() as usize;
        }

        Ok(LinkReport::Linked {
            edges: count,
            shrinkage,
        })
    }

    /// Verifies that `slots` can be linked from `map_file` before any of them is persisted: the
    /// map loads, every slot has an entry and every entry names a slot of the same group.
    /// Geometric linking cannot fail, so without a map file this always succeeds.
    ///
    /// # Errors
    ///
    /// Returns the error [`link`] would fail with for the same slots.
    ///
    /// [`link`]: Self::link
    pub fn check(&self, slots: &[ResolvedSlot], map_file: Option<&str>) -> Result<()> {
        let Some(file) = map_file else {
            return Ok(());
        };

        let path = self.map_dir.join(file);
        let map = BracketMap::load(&path)?;

        let mut groups: BTreeMap<Option<&str>, Vec<(String, ())>> = BTreeMap::new();
        for slot in slots {
            groups
                .entry(slot.group.as_deref())
                .or_default()
                .push((slot.key(), ()));
        }

        for keyed in groups.values() {
            resolve_map(keyed, &map, &path)?;
        }

        Ok(())
    }
}

/// Resolves the edges of `slots` from `map`.
///
/// # Errors
///
/// Returns [`Error::MissingMapKey`] if any slot has no entry in `map` and
/// [`Error::UnresolvedMapTarget`] if an entry points at a key none of `slots` has.
pub fn map_edges(slots: &[&Slot], map: &BracketMap, file: &Path) -> Result<Vec<Edges>> {
    let keyed: Vec<(String, SlotId)> = slots.iter().map(|slot| (slot.key(), slot.id)).collect();

    Ok(resolve_map(&keyed, map, file)?
        .into_iter()
        .map(|(slot, next_winner, next_loser)| Edges {
            slot,
            next_winner,
            next_loser,
        })
        .collect())
}

/// Looks up the entry of every key in `map` and resolves both of its targets to the value of the
/// key they name. Returns `(value, winner, loser)` in the order of `keyed`.
fn resolve_map<T>(
    keyed: &[(String, T)],
    map: &BracketMap,
    file: &Path,
) -> Result<Vec<(T, Option<T>, Option<T>)>>
where
    T: Copy,
{
    let values: HashMap<&str, T> = keyed
        .iter()
        .map(|(key, value)| (key.as_str(), *value))
        .collect();

    let resolve = |key: &str, target: &Option<String>| -> Result<Option<T>> {
        match target {
            Some(target) => match values.get(target.as_str()) {
                Some(value) => Ok(Some(*value)),
                None => Err(Error::UnresolvedMapTarget {
                    file: file.to_owned(),
                    key: key.to_owned(),
                    target: target.clone(),
                }),
            },
            None => Ok(None),
        }
    };

    let mut resolved = Vec::with_capacity(keyed.len());
    for (key, value) in keyed {
        let entry = map.get(key).ok_or_else(|| Error::MissingMapKey {
            key: key.clone(),
            file: file.to_owned(),
        })?;

        resolved.push((
            *value,
            resolve(key, &entry.winner)?,
            resolve(key, &entry.loser)?,
        ));
    }

    Ok(resolved)
}

/// Sort value of a short round name: the round number, with the finals after every round.
fn round_sort_value(short_round_name: &str) -> u32 {
    match short_round_name {
        GRAND_FINALS => u32::MAX,
        WINNERS_FINALS | LOSERS_FINALS => 10000,
        name => name
            .strip_prefix("WR")
            .or_else(|| name.strip_prefix("LR"))
            .and_then(|number| number.parse().ok())
            .unwrap_or(0),
    }
}

#[derive(Debug)]
struct Round<'a> {
    name: &'a str,
    /// Ordered by position.
    slots: Vec<&'a Slot>,
}

#[derive(Debug)]
struct BracketRounds<'a> {
    upper: Vec<Round<'a>>,
    lower: Vec<Round<'a>>,
}

impl<'a> BracketRounds<'a> {
    fn new(slots: &[&'a Slot]) -> Self {
        let mut upper: Vec<Round<'a>> = Vec::new();
        let mut lower: Vec<Round<'a>> = Vec::new();

        for &slot in slots {
            let rounds = match slot.side {
                Side::Upper => &mut upper,
                Side::Lower => &mut lower,
            };

            match rounds
                .iter_mut()
                .find(|round| round.name == slot.short_round_name)
            {
                Some(round) => round.slots.push(slot),
                None => rounds.push(Round {
                    name: &slot.short_round_name,
                    slots: vec![slot],
                }),
            }
        }

        for rounds in [&mut upper, &mut lower] {
            rounds.sort_by_key(|round| (round_sort_value(round.name), round.name));

            for round in rounds.iter_mut() {
                round.slots.sort_by_key(|slot| slot.position);
            }
        }

        Self { upper, lower }
    }

    fn side(&self, side: Side) -> &[Round<'a>] {
        match side {
            Side::Upper => &self.upper,
            Side::Lower => &self.lower,
        }
    }

    fn first_slot(&self, name: &str) -> Option<SlotId> {
        self.upper
            .iter()
            .chain(self.lower.iter())
            .find(|round| round.name == name)
            .and_then(|round| round.slots.first())
            .map(|slot| slot.id)
    }

    /// The number of lower rounds separating two upper rounds.
    fn drop_offset(&self) -> usize {
        (self.lower.len() + 1)
            .saturating_sub(self.upper.len())
            .max(1)
    }

    fn edges(&self) -> Vec<Edges> {
        let grand_finals = self.first_slot(GRAND_FINALS);

        let mut edges = Vec::new();
        for side in [Side::Upper, Side::Lower] {
            let rounds = self.side(side);

            for (index, round) in rounds.iter().enumerate() {
                for slot in &round.slots {
                    edges.push(Edges {
                        slot: slot.id,
                        next_winner: self.next_winner(rounds, index, slot, grand_finals),
                        next_loser: self.next_loser(index, slot),
                    });
                }
            }
        }

        edges
    }

    fn next_winner(
        &self,
        rounds: &[Round<'a>],
        index: usize,
        slot: &Slot,
        grand_finals: Option<SlotId>,
    ) -> Option<SlotId> {
        match slot.short_round_name.as_str() {
            GRAND_FINALS => return None,
            WINNERS_FINALS | LOSERS_FINALS => return grand_finals,
            _ => (),
        }

        let Some(next) = rounds.get(index + 1) else {
            let terminal = match slot.side {
                Side::Upper => WINNERS_FINALS,
                Side::Lower => LOSERS_FINALS,
            };

            return self.first_slot(terminal).or(grand_finals);
        };

        let current = rounds[index].slots.len();
        let count = next.slots.len();
        let offset = slot.position.saturating_sub(1) as usize;

        let target = match slot.side {
            Side::Lower if current == count => offset,
            Side::Lower if count * 2 == current => offset / 2,
            _ => offset * count / current,
        };

        next.slots.get(target).map(|slot| slot.id)
    }

    fn next_loser(&self, index: usize, slot: &Slot) -> Option<SlotId> {
        if slot.side.is_lower() || slot.short_round_name == GRAND_FINALS || self.lower.is_empty() {
            return None;
        }

        let target = (index + self.drop_offset()).min(self.lower.len() - 1);

        match self.lower.get(target) {
            Some(round) if !round.slots.is_empty() => {
                let count = round.slots.len();
                let offset = slot.position.saturating_sub(1) as usize;

                let position = (count / 2 + offset / 2).min(count - 1);
                Some(round.slots[position].id)
            }
            _ => self.first_slot(LOSERS_FINALS),
        }
    }

    fn shrinkage_violations(&self, group: Option<&str>) -> Vec<ShrinkageViolation> {
        self.lower
            .windows(2)
            .filter(|pair| pair[1].slots.len() > pair[0].slots.len())
            .map(|pair| ShrinkageViolation {
                group: group.map(str::to_owned),
                round: pair[1].name.to_owned(),
                slots: pair[1].slots.len(),
                previous_slots: pair[0].slots.len(),
            })
            .collect()
    }
}
