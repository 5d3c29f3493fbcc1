//! Persistence of bracket slots.
use std::collections::HashMap;

use crate::slot::{ResolvedSlot, Slot, SlotId, TournamentId};
use crate::{Error, Result};

/// A repository of slots.
///
/// Slots are created once and never change shape afterwards; only their two progression edges
/// are set, once, by the [`BracketLinker`].
///
/// [`BracketLinker`]: crate::linker::BracketLinker
pub trait SlotStore {
    /// Returns the tournament called `name` below `parent`, creating it if it does not exist yet.
    fn tournament(&mut self, name: &str, parent: Option<TournamentId>) -> Result<TournamentId>;

    /// Creates a new slot in `tournament` and returns its handle.
    fn create_slot(&mut self, tournament: TournamentId, slot: &ResolvedSlot) -> Result<SlotId>;

    /// Returns all slots of `tournament` in creation order.
    fn slots(&self, tournament: TournamentId) -> Vec<Slot>;

    /// Sets the progression edges of the slot `id`.
    fn set_edges(
        &mut self,
        id: SlotId,
        next_winner: Option<SlotId>,
        next_loser: Option<SlotId>,
    ) -> Result<()>;
}

/// A [`SlotStore`] keeping all slots in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tournaments: Vec<(String, Option<TournamentId>)>,
    slots: Vec<Slot>,
    index: HashMap<SlotId, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.index.get(&id).map(|index| &self.slots[*index])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SlotStore for MemoryStore {
    fn tournament(&mut self, name: &str, parent: Option<TournamentId>) -> Result<TournamentId> {
        let index = match self
            .tournaments
            .iter()
            .position(|(n, p)| n == name && *p == parent)
        {
            Some(index) => index,
            None => {
                self.tournaments.push((name.to_owned(), parent));
                self.tournaments.len() - 1
            }
        };

        Ok(TournamentId(index as u64 + 1))
    }

    fn create_slot(&mut self, tournament: TournamentId, slot: &ResolvedSlot) -> Result<SlotId> {
        let id = SlotId(self.slots.len() as u64 + 1);

        self.index.insert(id, self.slots.len());
        self.slots.push(Slot::new(id, tournament, slot));

        Ok(id)
    }

    fn slots(&self, tournament: TournamentId) -> Vec<Slot> {
        self.slots
            .iter()
            .filter(|slot| slot.tournament == tournament)
            .cloned()
            .collect()
    }

    fn set_edges(
        &mut self,
        id: SlotId,
        next_winner: Option<SlotId>,
        next_loser: Option<SlotId>,
    ) -> Result<()> {
        let index = *self.index.get(&id).ok_or(Error::UnknownSlot(id))?;

        let slot = &mut self.slots[index];
        slot.next_winner = next_winner;
        slot.next_loser = next_loser;

        Ok(())
    }
}
