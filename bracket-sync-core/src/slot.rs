//! # Bracket Slots
//!
//! A [`Slot`] is a single cell of an elimination bracket: one match together with the round and
//! position it occupies and the two progression edges leading out of it. Slots are produced in
//! two stages. The provider adapters emit [`ResolvedSlot`]s, which carry everything except an
//! identity and the edges. Once a [`ResolvedSlot`] has been created in a [`SlotStore`] it becomes
//! a [`Slot`] with a [`SlotId`] that other slots can point to.
//!
//! [`SlotStore`]: crate::store::SlotStore
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Declares a numeric handle. Handles serialize as the bare number and print as it.
macro_rules! id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id! {
    /// A slot created by a [`SlotStore`].
    ///
    /// [`SlotStore`]: crate::store::SlotStore
    SlotId
}

id! {
    /// A provider's match identifier.
    MatchId
}

id! {
    /// A provider's team identifier.
    TeamId
}

id! {
    /// A tournament known to a [`SlotStore`].
    ///
    /// [`SlotStore`]: crate::store::SlotStore
    TournamentId
}

/// The half of a double elimination bracket a slot belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// The winners bracket. Single elimination brackets only have this side.
    Upper,
    /// The losers (or elimination) bracket.
    Lower,
}

impl Side {
    /// Returns the side a round prefix like `WR2`, `LF` or `GF` belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bracket_sync_core::slot::Side;
    /// assert_eq!(Side::from_round_prefix("WR2"), Side::Upper);
    /// assert_eq!(Side::from_round_prefix("GF"), Side::Upper);
    /// assert_eq!(Side::from_round_prefix("LR1"), Side::Lower);
    /// ```
    pub fn from_round_prefix(prefix: &str) -> Self {
        if prefix.starts_with('W') || prefix == GRAND_FINALS {
            Self::Upper
        } else {
            Self::Lower
        }
    }

    /// Returns the side a free-text round name belongs to. Anything mentioning losers or
    /// elimination is [`Lower`], everything else (including grand finals) is [`Upper`].
    ///
    /// [`Lower`]: Self::Lower
    /// [`Upper`]: Self::Upper
    pub fn from_round_name(name: &str) -> Self {
        let name = name.to_lowercase();

        if name.contains("loser") || name.contains("elimination") {
            Self::Lower
        } else {
            Self::Upper
        }
    }

    #[inline]
    pub fn is_upper(self) -> bool {
        matches!(self, Self::Upper)
    }

    #[inline]
    pub fn is_lower(self) -> bool {
        matches!(self, Self::Lower)
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Upper => f.write_str("UPPER"),
            Self::Lower => f.write_str("LOWER"),
        }
    }
}

pub const GRAND_FINALS: &str = "GF";
pub const WINNERS_FINALS: &str = "WF";
pub const LOSERS_FINALS: &str = "LF";

/// Returns `true` if `short_round_name` is one of the three terminal rounds `WF`, `LF` or `GF`.
#[inline]
pub fn is_terminal_round(short_round_name: &str) -> bool {
    matches!(short_round_name, WINNERS_FINALS | LOSERS_FINALS | GRAND_FINALS)
}

/// Builds the key a slot is addressed by in a bracket map file: the short round name alone for
/// the terminal rounds, otherwise `<short round name>-<position>`.
pub fn slot_key(short_round_name: &str, position: u32) -> String {
    if is_terminal_round(short_round_name) {
        short_round_name.to_owned()
    } else {
        format!("{}-{}", short_round_name, position)
    }
}

/// A slot whose round and position are known, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSlot {
    pub match_id: MatchId,
    /// 1-based round number, counted separately for each [`Side`].
    pub round: u32,
    /// 1-based position within the round.
    pub position: u32,
    pub side: Side,
    /// Canonical round code, one of `WR<n>`, `LR<n>`, `WF`, `LF` or `GF`.
    pub short_round_name: String,
    pub round_name: String,
    /// The raw position code the provider used for this slot, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl ResolvedSlot {
    #[inline]
    pub fn key(&self) -> String {
        slot_key(&self.short_round_name, self.position)
    }
}

/// A persisted slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub tournament: TournamentId,
    pub match_id: MatchId,
    pub round: u32,
    pub position: u32,
    pub side: Side,
    pub short_round_name: String,
    pub round_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub next_winner: Option<SlotId>,
    pub next_loser: Option<SlotId>,
}

impl Slot {
    pub fn new(id: SlotId, tournament: TournamentId, slot: &ResolvedSlot) -> Self {
        Self {
            id,
            tournament,
            match_id: slot.match_id,
            round: slot.round,
            position: slot.position,
            side: slot.side,
            short_round_name: slot.short_round_name.clone(),
            round_name: slot.round_name.clone(),
            group: slot.group.clone(),
            next_winner: None,
            next_loser: None,
        }
    }

    #[inline]
    pub fn key(&self) -> String {
        slot_key(&self.short_round_name, self.position)
    }

    /// Returns `true` if either progression edge has been set.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.next_winner.is_some() || self.next_loser.is_some()
    }
}
