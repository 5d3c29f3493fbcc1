//! # bracket-sync-core
//!
//! This crate reconstructs the topology of elimination brackets from esports schedule providers
//! that never expose it directly. It turns a provider's description of a bracket (free-text round
//! labels, position codes or forward "next match" pointers) into [`Slot`]s with a round, a
//! position and the two progression edges leading out of them.
//!
//! Important items:
//! - [`TemplateFormat`]: Recovers round names from HTML bracket templates.
//! - [`resolve_positions`]: Turns position codes like `WR2-M3` into round and position numbers.
//! - [`BackwardMatchSequencer`]: Orders matches of a feed that only has next-match pointers.
//! - [`BracketLinker`]: Builds the winner and loser edges, either from a map file or
//!   geometrically.
//! - [`Ingest`]: Runs the whole pipeline against a [`SlotStore`].
//!
//! [`Slot`]: slot::Slot
//! [`TemplateFormat`]: labels::TemplateFormat
//! [`resolve_positions`]: position::resolve_positions
//! [`BackwardMatchSequencer`]: sequencer::BackwardMatchSequencer
//! [`BracketLinker`]: linker::BracketLinker
//! [`Ingest`]: sync::Ingest
//! [`SlotStore`]: store::SlotStore
pub mod labels;
pub mod linker;
pub mod patches;
pub mod position;
pub mod provider;
pub mod sequencer;
pub mod slot;
pub mod store;
pub mod sync;

use std::io;
use std::path::PathBuf;
use std::result;

use thiserror::Error;

use slot::{MatchId, SlotId};

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

/// An error failing the reconstruction of a whole bracket.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unrecognized round name \"{0}\"")]
    UnrecognizedRoundName(String),
    #[error("cannot order matches {first} and {second} in round \"{round}\"")]
    AmbiguousMatchOrdering {
        round: String,
        first: MatchId,
        second: MatchId,
    },
    #[error("slot \"{key}\" is missing from map {}", file.display())]
    MissingMapKey { key: String, file: PathBuf },
    #[error("map {} links \"{key}\" to unknown slot \"{target}\"", file.display())]
    UnresolvedMapTarget {
        file: PathBuf,
        key: String,
        target: String,
    },
    #[error("no rounds extracted from bracket \"{bracket}\": {reason}")]
    EmptyExtraction { bracket: String, reason: String },
    #[error("invalid position \"{0}\"")]
    InvalidPosition(String),
    #[error("position \"{0}\" is held by more than one match")]
    DuplicatePosition(String),
    #[error("invalid selector {0}")]
    InvalidSelector(String),
    #[error("unknown slot {0}")]
    UnknownSlot(SlotId),
    #[error("failed to read map {}: {source}", file.display())]
    MapFile {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}
