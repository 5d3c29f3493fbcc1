//! # Ingestion
//!
//! Persists reconstructed brackets and links them. Every tournament is processed on its own: a
//! tournament failing to reconstruct or link is reported and skipped, the others continue.
use crate::linker::{BracketLinker, LinkReport};
use crate::provider::{BracketSource, TournamentBracket, TournamentFormat};
use crate::slot::TournamentId;
use crate::store::SlotStore;
use crate::{Error, Result};

/// The outcome of ingesting a single tournament.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub tournament: TournamentId,
    pub name: String,
    /// Number of slots created in this run.
    pub created: usize,
    /// `None` if linking did not run.
    pub link: Option<LinkReport>,
    pub groups: Vec<SyncReport>,
}

/// The outcome of [`Ingest::sync_all`].
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub synced: Vec<SyncReport>,
    /// Tournaments that were skipped, by name.
    pub failed: Vec<(String, Error)>,
}

impl SyncSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs brackets through a [`SlotStore`].
#[derive(Debug)]
pub struct Ingest<S>
where
    S: SlotStore,
{
    store: S,
    linker: BracketLinker,
}

impl<S> Ingest<S>
where
    S: SlotStore,
{
    pub fn new(store: S, linker: BracketLinker) -> Self {
        Self { store, linker }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persists the slots of `bracket` and links them, then does the same for every group of
    /// `bracket` as a child tournament.
    ///
    /// The bracket maps of `bracket` and all of its groups are verified before anything is
    /// persisted. Slots are only created if the tournament has none yet. Linking runs for every
    /// bracket tournament with slots and leaves tournaments that already have edges untouched, so
    /// slots left unlinked by an earlier run get their edges on the next one.
    pub fn sync_tournament(
        &mut self,
        bracket: &TournamentBracket,
        parent: Option<TournamentId>,
    ) -> Result<SyncReport> {
        self.check(bracket)?;
        self.persist(bracket, parent)
    }

    fn check(&self, bracket: &TournamentBracket) -> Result<()> {
        if bracket.format == TournamentFormat::Bracket {
            self.linker
                .check(&bracket.slots, bracket.map_file.as_deref())?;
        }

        bracket
            .groups
            .iter()
            .try_for_each(|group| self.check(group))
    }

    fn persist(
        &mut self,
        bracket: &TournamentBracket,
        parent: Option<TournamentId>,
    ) -> Result<SyncReport> {
        log::info!(
            "Syncing{}tournament \"{}\"",
            if parent.is_some() { " group " } else { " " },
            bracket.name
        );

        let tournament = self.store.tournament(&bracket.name, parent)?;

        let existing = self.store.slots(tournament).len();

        let mut created = 0;
        if existing > 0 {
            log::debug!("Bracket slots of \"{}\" already exist", bracket.name);
        } else {
            for slot in &bracket.slots {
                log::debug!(
                    "Creating bracket slot {} {} for match {}",
                    slot.short_round_name,
                    slot.position,
                    slot.match_id
                );

                self.store.create_slot(tournament, slot)?;
                created += 1;
            }
        }

        let link = if existing + created > 0 && bracket.format == TournamentFormat::Bracket {
            Some(
                self.linker
                    .link(&mut self.store, tournament, bracket.map_file.as_deref())?,
            )
        } else {
            None
        };

        let mut groups = Vec::with_capacity(bracket.groups.len());
        for group in &bracket.groups {
            groups.push(self.persist(group, Some(tournament))?);
        }

        Ok(SyncReport {
            tournament,
            name: bracket.name.clone(),
            created,
            link,
            groups,
        })
    }

    /// Reconstructs and syncs every source in order. Failing sources are logged and skipped.
    pub fn sync_all<I, B>(&mut self, sources: I) -> SyncSummary
    where
        I: IntoIterator<Item = B>,
        B: BracketSource,
    {
        let mut summary = SyncSummary::default();

        for source in sources {
            let name = source.name().to_owned();

            let result = source
                .into_bracket()
                .and_then(|bracket| self.sync_tournament(&bracket, None));

            match result {
                Ok(report) => summary.synced.push(report),
                Err(err) => {
                    log::error!("Skipping tournament \"{}\": {}", name, err);
                    summary.failed.push((name, err));
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use crate::linker::{BracketLinker, LinkReport};
    use crate::provider::{
        BracketSource, BracketType, Payload, TournamentBracket, TournamentFormat,
        GROUP_QUALIFIER_MAP,
    };
    use crate::slot::{MatchId, ResolvedSlot, Side};
    use crate::store::{MemoryStore, SlotStore};
    use crate::{Error, Result};

    use super::Ingest;

    fn map_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../bracket-maps")
    }

    fn ingest() -> Ingest<MemoryStore> {
        Ingest::new(MemoryStore::new(), BracketLinker::new(map_dir()))
    }

    fn slot(match_id: u64, side: Side, short: &str, round: u32, position: u32) -> ResolvedSlot {
        ResolvedSlot {
            match_id: MatchId(match_id),
            round,
            position,
            side,
            short_round_name: short.to_owned(),
            round_name: short.to_owned(),
            position_code: None,
            group: None,
        }
    }

    fn single_elimination() -> TournamentBracket {
        TournamentBracket {
            id: None,
            name: "Finals".to_owned(),
            format: TournamentFormat::Bracket,
            bracket_type: Some(BracketType::SingleElimination),
            slots: vec![
                slot(1, Side::Upper, "WR1", 1, 1),
                slot(2, Side::Upper, "WR1", 1, 2),
                slot(3, Side::Upper, "GF", 2, 1),
            ],
            map_file: None,
            groups: Vec::new(),
            matches: Vec::new(),
        }
    }

    #[test]
    fn test_sync_tournament() {
        let mut ingest = ingest();

        let report = ingest.sync_tournament(&single_elimination(), None).unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(
            report.link,
            Some(LinkReport::Linked {
                edges: 2,
                shrinkage: Vec::new()
            })
        );

        let slots = ingest.store().slots(report.tournament);
        let gf = slots.iter().find(|s| s.short_round_name == "GF").unwrap().id;
        assert!(slots[..2].iter().all(|s| s.next_winner == Some(gf)));
    }

    #[test]
    fn test_sync_tournament_idempotent() {
        let mut ingest = ingest();

        let first = ingest.sync_tournament(&single_elimination(), None).unwrap();
        let slots = ingest.store().slots(first.tournament);

        let second = ingest.sync_tournament(&single_elimination(), None).unwrap();
        assert_eq!(second.tournament, first.tournament);
        assert_eq!(second.created, 0);
        assert_eq!(second.link, Some(LinkReport::AlreadyLinked));
        assert_eq!(ingest.store().slots(first.tournament), slots);
    }

    #[test]
    fn test_sync_tournament_round_format() {
        let mut ingest = ingest();
        let mut bracket = single_elimination();
        bracket.format = TournamentFormat::Round;

        let report = ingest.sync_tournament(&bracket, None).unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(report.link, None);
    }

    #[test]
    fn test_sync_tournament_group_map() {
        let mut group = single_elimination();
        group.name = "A".to_owned();
        group.map_file = Some(GROUP_QUALIFIER_MAP.to_owned());
        group.slots = vec![
            slot(1, Side::Upper, "WR1", 1, 1),
            slot(2, Side::Upper, "WR1", 1, 2),
            slot(3, Side::Upper, "WR2", 2, 1),
            slot(4, Side::Lower, "LR1", 1, 1),
            slot(5, Side::Lower, "LR2", 2, 1),
        ];

        let mut parent = single_elimination();
        parent.name = "Qualifiers".to_owned();
        parent.slots.clear();
        parent.groups = vec![group];

        let mut ingest = ingest();
        let report = ingest.sync_tournament(&parent, None).unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(
            report.groups[0].link,
            Some(LinkReport::Linked {
                edges: 6,
                shrinkage: Vec::new()
            })
        );

        let slots = ingest.store().slots(report.groups[0].tournament);
        let id = |key: &str| slots.iter().find(|s| s.key() == key).unwrap().id;
        let wr1 = slots.iter().find(|s| s.key() == "WR1-2").unwrap();
        assert_eq!(wr1.next_winner, Some(id("WR2-1")));
        assert_eq!(wr1.next_loser, Some(id("LR1-1")));
    }

    #[test]
    fn test_sync_tournament_missing_map_key() {
        let mut bracket = single_elimination();
        bracket.map_file = Some(GROUP_QUALIFIER_MAP.to_owned());
        bracket.slots = vec![slot(3, Side::Upper, "GF", 1, 1)];

        let mut ingest = ingest();
        let result = ingest.sync_tournament(&bracket, None);

        assert!(matches!(result, Err(Error::MissingMapKey { key, .. }) if key == "GF"));
        assert!(ingest.store().is_empty());
    }

    #[test]
    fn test_sync_tournament_failed_map_then_relink() {
        let mut bracket = single_elimination();
        bracket.map_file = Some(GROUP_QUALIFIER_MAP.to_owned());

        let mut ingest = ingest();
        assert!(matches!(
            ingest.sync_tournament(&bracket, None),
            Err(Error::UnresolvedMapTarget { target, .. }) if target == "WR2-1"
        ));
        assert!(ingest.store().is_empty());

        bracket.map_file = None;
        let report = ingest.sync_tournament(&bracket, None).unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(
            report.link,
            Some(LinkReport::Linked {
                edges: 2,
                shrinkage: Vec::new()
            })
        );
    }

    #[test]
    fn test_sync_tournament_links_existing_slots() {
        let bracket = single_elimination();

        let mut store = MemoryStore::new();
        let tournament = store.tournament(&bracket.name, None).unwrap();
        for slot in &bracket.slots {
            store.create_slot(tournament, slot).unwrap();
        }

        let mut ingest = Ingest::new(store, BracketLinker::new(map_dir()));
        let report = ingest.sync_tournament(&bracket, None).unwrap();

        assert_eq!(report.tournament, tournament);
        assert_eq!(report.created, 0);
        assert_eq!(
            report.link,
            Some(LinkReport::Linked {
                edges: 2,
                shrinkage: Vec::new()
            })
        );
        assert!(ingest.store().slots(tournament)[..2]
            .iter()
            .all(|slot| slot.is_linked()));
    }

    #[test]
    fn test_sync_tournament_failing_group_persists_nothing() {
        let mut group = single_elimination();
        group.name = "A".to_owned();
        group.map_file = Some(GROUP_QUALIFIER_MAP.to_owned());

        let mut parent = single_elimination();
        parent.groups = vec![group];

        let mut ingest = ingest();
        assert!(ingest.sync_tournament(&parent, None).is_err());
        assert!(ingest.store().is_empty());
    }

    #[test]
    fn test_sync_tournament_kickoff_classic_map() {
        let mut bracket = single_elimination();
        bracket.map_file = crate::provider::bracket_map_file("Kickoff Classic Bracket")
            .map(str::to_owned);

        let mut ingest = ingest();
        let report = ingest.sync_tournament(&bracket, None).unwrap();
        assert_eq!(
            report.link,
            Some(LinkReport::Linked {
                edges: 2,
                shrinkage: Vec::new()
            })
        );
    }

    struct Failing;

    impl BracketSource for Failing {
        fn name(&self) -> &str {
            "Broken"
        }

        fn into_bracket(self) -> Result<TournamentBracket> {
            Err(Error::UnrecognizedRoundName("Showmatch".to_owned()))
        }
    }

    #[test]
    fn test_sync_all_skips_failures() {
        let payload: Payload = serde_json::from_value(json!({
            "event": {
                "id": 4,
                "name": "Champs",
                "tournament_elimination_type": "single",
                "number_of_tournament_bracket_teams": 4,
            },
            "matches": [
                {"id": 1, "winner_next_match_id": 3, "winner_next_match_team_position": "team1",
                    "round": {"name": "Winners Round 1", "name_short": "WR1"}},
                {"id": 2, "winner_next_match_id": 3, "winner_next_match_team_position": "team2",
                    "round": {"name": "Winners Round 1", "name_short": "WR1"}},
                {"id": 3, "round": {"name": "Grand Finals", "name_short": "GF"}},
            ],
        }))
        .unwrap();

        let mut ingest = ingest();

        let summary = ingest.sync_all([Ok(payload), Err(Failing)].map(Source));
        assert!(!summary.is_success());
        assert_eq!(summary.synced.len(), 1);
        assert_eq!(summary.synced[0].created, 3);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "Broken");
    }

    /// Mixes payloads and failing sources in one run.
    struct Source(std::result::Result<Payload, Failing>);

    impl BracketSource for Source {
        fn name(&self) -> &str {
            match &self.0 {
                Ok(payload) => payload.name(),
                Err(failing) => failing.name(),
            }
        }

        fn into_bracket(self) -> Result<TournamentBracket> {
            match self.0 {
                Ok(payload) => payload.into_bracket(),
                Err(failing) => failing.into_bracket(),
            }
        }
    }
}
