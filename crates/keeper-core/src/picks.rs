// Traded-pick ledger: resolves roster ids on traded draft picks to owner names.

use crate::error::{KeeperError, Result};
use crate::roster::RosterIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One transfer of a future draft pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradedPickDescriptor {
    pub season: String,
    pub round: u32,
    pub original_roster: u32,
    pub previous_owner_roster: u32,
    pub new_owner_roster: u32,
    pub week: u32,
}

/// A descriptor with owner names resolved and its narratives rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradedPickEntry {
    pub descriptor: TradedPickDescriptor,
    pub new_owner: String,
    pub previous_owner: String,
    pub original_owner: String,
    pub gained: String,
    pub lost: String,
}

impl TradedPickEntry {
    fn resolve(descriptor: &TradedPickDescriptor, rosters: &RosterIndex) -> Result<Self> {
        let name = |roster_id: u32| -> Result<String> {
            rosters
                .owner_for_roster(roster_id)
                .map(str::to_string)
                .ok_or(KeeperError::UnknownRoster { roster_id })
        };
        let new_owner = name(descriptor.new_owner_roster)?;
        let previous_owner = name(descriptor.previous_owner_roster)?;
        let original_owner = name(descriptor.original_roster)?;

        let gained = format!(
            "{new_owner} gained a {} round {} draft pick from {previous_owner} (originally {original_owner}'s)",
            descriptor.season, descriptor.round
        );
        let lost = format!(
            "{previous_owner} lost a {} round {} draft pick to {new_owner} (originally {original_owner}'s)",
            descriptor.season, descriptor.round
        );

        Ok(TradedPickEntry {
            descriptor: descriptor.clone(),
            new_owner,
            previous_owner,
            original_owner,
            gained,
            lost,
        })
    }
}

/// All traded picks for a season, sorted by (new owner, season, round).
#[derive(Debug, Clone, Default)]
pub struct TradedPickLedger {
    entries: Vec<TradedPickEntry>,
    holders: BTreeMap<(String, u32, u32), u32>,
}

impl TradedPickLedger {
    /// `descriptors` must be in transfer order (oldest first) so the last
    /// transfer of a pick determines its current holder.
    pub fn build(descriptors: &[TradedPickDescriptor], rosters: &RosterIndex) -> Result<Self> {
        let mut entries = descriptors
            .iter()
            .map(|d| TradedPickEntry::resolve(d, rosters))
            .collect::<Result<Vec<_>>>()?;

        let mut holders = BTreeMap::new();
        for d in descriptors {
            holders.insert(
                (d.season.clone(), d.round, d.original_roster),
                d.new_owner_roster,
            );
        }

        // Stable sort keeps transfer order for repeated moves of the same slot.
        entries.sort_by(|a, b| {
            (&a.new_owner, &a.descriptor.season, a.descriptor.round).cmp(&(
                &b.new_owner,
                &b.descriptor.season,
                b.descriptor.round,
            ))
        });

        Ok(TradedPickLedger { entries, holders })
    }

    pub fn entries(&self) -> &[TradedPickEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Roster currently holding the pick originally owned by
    /// `original_roster`, if it was ever traded.
    pub fn current_holder(&self, season: &str, round: u32, original_roster: u32) -> Option<u32> {
        self.holders
            .get(&(season.to_string(), round, original_roster))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{RawRoster, RawUser};

    fn index() -> RosterIndex {
        let rosters = (1..=3)
            .map(|id| RawRoster {
                roster_id: id,
                owner_id: Some(format!("u{id}")),
                players: None,
            })
            .collect::<Vec<_>>();
        let users = vec![
            RawUser { user_id: "u1".into(), display_name: Some("chilliah".into()) },
            RawUser { user_id: "u2".into(), display_name: Some("bigpapa".into()) },
            RawUser { user_id: "u3".into(), display_name: Some("aardvark".into()) },
        ];
        RosterIndex::build(&rosters, &users).unwrap()
    }

    fn desc(season: &str, round: u32, orig: u32, prev: u32, new: u32, week: u32) -> TradedPickDescriptor {
        TradedPickDescriptor {
            season: season.into(),
            round,
            original_roster: orig,
            previous_owner_roster: prev,
            new_owner_roster: new,
            week,
        }
    }

    #[test]
    fn resolves_names_and_narratives() {
        let ledger = TradedPickLedger::build(&[desc("2023", 2, 1, 1, 2, 4)], &index()).unwrap();
        let entry = &ledger.entries()[0];
        assert_eq!(entry.new_owner, "bigpapa");
        assert_eq!(entry.previous_owner, "chilliah");
        assert_eq!(entry.original_owner, "chilliah");
        assert_eq!(
            entry.gained,
            "bigpapa gained a 2023 round 2 draft pick from chilliah (originally chilliah's)"
        );
        assert_eq!(
            entry.lost,
            "chilliah lost a 2023 round 2 draft pick to bigpapa (originally chilliah's)"
        );
    }

    #[test]
    fn sorted_by_new_owner_then_season_then_round() {
        let ledger = TradedPickLedger::build(
            &[
                desc("2024", 1, 1, 1, 2, 3),
                desc("2023", 5, 2, 2, 1, 3),
                desc("2023", 3, 1, 1, 2, 5),
                desc("2023", 1, 2, 2, 3, 6),
            ],
            &index(),
        )
        .unwrap();
        let order: Vec<(&str, &str, u32)> = ledger
            .entries()
            .iter()
            .map(|e| (e.new_owner.as_str(), e.descriptor.season.as_str(), e.descriptor.round))
            .collect();
        assert_eq!(
            order,
            vec![
                ("aardvark", "2023", 1),
                ("bigpapa", "2023", 3),
                ("bigpapa", "2024", 1),
                ("chilliah", "2023", 5),
            ]
        );
    }

    #[test]
    fn latest_transfer_is_current_holder() {
        let ledger = TradedPickLedger::build(
            &[desc("2023", 2, 1, 1, 2, 4), desc("2023", 2, 1, 2, 3, 9)],
            &index(),
        )
        .unwrap();
        assert_eq!(ledger.current_holder("2023", 2, 1), Some(3));
        assert_eq!(ledger.current_holder("2023", 3, 1), None);
    }

    #[test]
    fn unknown_roster_is_rejected() {
        let err = TradedPickLedger::build(&[desc("2023", 2, 1, 1, 12, 4)], &index()).unwrap_err();
        assert!(matches!(err, KeeperError::UnknownRoster { roster_id: 12 }));
    }

    #[test]
    fn empty_ledger() {
        let ledger = TradedPickLedger::build(&[], &index()).unwrap();
        assert!(ledger.is_empty());
    }
}
