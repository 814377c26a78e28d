// Roster index: owner display name -> roster and held players.

use crate::error::{KeeperError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

// ---------------------------------------------------------------------------
// Raw inputs
// ---------------------------------------------------------------------------

/// A league roster as the platform delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRoster {
    pub roster_id: u32,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub players: Option<Vec<String>>,
}

/// A league member as the platform delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub owner_name: String,
    pub owner_id: String,
    pub roster_id: u32,
    pub player_ids: BTreeSet<String>,
}

/// Rosters keyed by owner display name, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct RosterIndex {
    by_owner: BTreeMap<String, RosterEntry>,
    owner_by_roster: HashMap<u32, String>,
}

impl RosterIndex {
    /// Join rosters to users. Every roster must have an owner and every owner
    /// must resolve to a unique display name.
    pub fn build(rosters: &[RawRoster], users: &[RawUser]) -> Result<Self> {
        let names: HashMap<&str, &str> = users
            .iter()
            .filter_map(|u| {
                u.display_name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .map(|n| (u.user_id.as_str(), n))
            })
            .collect();

        let mut index = RosterIndex::default();
        for roster in rosters {
            let owner_id = roster
                .owner_id
                .as_deref()
                .ok_or(KeeperError::OrphanRoster {
                    roster_id: roster.roster_id,
                })?;
            let owner_name = names
                .get(owner_id)
                .ok_or_else(|| KeeperError::MissingDisplayName {
                    owner_id: owner_id.to_string(),
                    roster_id: roster.roster_id,
                })?
                .to_string();

            if let Some(existing) = index.by_owner.get(&owner_name) {
                return Err(KeeperError::DuplicateOwnerName {
                    name: owner_name,
                    first_owner_id: existing.owner_id.clone(),
                    second_owner_id: owner_id.to_string(),
                });
            }

            let player_ids: BTreeSet<String> =
                roster.players.iter().flatten().cloned().collect();
            debug!(
                "roster {} -> {} ({} players)",
                roster.roster_id,
                owner_name,
                player_ids.len()
            );

            index
                .owner_by_roster
                .insert(roster.roster_id, owner_name.clone());
            index.by_owner.insert(
                owner_name.clone(),
                RosterEntry {
                    owner_name,
                    owner_id: owner_id.to_string(),
                    roster_id: roster.roster_id,
                    player_ids,
                },
            );
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.by_owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }

    pub fn get(&self, owner_name: &str) -> Option<&RosterEntry> {
        self.by_owner.get(owner_name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RosterEntry> {
        self.by_owner.values()
    }

    pub fn owner_for_roster(&self, roster_id: u32) -> Option<&str> {
        self.owner_by_roster.get(&roster_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn roster(id: u32, owner: Option<&str>, players: &[&str]) -> RawRoster {
        RawRoster {
            roster_id: id,
            owner_id: owner.map(String::from),
            players: Some(players.iter().map(|p| p.to_string()).collect()),
        }
    }

    fn user(id: &str, name: &str) -> RawUser {
        RawUser {
            user_id: id.into(),
            display_name: Some(name.into()),
        }
    }

    #[test]
    fn indexes_by_display_name() {
        let rosters = vec![
            roster(1, Some("u1"), &["4034", "6794"]),
            roster(2, Some("u2"), &["4046"]),
        ];
        let users = vec![user("u1", "chilliah"), user("u2", "bigpapa")];
        let index = RosterIndex::build(&rosters, &users).unwrap();

        assert_eq!(index.len(), 2);
        let entry = index.get("chilliah").unwrap();
        assert_eq!(entry.roster_id, 1);
        assert!(entry.player_ids.contains("6794"));
        assert_eq!(index.owner_for_roster(2), Some("bigpapa"));
        assert_eq!(index.owner_for_roster(9), None);

        let order: Vec<&str> = index.entries().map(|e| e.owner_name.as_str()).collect();
        assert_eq!(order, vec!["bigpapa", "chilliah"]);
    }

    #[test]
    fn null_player_list_is_empty_roster() {
        let rosters = vec![RawRoster {
            roster_id: 3,
            owner_id: Some("u1".into()),
            players: None,
        }];
        let index = RosterIndex::build(&rosters, &[user("u1", "chilliah")]).unwrap();
        assert!(index.get("chilliah").unwrap().player_ids.is_empty());
    }

    #[test]
    fn missing_display_name_is_integrity_error() {
        let rosters = vec![roster(1, Some("u1"), &[])];
        let err = RosterIndex::build(&rosters, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        assert!(matches!(err, KeeperError::MissingDisplayName { roster_id: 1, .. }));
    }

    #[test]
    fn blank_display_name_counts_as_missing() {
        let rosters = vec![roster(1, Some("u1"), &[])];
        let err = RosterIndex::build(&rosters, &[user("u1", "  ")]).unwrap_err();
        assert!(matches!(err, KeeperError::MissingDisplayName { .. }));
    }

    #[test]
    fn orphan_roster_is_rejected() {
        let rosters = vec![roster(5, None, &["4034"])];
        let err = RosterIndex::build(&rosters, &[]).unwrap_err();
        assert!(matches!(err, KeeperError::OrphanRoster { roster_id: 5 }));
    }

    #[test]
    fn duplicate_display_names_are_rejected() {
        let rosters = vec![roster(1, Some("u1"), &[]), roster(2, Some("u2"), &[])];
        let users = vec![user("u1", "same"), user("u2", "same")];
        let err = RosterIndex::build(&rosters, &users).unwrap_err();
        assert!(matches!(err, KeeperError::DuplicateOwnerName { .. }));
    }
}
