// Keeper history: prior seasons' kept players and the CSV that records them.
//
// The league office keeps the list as a spreadsheet with one row per kept
// player:
//
//   PlayerName,Manager,Years Kept
//   Lamar Jackson,chilliah,1
//
// Names are matched to the player catalog by exact, case-insensitive full
// name. Anything that does not resolve to exactly one player stops the load.

use crate::error::{KeeperError, Result};
use crate::player::{normalize_name, PlayerCatalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeptPlayerRecord {
    pub player_id: String,
    pub player_name: String,
    pub years_kept: u32,
    pub manager: String,
}

/// Prior keeper records for a season, keyed by player id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeeperHistory {
    records: BTreeMap<String, KeptPlayerRecord>,
}

impl KeeperHistory {
    /// History for a league's inaugural season.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Later records for the same player replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = KeptPlayerRecord>) -> Self {
        KeeperHistory {
            records: records
                .into_iter()
                .map(|r| (r.player_id.clone(), r))
                .collect(),
        }
    }

    /// Years already kept; 0 for a player with no record.
    pub fn years_kept(&self, player_id: &str) -> u32 {
        self.records
            .get(player_id)
            .map(|r| r.years_kept)
            .unwrap_or(0)
    }

    pub fn get(&self, player_id: &str) -> Option<&KeptPlayerRecord> {
        self.records.get(player_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &KeptPlayerRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Name overrides
// ---------------------------------------------------------------------------

/// Explicit name -> player id table for names the catalog cannot resolve on
/// its own (duplicate names, defenses listed by nickname).
#[derive(Debug, Clone, Default)]
pub struct NameOverrides {
    by_name: BTreeMap<String, String>,
}

impl NameOverrides {
    pub fn new(entries: &BTreeMap<String, String>) -> Self {
        NameOverrides {
            by_name: entries
                .iter()
                .map(|(name, id)| (normalize_name(name), id.clone()))
                .collect(),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_name.get(&normalize_name(name)).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawKeptRow {
    #[serde(rename = "PlayerName")]
    player_name: String,
    #[serde(rename = "Manager")]
    manager: String,
    #[serde(rename = "Years Kept")]
    years_kept: String,
}

/// Parse a kept-players CSV and resolve every row to a player id.
pub fn load_kept_players_from_reader<R: Read>(
    reader: R,
    catalog: &PlayerCatalog,
    overrides: &NameOverrides,
) -> Result<Vec<KeptPlayerRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records: Vec<KeptPlayerRecord> = Vec::new();
    for (line, row) in rdr.deserialize::<RawKeptRow>().enumerate() {
        let row = row?;
        // Header is line 1.
        let line = line + 2;

        if row.player_name.is_empty() {
            return Err(KeeperError::invalid(
                "kept player",
                format!("line {line} has no player name"),
            ));
        }
        let years_kept: u32 = row.years_kept.parse().map_err(|_| {
            KeeperError::invalid(
                "kept player",
                format!(
                    "line {line}: years kept `{}` for {} is not a whole number",
                    row.years_kept, row.player_name
                ),
            )
        })?;

        let player_id = resolve_name(&row.player_name, &row.manager, catalog, overrides)?;
        if let Some(dup) = records.iter().find(|r| r.player_id == player_id) {
            return Err(KeeperError::invalid(
                "kept player",
                format!(
                    "line {line}: {} resolves to player {}, already listed as {}",
                    row.player_name, player_id, dup.player_name
                ),
            ));
        }
        debug!("{} has id {}", row.player_name, player_id);

        records.push(KeptPlayerRecord {
            player_id,
            player_name: row.player_name,
            years_kept,
            manager: row.manager,
        });
    }

    info!("resolved {} kept players", records.len());
    Ok(records)
}

fn resolve_name(
    name: &str,
    manager: &str,
    catalog: &PlayerCatalog,
    overrides: &NameOverrides,
) -> Result<String> {
    if let Some(id) = overrides.resolve(name) {
        return Ok(id.to_string());
    }
    let candidates = catalog.find_by_full_name(name);
    match candidates.as_slice() {
        [] => Err(KeeperError::UnmatchedKeptPlayer {
            name: name.to_string(),
            manager: manager.to_string(),
        }),
        [only] => Ok(only.to_string()),
        many => Err(KeeperError::AmbiguousKeptPlayer {
            name: name.to_string(),
            candidates: many.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

/// Sorted `Manager: Player - Years Kept N` lines.
pub fn kept_listing(records: &[KeptPlayerRecord]) -> Vec<String> {
    let mut lines: Vec<String> = records
        .iter()
        .map(|r| format!("{}: {} - Years Kept {}", r.manager, r.player_name, r.years_kept))
        .collect();
    lines.sort();
    lines
}
