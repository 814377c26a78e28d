// Draft ledger: per-player draft results and auction positional averages.

use crate::error::{KeeperError, Result};
use crate::player::{Position, KEEPER_POSITIONS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Synthetic round assigned to undrafted players in round-based leagues.
pub const UNDRAFTED_ROUND: u32 = 9;

/// Largest auction price accepted from the platform. Real budgets are in
/// the hundreds.
pub const MAX_AUCTION_AMOUNT: u32 = 100_000;

// ---------------------------------------------------------------------------
// Draft type
// ---------------------------------------------------------------------------

/// Which keeper rule set applies, derived from the league's draft format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftType {
    /// Snake or linear draft; costs are rounds.
    RoundBased,
    /// Auction draft; costs are amounts.
    Auction,
}

impl DraftType {
    pub fn from_platform(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "snake" | "linear" => Ok(DraftType::RoundBased),
            "auction" => Ok(DraftType::Auction),
            other => Err(KeeperError::invalid(
                "draft",
                format!("unsupported draft type `{other}`"),
            )),
        }
    }
}

impl fmt::Display for DraftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftType::RoundBased => f.write_str("round-based"),
            DraftType::Auction => f.write_str("auction"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPickMetadata {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    /// Auction price; the platform sends it as a string.
    #[serde(default)]
    pub amount: Option<String>,
}

/// A single made pick from the platform's draft results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDraftPick {
    pub player_id: String,
    #[serde(default)]
    pub picked_by: Option<String>,
    #[serde(default)]
    pub roster_id: Option<u32>,
    pub round: u32,
    pub pick_no: u32,
    #[serde(default)]
    pub is_keeper: Option<bool>,
    #[serde(default)]
    pub metadata: RawPickMetadata,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRecord {
    pub player_id: String,
    pub round: u32,
    pub pick_number: u32,
    pub roster_id: Option<u32>,
    pub is_keeper: bool,
    pub position: Position,
    /// Present only in auction drafts.
    pub amount: Option<u32>,
}

/// Mean auction price per keeper position, rounded up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionalAverages {
    averages: BTreeMap<Position, u32>,
}

impl PositionalAverages {
    fn from_records<'a>(records: impl Iterator<Item = &'a DraftRecord>) -> Self {
        let mut totals: BTreeMap<Position, (u64, u64)> = BTreeMap::new();
        for record in records {
            if let (true, Some(amount)) = (record.position.is_keeper_position(), record.amount) {
                let slot = totals.entry(record.position).or_insert((0, 0));
                slot.0 += u64::from(amount);
                slot.1 += 1;
            }
        }
        let averages = totals
            .into_iter()
            .map(|(pos, (sum, n))| (pos, sum.div_ceil(n) as u32))
            .collect();
        PositionalAverages { averages }
    }

    /// Average for the position; 0 when nobody at that position was bought.
    pub fn get(&self, position: Position) -> u32 {
        self.averages.get(&position).copied().unwrap_or(0)
    }

    /// (position, average) for all five keeper positions, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, u32)> + '_ {
        KEEPER_POSITIONS.iter().map(|&p| (p, self.get(p)))
    }
}

#[derive(Debug, Clone)]
pub struct DraftLedger {
    draft_type: DraftType,
    records: BTreeMap<String, DraftRecord>,
    averages: PositionalAverages,
}

impl DraftLedger {
    /// Validate and index the season's picks. Rounds start at 1; auction picks
    /// must carry a parseable amount.
    pub fn build(draft_type: DraftType, picks: &[RawDraftPick]) -> Result<Self> {
        let mut records: BTreeMap<String, DraftRecord> = BTreeMap::new();
        for pick in picks {
            if pick.round == 0 {
                return Err(KeeperError::invalid(
                    "draft pick",
                    format!("player {} has round 0", pick.player_id),
                ));
            }

            if let Some(existing) = records.get(&pick.player_id) {
                warn!(
                    "player {} drafted more than once; keeping pick {} and ignoring pick {}",
                    pick.player_id, existing.pick_number, pick.pick_no
                );
                continue;
            }

            let amount = match draft_type {
                DraftType::RoundBased => None,
                DraftType::Auction => Some(parse_amount(pick)?),
            };

            let record = DraftRecord {
                player_id: pick.player_id.clone(),
                round: pick.round,
                pick_number: pick.pick_no,
                roster_id: pick.roster_id,
                is_keeper: pick.is_keeper.unwrap_or(false),
                position: Position::from_str_pos(pick.metadata.position.as_deref().unwrap_or("")),
                amount,
            };

            records.insert(pick.player_id.clone(), record);
        }

        let averages = match draft_type {
            DraftType::RoundBased => PositionalAverages::default(),
            DraftType::Auction => PositionalAverages::from_records(records.values()),
        };
        debug!("draft ledger: {} picks ({})", records.len(), draft_type);

        Ok(DraftLedger {
            draft_type,
            records,
            averages,
        })
    }

    pub fn draft_type(&self) -> DraftType {
        self.draft_type
    }

    pub fn get(&self, player_id: &str) -> Option<&DraftRecord> {
        self.records.get(player_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn positional_averages(&self) -> &PositionalAverages {
        &self.averages
    }
}

fn parse_amount(pick: &RawDraftPick) -> Result<u32> {
    let raw = pick.metadata.amount.as_deref().map(str::trim).unwrap_or("");
    match raw.parse::<u32>() {
        Ok(amount) if amount <= MAX_AUCTION_AMOUNT => Ok(amount),
        _ => Err(KeeperError::invalid(
            "draft pick",
            format!(
                "auction pick {} for player {} has amount `{raw}`",
                pick.pick_no, pick.player_id
            ),
        )),
    }
}
