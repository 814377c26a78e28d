// Transaction classifier: traded players, post-deadline adds and drops, and
// the traded-pick descriptors carried by trades.

use crate::error::{KeeperError, Result};
use crate::picks::TradedPickDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A draft pick moved by a trade, as the platform reports it. `roster_id` is
/// the roster that originally owned the pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPickTrade {
    pub season: String,
    pub round: u32,
    pub roster_id: u32,
    pub previous_owner_id: u32,
    pub owner_id: u32,
}

/// One transaction from the platform's weekly transaction feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub transaction_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub adds: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub drops: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub draft_picks: Option<Vec<RawPickTrade>>,
    /// Week the transaction was fetched for; set by the caller.
    #[serde(default)]
    pub week: Option<u32>,
    /// Platform's own week field.
    #[serde(default)]
    pub leg: Option<u32>,
}

// ---------------------------------------------------------------------------
// Normalized events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Trade,
    Waiver,
    FreeAgent,
    Commissioner,
}

impl TransactionKind {
    fn from_platform(s: &str) -> Option<Self> {
        match s {
            "trade" => Some(TransactionKind::Trade),
            "waiver" => Some(TransactionKind::Waiver),
            "free_agent" => Some(TransactionKind::FreeAgent),
            "commissioner" => Some(TransactionKind::Commissioner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub transaction_id: String,
    pub week: u32,
    pub kind: TransactionKind,
    pub adds: BTreeSet<String>,
    pub drops: BTreeSet<String>,
    pub draft_picks: Vec<TradedPickDescriptor>,
}

/// Keep only completed transactions and convert them to typed events.
/// Events come back ordered by week; order within a week is preserved.
pub fn normalize(raw: &[RawTransaction]) -> Result<Vec<TransactionEvent>> {
    let mut events = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;

    for tx in raw {
        if tx.status != "complete" {
            debug!("skipping {} transaction {}", tx.status, tx.transaction_id);
            skipped += 1;
            continue;
        }

        let kind = TransactionKind::from_platform(&tx.kind).ok_or_else(|| {
            KeeperError::invalid(
                "transaction",
                format!("{} has unknown type `{}`", tx.transaction_id, tx.kind),
            )
        })?;
        let week = tx.week.or(tx.leg).ok_or_else(|| {
            KeeperError::invalid(
                "transaction",
                format!("{} has no week", tx.transaction_id),
            )
        })?;

        let draft_picks = tx
            .draft_picks
            .iter()
            .flatten()
            .map(|p| TradedPickDescriptor {
                season: p.season.clone(),
                round: p.round,
                original_roster: p.roster_id,
                previous_owner_roster: p.previous_owner_id,
                new_owner_roster: p.owner_id,
                week,
            })
            .collect();

        events.push(TransactionEvent {
            transaction_id: tx.transaction_id.clone(),
            week,
            kind,
            adds: tx.adds.iter().flat_map(|m| m.keys().cloned()).collect(),
            drops: tx.drops.iter().flat_map(|m| m.keys().cloned()).collect(),
            draft_picks,
        });
    }

    if skipped > 0 {
        warn!("discarded {} transactions that were not complete", skipped);
    }
    events.sort_by_key(|e| e.week);
    Ok(events)
}

// ---------------------------------------------------------------------------
// Trade exclusions
// ---------------------------------------------------------------------------

/// A trade the commissioner ruled invalid: the player should not count as
/// traded for that league-season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeExclusion {
    pub league_id: String,
    pub season: u32,
    pub player_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Override table keyed by (league id, season, player id).
#[derive(Debug, Clone, Default)]
pub struct TradeOverrides {
    entries: BTreeSet<(String, u32, String)>,
}

impl TradeOverrides {
    pub fn new(exclusions: &[TradeExclusion]) -> Self {
        TradeOverrides {
            entries: exclusions
                .iter()
                .map(|e| (e.league_id.clone(), e.season, e.player_id.clone()))
                .collect(),
        }
    }

    /// Player ids exempted for one league-season.
    pub fn excluded_for(&self, league_id: &str, season: u32) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|(l, s, _)| l == league_id && *s == season)
            .map(|(_, _, p)| p.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The three derived player sets. They may overlap; the engine's priority
/// order decides which fact wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedTransactions {
    pub traded: BTreeSet<String>,
    pub added_after_deadline: BTreeSet<String>,
    pub dropped_after_deadline: BTreeSet<String>,
}

impl ClassifiedTransactions {
    pub fn is_traded(&self, player_id: &str) -> bool {
        self.traded.contains(player_id)
    }

    pub fn is_added_after_deadline(&self, player_id: &str) -> bool {
        self.added_after_deadline.contains(player_id)
    }

    pub fn is_dropped_after_deadline(&self, player_id: &str) -> bool {
        self.dropped_after_deadline.contains(player_id)
    }
}

/// Partition a season's events. `excluded` removes ids from the traded set
/// only; a post-deadline move is never excused.
pub fn classify(
    events: &[TransactionEvent],
    trade_deadline: u32,
    excluded: &BTreeSet<String>,
) -> ClassifiedTransactions {
    let mut out = ClassifiedTransactions::default();

    for event in events {
        if event.kind == TransactionKind::Trade {
            out.traded.extend(
                event
                    .adds
                    .iter()
                    .filter(|id| !excluded.contains(*id))
                    .cloned(),
            );
        }
        if event.week > trade_deadline {
            out.added_after_deadline.extend(event.adds.iter().cloned());
            out.dropped_after_deadline.extend(event.drops.iter().cloned());
        }
    }

    info!(
        "classified {} transactions: {} traded, {} added and {} dropped after week {}",
        events.len(),
        out.traded.len(),
        out.added_after_deadline.len(),
        out.dropped_after_deadline.len(),
        trade_deadline
    );
    out
}

/// Every pick descriptor from trade events, in week order.
pub fn traded_pick_descriptors(events: &[TransactionEvent]) -> Vec<TradedPickDescriptor> {
    events
        .iter()
        .filter(|e| e.kind == TransactionKind::Trade)
        .flat_map(|e| e.draft_picks.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, kind: &str, status: &str, week: u32, adds: &[&str], drops: &[&str]) -> RawTransaction {
        RawTransaction {
            transaction_id: id.into(),
            kind: kind.into(),
            status: status.into(),
            adds: Some(adds.iter().map(|p| (p.to_string(), 1)).collect()),
            drops: Some(drops.iter().map(|p| (p.to_string(), 2)).collect()),
            draft_picks: None,
            week: Some(week),
            leg: None,
        }
    }

    fn no_exclusions() -> BTreeSet<String> {
        BTreeSet::new()
    }

    // -- normalize --

    #[test]
    fn drops_incomplete_transactions() {
        let txs = vec![
            raw("1", "trade", "complete", 3, &["a"], &[]),
            raw("2", "waiver", "failed", 3, &["b"], &[]),
            raw("3", "free_agent", "pending", 4, &["c"], &[]),
        ];
        let events = normalize(&txs).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transaction_id, "1");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let txs = vec![raw("1", "swap", "complete", 3, &[], &[])];
        assert!(normalize(&txs).is_err());
    }

    #[test]
    fn falls_back_to_leg_for_week() {
        let mut tx = raw("1", "waiver", "complete", 0, &["a"], &[]);
        tx.week = None;
        tx.leg = Some(11);
        let events = normalize(&[tx]).unwrap();
        assert_eq!(events[0].week, 11);

        let mut tx = raw("2", "waiver", "complete", 0, &["a"], &[]);
        tx.week = None;
        assert!(normalize(&[tx]).is_err());
    }

    #[test]
    fn null_adds_and_drops_are_empty() {
        let mut tx = raw("1", "trade", "complete", 2, &[], &[]);
        tx.adds = None;
        tx.drops = None;
        let events = normalize(&[tx]).unwrap();
        assert!(events[0].adds.is_empty());
        assert!(events[0].drops.is_empty());
    }

    #[test]
    fn picks_carry_week_and_provenance() {
        let mut tx = raw("1", "trade", "complete", 6, &[], &[]);
        tx.draft_picks = Some(vec![RawPickTrade {
            season: "2023".into(),
            round: 3,
            roster_id: 4,
            previous_owner_id: 4,
            owner_id: 7,
        }]);
        let events = normalize(&[tx]).unwrap();
        let descriptors = traded_pick_descriptors(&events);
        assert_eq!(descriptors.len(), 1);
        let d = &descriptors[0];
        assert_eq!((d.original_roster, d.previous_owner_roster, d.new_owner_roster), (4, 4, 7));
        assert_eq!(d.week, 6);
    }

    // -- classify --

    #[test]
    fn trade_adds_are_traded() {
        let events = normalize(&[
            raw("1", "trade", "complete", 3, &["a", "b"], &["a", "b"]),
            raw("2", "trade", "complete", 5, &["a"], &["a"]),
            raw("3", "waiver", "complete", 4, &["c"], &["d"]),
        ])
        .unwrap();
        let c = classify(&events, 10, &no_exclusions());
        assert_eq!(
            c.traded,
            ["a", "b"].iter().map(|s| s.to_string()).collect::<BTreeSet<String>>()
        );
        assert!(c.added_after_deadline.is_empty());
        assert!(c.dropped_after_deadline.is_empty());
    }

    #[test]
    fn deadline_is_exclusive() {
        let events = normalize(&[
            raw("1", "waiver", "complete", 10, &["on_deadline"], &["x"]),
            raw("2", "free_agent", "complete", 11, &["late_add"], &["late_drop"]),
        ])
        .unwrap();
        let c = classify(&events, 10, &no_exclusions());
        assert!(!c.is_added_after_deadline("on_deadline"));
        assert!(c.is_added_after_deadline("late_add"));
        assert!(c.is_dropped_after_deadline("late_drop"));
        assert!(!c.is_dropped_after_deadline("x"));
    }

    #[test]
    fn sets_may_overlap() {
        let events = normalize(&[
            raw("1", "trade", "complete", 12, &["p"], &[]),
            raw("2", "waiver", "complete", 13, &[], &["p"]),
        ])
        .unwrap();
        let c = classify(&events, 9, &no_exclusions());
        assert!(c.is_traded("p"));
        assert!(c.is_added_after_deadline("p"));
        assert!(c.is_dropped_after_deadline("p"));
    }

    // -- overrides --

    #[test]
    fn exclusion_removes_only_named_player_for_that_season() {
        let overrides = TradeOverrides::new(&[TradeExclusion {
            league_id: "L1".into(),
            season: 2021,
            player_id: "a".into(),
            reason: Some("ruled invalid".into()),
        }]);
        assert_eq!(
            overrides.excluded_for("L1", 2021),
            BTreeSet::from(["a".to_string()])
        );
        assert!(overrides.excluded_for("L1", 2022).is_empty());
        assert!(overrides.excluded_for("L2", 2021).is_empty());

        let events = normalize(&[raw("1", "trade", "complete", 3, &["a", "b"], &[])]).unwrap();
        let c = classify(&events, 10, &overrides.excluded_for("L1", 2021));
        assert!(!c.is_traded("a"));
        assert!(c.is_traded("b"));
    }
}
