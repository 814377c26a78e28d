// Eligibility engine: combines rosters, draft results, transactions, keeper
// history and traded picks into one verdict per rostered player.
//
// Two rule sets exist. Round-based leagues price a keeper as the round it
// costs next year; auction leagues price it as next year's auction amount.
// They also differ in how post-deadline moves surface (excluded entirely vs.
// listed as ineligible) and which years-kept value the limit is checked
// against. Both differences are league rules and are reproduced as-is.

use crate::draft::{DraftLedger, DraftType, PositionalAverages, UNDRAFTED_ROUND};
use crate::error::{KeeperError, Result};
use crate::history::KeeperHistory;
use crate::picks::TradedPickLedger;
use crate::player::{PlayerCatalog, Position};
use crate::roster::{RosterEntry, RosterIndex};
use crate::transactions::ClassifiedTransactions;
use std::fmt;
use tracing::{debug, info, warn};

/// A player can be kept for at most this many seasons, under either rule set.
pub const MAX_KEEPER_YEARS: u32 = 2;

// ---------------------------------------------------------------------------
// Costs and notes
// ---------------------------------------------------------------------------

/// A draft price: a round in round-based leagues, an amount in auction ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cost {
    Round(u32),
    Amount(u32),
}

impl Cost {
    pub fn value(&self) -> u32 {
        match self {
            Cost::Round(v) | Cost::Amount(v) => *v,
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Round(r) => write!(f, "Round {r}"),
            Cost::Amount(a) => write!(f, "${a}"),
        }
    }
}

/// Why a verdict came out the way it did. Exactly one applies per verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    None,
    AddedAfterDeadline,
    DroppedAfterDeadline,
    DraftedFirstRound,
    YearsKeptLimit,
    KeeperValueReset,
    UndraftedRoundCost,
    UndraftedAuctionCost,
}

impl Note {
    pub fn as_str(&self) -> &'static str {
        match self {
            Note::None => "",
            Note::AddedAfterDeadline => "added after trade deadline",
            Note::DroppedAfterDeadline => "dropped after trade deadline",
            Note::DraftedFirstRound => "drafted in first round",
            Note::YearsKeptLimit => "reached years-kept limit of 2",
            Note::KeeperValueReset => "keeper value reset",
            Note::UndraftedRoundCost => "cost set to round 8",
            Note::UndraftedAuctionCost => "cost set to positional average",
        }
    }

    /// Notes that make a player ineligible.
    pub fn is_disqualifier(&self) -> bool {
        matches!(
            self,
            Note::AddedAfterDeadline
                | Note::DroppedAfterDeadline
                | Note::DraftedFirstRound
                | Note::YearsKeptLimit
        )
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-player rules
// ---------------------------------------------------------------------------

/// Facts about one player gathered from the normalizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseFacts {
    /// `None` when the player was not drafted this season.
    pub draft_cost: Option<Cost>,
    pub years_kept_before: u32,
    pub traded: bool,
    pub added_after_deadline: bool,
    pub dropped_after_deadline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub cost: Cost,
    pub years_kept_after: u32,
    pub eligible: bool,
    pub note: Note,
}

/// Apply one rule set to one player. `position_average` is only consulted
/// for auction players priced at the positional average.
pub fn decide(draft_type: DraftType, facts: &BaseFacts, position_average: u32) -> Decision {
    let years_kept_after = if facts.traded {
        0
    } else {
        facts.years_kept_before
    };

    match draft_type {
        DraftType::RoundBased => {
            let round = match facts.draft_cost {
                Some(c) => c.value(),
                None => UNDRAFTED_ROUND,
            };
            let undrafted = facts.draft_cost.is_none();
            let cost = if undrafted {
                UNDRAFTED_ROUND - 1
            } else if facts.traded {
                round.saturating_add(facts.years_kept_before).saturating_sub(1)
            } else {
                round.saturating_sub(1)
            };
            // A round-1 pick stays unkeepable even when a trade pushes its
            // cost above zero.
            let first_round = round == 1 && !undrafted;

            let note = if facts.added_after_deadline {
                Note::AddedAfterDeadline
            } else if facts.dropped_after_deadline {
                Note::DroppedAfterDeadline
            } else if cost == 0 || first_round {
                Note::DraftedFirstRound
            } else if years_kept_after >= MAX_KEEPER_YEARS {
                Note::YearsKeptLimit
            } else if facts.traded {
                Note::KeeperValueReset
            } else if undrafted {
                Note::UndraftedRoundCost
            } else {
                Note::None
            };

            Decision {
                cost: Cost::Round(cost),
                years_kept_after,
                eligible: !note.is_disqualifier(),
                note,
            }
        }
        DraftType::Auction => {
            let amount = facts.draft_cost.map(|c| c.value()).unwrap_or(0);
            let at_average = amount == 0;
            let cost = if at_average {
                position_average
            } else {
                next_year_amount(amount)
            };

            let note = if facts.added_after_deadline {
                Note::AddedAfterDeadline
            } else if facts.dropped_after_deadline {
                Note::DroppedAfterDeadline
            } else if facts.years_kept_before >= MAX_KEEPER_YEARS {
                Note::YearsKeptLimit
            } else if facts.traded {
                Note::KeeperValueReset
            } else if at_average {
                Note::UndraftedAuctionCost
            } else {
                Note::None
            };

            Decision {
                cost: Cost::Amount(cost),
                years_kept_after,
                eligible: !note.is_disqualifier(),
                note,
            }
        }
    }
}

/// ceil((amount + 5) * 1.10), in integer arithmetic so values such as 27.5
/// round exactly.
pub fn next_year_amount(amount: u32) -> u32 {
    amount.saturating_add(5).saturating_mul(11).div_ceil(10)
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperVerdict {
    pub owner_name: String,
    pub roster_id: u32,
    pub player_id: String,
    pub player_name: String,
    pub position: Position,
    pub team: Option<String>,
    pub drafted: bool,
    pub draft_cost: Option<Cost>,
    pub pick_number: Option<u32>,
    /// The platform marked this season's pick as a keeper selection.
    pub drafted_as_keeper: bool,
    pub years_kept_before: u32,
    pub years_kept_after: u32,
    pub traded: bool,
    pub added_after_deadline: bool,
    pub dropped_after_deadline: bool,
    pub cost: Cost,
    pub eligible: bool,
    pub note: Note,
    /// Player id was not in the catalog; name and position are placeholders.
    pub needs_reconciliation: bool,
}

/// One traded pick as seen from a single roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickMovement {
    pub season: String,
    pub round: u32,
    /// Previous owner for a gained pick, new owner for a lost one.
    pub counterparty: String,
    pub original_owner: String,
    pub narrative: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPickSummary {
    pub owner_name: String,
    pub roster_id: u32,
    pub gained: Vec<PickMovement>,
    pub lost: Vec<PickMovement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperReport {
    pub draft_type: DraftType,
    /// One per considered (roster, player), ordered by owner then player id.
    pub verdicts: Vec<KeeperVerdict>,
    /// Round-based only: players removed from consideration by a
    /// post-deadline add or drop.
    pub excluded: Vec<KeeperVerdict>,
    pub pick_summaries: Vec<RosterPickSummary>,
    /// Player ids that could not be found in the catalog.
    pub needs_reconciliation: Vec<String>,
}

impl KeeperReport {
    pub fn verdicts_for<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a KeeperVerdict> + 'a {
        self.verdicts.iter().filter(move |v| v.owner_name == owner)
    }

    pub fn eligible(&self) -> impl Iterator<Item = &KeeperVerdict> {
        self.verdicts.iter().filter(|v| v.eligible)
    }

    pub fn pick_summary(&self, owner: &str) -> Option<&RosterPickSummary> {
        self.pick_summaries.iter().find(|s| s.owner_name == owner)
    }

}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Everything the engine reads. All of it is borrowed and left untouched.
#[derive(Debug, Clone, Copy)]
pub struct EngineInputs<'a> {
    pub rosters: &'a RosterIndex,
    pub draft: &'a DraftLedger,
    pub transactions: &'a ClassifiedTransactions,
    pub picks: &'a TradedPickLedger,
    pub history: &'a KeeperHistory,
    pub catalog: &'a PlayerCatalog,
}

/// Compute the full keeper report for one league-season.
pub fn evaluate(inputs: &EngineInputs<'_>, draft_type: DraftType) -> Result<KeeperReport> {
    if inputs.draft.draft_type() != draft_type {
        return Err(KeeperError::invalid(
            "draft",
            format!(
                "draft ledger was built for a {} draft but the league uses {} rules",
                inputs.draft.draft_type(),
                draft_type
            ),
        ));
    }

    let averages = inputs.draft.positional_averages();
    let mut verdicts = Vec::new();
    let mut excluded = Vec::new();
    let mut needs_reconciliation = Vec::new();

    for entry in inputs.rosters.entries() {
        for player_id in &entry.player_ids {
            let verdict = evaluate_player(inputs, entry, player_id, draft_type, averages);
            if verdict.needs_reconciliation {
                warn!(
                    "player {} on {}'s roster is not in the player catalog; using a placeholder",
                    player_id, entry.owner_name
                );
                needs_reconciliation.push(player_id.clone());
            }
            debug!(
                "{} / {}: cost {} eligible={} note={:?}",
                entry.owner_name, verdict.player_name, verdict.cost, verdict.eligible, verdict.note
            );

            let post_deadline_move = verdict.added_after_deadline || verdict.dropped_after_deadline;
            if draft_type == DraftType::RoundBased && post_deadline_move {
                excluded.push(verdict);
            } else {
                verdicts.push(verdict);
            }
        }
    }

    let pick_summaries = inputs
        .rosters
        .entries()
        .map(|entry| summarize_picks(entry, inputs.picks))
        .collect();

    info!(
        "evaluated {} rosters ({} rules): {} verdicts, {} eligible, {} excluded",
        inputs.rosters.len(),
        draft_type,
        verdicts.len(),
        verdicts.iter().filter(|v: &&KeeperVerdict| v.eligible).count(),
        excluded.len()
    );

    Ok(KeeperReport {
        draft_type,
        verdicts,
        excluded,
        pick_summaries,
        needs_reconciliation,
    })
}

fn evaluate_player(
    inputs: &EngineInputs<'_>,
    entry: &RosterEntry,
    player_id: &str,
    draft_type: DraftType,
    averages: &PositionalAverages,
) -> KeeperVerdict {
    let (mut player, in_catalog) = inputs.catalog.lookup_or_placeholder(player_id);
    let record = inputs.draft.get(player_id);
    if !in_catalog {
        if let Some(r) = record {
            player.position = r.position;
        }
    }

    let draft_cost = record.map(|r| match draft_type {
        DraftType::RoundBased => Cost::Round(r.round),
        DraftType::Auction => Cost::Amount(r.amount.unwrap_or(0)),
    });

    let facts = BaseFacts {
        draft_cost,
        years_kept_before: inputs.history.years_kept(player_id),
        traded: inputs.transactions.is_traded(player_id),
        added_after_deadline: inputs.transactions.is_added_after_deadline(player_id),
        dropped_after_deadline: inputs.transactions.is_dropped_after_deadline(player_id),
    };
    let decision = decide(draft_type, &facts, averages.get(player.position));

    KeeperVerdict {
        owner_name: entry.owner_name.clone(),
        roster_id: entry.roster_id,
        player_id: player_id.to_string(),
        player_name: player.full_name,
        position: player.position,
        team: player.team,
        drafted: record.is_some(),
        draft_cost,
        pick_number: record.map(|r| r.pick_number),
        drafted_as_keeper: record.map(|r| r.is_keeper).unwrap_or(false),
        years_kept_before: facts.years_kept_before,
        years_kept_after: decision.years_kept_after,
        traded: facts.traded,
        added_after_deadline: facts.added_after_deadline,
        dropped_after_deadline: facts.dropped_after_deadline,
        cost: decision.cost,
        eligible: decision.eligible,
        note: decision.note,
        needs_reconciliation: !in_catalog,
    }
}

fn summarize_picks(entry: &RosterEntry, ledger: &TradedPickLedger) -> RosterPickSummary {
    let mut gained = Vec::new();
    let mut lost = Vec::new();

    for pick in ledger.entries() {
        let d = &pick.descriptor;
        if d.new_owner_roster == entry.roster_id {
            gained.push(PickMovement {
                season: d.season.clone(),
                round: d.round,
                counterparty: pick.previous_owner.clone(),
                original_owner: pick.original_owner.clone(),
                narrative: pick.gained.clone(),
            });
        }
        let holder = ledger.current_holder(&d.season, d.round, d.original_roster);
        if d.previous_owner_roster == entry.roster_id && holder != Some(entry.roster_id) {
            lost.push(PickMovement {
                season: d.season.clone(),
                round: d.round,
                counterparty: pick.new_owner.clone(),
                original_owner: pick.original_owner.clone(),
                narrative: pick.lost.clone(),
            });
        }
    }

    RosterPickSummary {
        owner_name: entry.owner_name.clone(),
        roster_id: entry.roster_id,
        gained,
        lost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(draft_cost: Option<Cost>, years: u32, traded: bool) -> BaseFacts {
        BaseFacts {
            draft_cost,
            years_kept_before: years,
            traded,
            added_after_deadline: false,
            dropped_after_deadline: false,
        }
    }

    // -- round-based --

    #[test]
    fn round_based_plain_pick() {
        let d = decide(DraftType::RoundBased, &facts(Some(Cost::Round(4)), 0, false), 0);
        assert_eq!(d.cost, Cost::Round(3));
        assert!(d.eligible);
        assert_eq!(d.note, Note::None);
    }

    #[test]
    fn round_based_traded_resets_clock() {
        let d = decide(DraftType::RoundBased, &facts(Some(Cost::Round(6)), 2, true), 0);
        assert_eq!(d.cost, Cost::Round(7));
        assert_eq!(d.years_kept_after, 0);
        assert!(d.eligible);
        assert_eq!(d.note, Note::KeeperValueReset);
    }

    #[test]
    fn round_based_first_round_cannot_be_kept() {
        let d = decide(DraftType::RoundBased, &facts(Some(Cost::Round(1)), 0, false), 0);
        assert_eq!(d.cost, Cost::Round(0));
        assert!(!d.eligible);
        assert_eq!(d.note, Note::DraftedFirstRound);
    }

    #[test]
    fn round_based_first_round_traded_is_still_ineligible() {
        let d = decide(DraftType::RoundBased, &facts(Some(Cost::Round(1)), 1, true), 0);
        assert_eq!(d.cost, Cost::Round(1));
        assert_eq!(d.years_kept_after, 0);
        assert!(!d.eligible);
        assert_eq!(d.note, Note::DraftedFirstRound);
    }

    #[test]
    fn round_based_huge_history_does_not_overflow() {
        let d = decide(DraftType::RoundBased, &facts(Some(Cost::Round(6)), u32::MAX, true), 0);
        assert_eq!(d.cost, Cost::Round(u32::MAX - 1));
    }

    #[test]
    fn round_based_undrafted_costs_round_eight() {
        let d = decide(DraftType::RoundBased, &facts(None, 0, false), 0);
        assert_eq!(d.cost, Cost::Round(8));
        assert_eq!(d.note, Note::UndraftedRoundCost);

        // Traded UDFA keeps the fixed cost but reports the reset.
        let d = decide(DraftType::RoundBased, &facts(None, 1, true), 0);
        assert_eq!(d.cost, Cost::Round(8));
        assert_eq!(d.note, Note::KeeperValueReset);
    }

    #[test]
    fn round_based_years_limit() {
        let d = decide(DraftType::RoundBased, &facts(Some(Cost::Round(5)), 2, false), 0);
        assert!(!d.eligible);
        assert_eq!(d.note, Note::YearsKeptLimit);
    }

    #[test]
    fn added_beats_dropped() {
        let mut f = facts(Some(Cost::Round(1)), 3, true);
        f.added_after_deadline = true;
        f.dropped_after_deadline = true;
        let d = decide(DraftType::RoundBased, &f, 0);
        assert_eq!(d.note, Note::AddedAfterDeadline);
        let d = decide(DraftType::Auction, &f, 0);
        assert_eq!(d.note, Note::AddedAfterDeadline);
    }

    // -- auction --

    #[test]
    fn auction_inflation() {
        assert_eq!(next_year_amount(20), 28);
        assert_eq!(next_year_amount(1), 7);
        assert_eq!(next_year_amount(5), 11);
        assert_eq!(next_year_amount(45), 55);
        // Saturates instead of overflowing on nonsense input.
        assert!(next_year_amount(u32::MAX) > 0);
    }

    #[test]
    fn auction_undrafted_uses_positional_average() {
        let d = decide(DraftType::Auction, &facts(None, 0, false), 45);
        assert_eq!(d.cost, Cost::Amount(45));
        assert!(d.eligible);
        assert_eq!(d.note, Note::UndraftedAuctionCost);
    }

    #[test]
    fn auction_limit_uses_years_before_even_when_traded() {
        let d = decide(DraftType::Auction, &facts(Some(Cost::Amount(30)), 2, true), 0);
        assert_eq!(d.years_kept_after, 0);
        assert!(!d.eligible);
        assert_eq!(d.note, Note::YearsKeptLimit);
    }

    #[test]
    fn auction_has_no_first_round_rule() {
        let d = decide(DraftType::Auction, &facts(Some(Cost::Amount(1)), 0, false), 0);
        assert!(d.eligible);
        assert_eq!(d.cost, Cost::Amount(7));
    }

    // -- display --

    #[test]
    fn cost_and_note_display() {
        assert_eq!(Cost::Round(3).to_string(), "Round 3");
        assert_eq!(Cost::Amount(28).to_string(), "$28");
        assert_eq!(Note::YearsKeptLimit.to_string(), "reached years-kept limit of 2");
        assert_eq!(Note::None.to_string(), "");
        assert!(!Note::KeeperValueReset.is_disqualifier());
    }
}
