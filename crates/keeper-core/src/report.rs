// Report assembler: turns engine output into ordered string tables.
//
// Tables are plain strings so any renderer (CSV, text, HTML) can consume
// them without knowing about the engine's types.

use crate::engine::{KeeperReport, KeeperVerdict};
use crate::history::KeptPlayerRecord;
use crate::picks::TradedPickLedger;
use crate::player::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        ReportTable {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a header, for renderers and tests that address columns by name.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

// ---------------------------------------------------------------------------
// Verdict tables
// ---------------------------------------------------------------------------

const HUMAN_HEADERS: [&str; 7] = [
    "owner",
    "player",
    "position",
    "years_kept",
    "cost",
    "eligible",
    "note",
];

fn yes_no(b: bool) -> String {
    let s = if b { "yes" } else { "no" };
    s.to_string()
}

fn sorted<'a>(verdicts: impl Iterator<Item = &'a KeeperVerdict>) -> Vec<&'a KeeperVerdict> {
    let mut v: Vec<&KeeperVerdict> = verdicts.collect();
    v.sort_by(|a, b| {
        (&a.owner_name, &a.player_name, &a.player_id).cmp(&(&b.owner_name, &b.player_name, &b.player_id))
    });
    v
}

fn human_row(v: &KeeperVerdict) -> Vec<String> {
    vec![
        v.owner_name.clone(),
        v.player_name.clone(),
        v.position.to_string(),
        v.years_kept_after.to_string(),
        v.cost.to_string(),
        yes_no(v.eligible),
        v.note.to_string(),
    ]
}

/// Every verdict field, one row per verdict.
pub fn full_table(report: &KeeperReport) -> ReportTable {
    let mut table = ReportTable::new(
        "All keeper verdicts",
        &[
            "owner",
            "roster_id",
            "player_id",
            "player",
            "position",
            "team",
            "drafted",
            "draft_cost",
            "pick_number",
            "drafted_as_keeper",
            "years_kept_before",
            "years_kept_after",
            "traded",
            "added_after_deadline",
            "dropped_after_deadline",
            "cost",
            "eligible",
            "note",
            "needs_reconciliation",
        ],
    );
    for v in sorted(report.verdicts.iter()) {
        table.rows.push(vec![
            v.owner_name.clone(),
            v.roster_id.to_string(),
            v.player_id.clone(),
            v.player_name.clone(),
            v.position.to_string(),
            v.team.clone().unwrap_or_default(),
            yes_no(v.drafted),
            v.draft_cost.map(|c| c.to_string()).unwrap_or_default(),
            v.pick_number.map(|n| n.to_string()).unwrap_or_default(),
            yes_no(v.drafted_as_keeper),
            v.years_kept_before.to_string(),
            v.years_kept_after.to_string(),
            yes_no(v.traded),
            yes_no(v.added_after_deadline),
            yes_no(v.dropped_after_deadline),
            v.cost.to_string(),
            yes_no(v.eligible),
            v.note.to_string(),
            yes_no(v.needs_reconciliation),
        ]);
    }
    table
}

pub fn human_table(report: &KeeperReport) -> ReportTable {
    let mut table = ReportTable::new("Keepers", &HUMAN_HEADERS);
    table.rows = sorted(report.verdicts.iter()).into_iter().map(human_row).collect();
    table
}

pub fn eligible_table(report: &KeeperReport) -> ReportTable {
    let mut table = ReportTable::new("Eligible keepers", &HUMAN_HEADERS);
    table.rows = sorted(report.eligible()).into_iter().map(human_row).collect();
    table
}

/// Players removed from consideration by a post-deadline move (round-based
/// leagues only; empty otherwise).
pub fn excluded_table(report: &KeeperReport) -> ReportTable {
    let mut table = ReportTable::new("Excluded after trade deadline", &["owner", "player", "position", "note"]);
    for v in sorted(report.excluded.iter()) {
        table.rows.push(vec![
            v.owner_name.clone(),
            v.player_name.clone(),
            v.position.to_string(),
            v.note.to_string(),
        ]);
    }
    table
}

/// Eligible keepers at one position, cheapest first within each owner.
pub fn position_table(report: &KeeperReport, position: Position) -> ReportTable {
    let mut table = ReportTable::new(
        format!("Eligible {position} keepers"),
        &["owner", "player", "cost", "years_kept"],
    );
    let mut rows: Vec<&KeeperVerdict> = report
        .eligible()
        .filter(|v| v.position == position)
        .collect();
    rows.sort_by(|a, b| {
        (&a.owner_name, a.cost.value(), &a.player_name).cmp(&(&b.owner_name, b.cost.value(), &b.player_name))
    });
    for v in rows {
        table.rows.push(vec![
            v.owner_name.clone(),
            v.player_name.clone(),
            v.cost.to_string(),
            v.years_kept_after.to_string(),
        ]);
    }
    table
}

// ---------------------------------------------------------------------------
// Pick tables
// ---------------------------------------------------------------------------

pub fn traded_picks_table(ledger: &TradedPickLedger) -> ReportTable {
    let mut table = ReportTable::new(
        "Traded draft picks",
        &[
            "new_owner",
            "season",
            "round",
            "previous_owner",
            "original_owner",
            "gained",
            "lost",
        ],
    );
    for e in ledger.entries() {
        table.rows.push(vec![
            e.new_owner.clone(),
            e.descriptor.season.clone(),
            e.descriptor.round.to_string(),
            e.previous_owner.clone(),
            e.original_owner.clone(),
            e.gained.clone(),
            e.lost.clone(),
        ]);
    }
    table
}

/// One row per gained or lost pick per roster.
pub fn pick_summary_table(report: &KeeperReport) -> ReportTable {
    let mut table = ReportTable::new(
        "Draft picks by owner",
        &["owner", "direction", "season", "round", "counterparty", "original_owner"],
    );
    for summary in &report.pick_summaries {
        let moves = summary
            .gained
            .iter()
            .map(|m| ("gained", m))
            .chain(summary.lost.iter().map(|m| ("lost", m)));
        for (direction, m) in moves {
            table.rows.push(vec![
                summary.owner_name.clone(),
                direction.to_string(),
                m.season.clone(),
                m.round.to_string(),
                m.counterparty.clone(),
                m.original_owner.clone(),
            ]);
        }
    }
    table
}

// ---------------------------------------------------------------------------
// Keeper history
// ---------------------------------------------------------------------------

pub fn kept_table(records: &[KeptPlayerRecord]) -> ReportTable {
    let mut table = ReportTable::new("Kept players", &["manager", "player", "years_kept"]);
    let mut sorted: Vec<&KeptPlayerRecord> = records.iter().collect();
    sorted.sort_by(|a, b| (&a.manager, &a.player_name).cmp(&(&b.manager, &b.player_name)));
    for r in sorted {
        table.rows.push(vec![
            r.manager.clone(),
            r.player_name.clone(),
            r.years_kept.to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::DraftType;
    use crate::engine::{Cost, Note, PickMovement, RosterPickSummary};

    fn verdict(owner: &str, name: &str, pos: Position, cost: Cost, eligible: bool, note: Note) -> KeeperVerdict {
        KeeperVerdict {
            owner_name: owner.into(),
            roster_id: 1,
            player_id: name.to_lowercase().replace(' ', "_"),
            player_name: name.into(),
            position: pos,
            team: None,
            drafted: true,
            draft_cost: Some(Cost::Round(cost.value() + 1)),
            pick_number: Some(12),
            drafted_as_keeper: false,
            years_kept_before: 0,
            years_kept_after: 0,
            traded: false,
            added_after_deadline: false,
            dropped_after_deadline: false,
            cost,
            eligible,
            note,
            needs_reconciliation: false,
        }
    }

    fn report() -> KeeperReport {
        KeeperReport {
            draft_type: DraftType::RoundBased,
            verdicts: vec![
                verdict("zed", "Tom Brady", Position::QB, Cost::Round(5), true, Note::None),
                verdict("amy", "Saquon Barkley", Position::RB, Cost::Round(0), false, Note::DraftedFirstRound),
                verdict("amy", "Aaron Jones", Position::RB, Cost::Round(6), true, Note::None),
                verdict("amy", "James Conner", Position::RB, Cost::Round(3), true, Note::None),
            ],
            excluded: vec![],
            pick_summaries: vec![RosterPickSummary {
                owner_name: "amy".into(),
                roster_id: 1,
                gained: vec![PickMovement {
                    season: "2023".into(),
                    round: 2,
                    counterparty: "zed".into(),
                    original_owner: "zed".into(),
                    narrative: String::new(),
                }],
                lost: vec![],
            }],
            needs_reconciliation: vec![],
        }
    }

    #[test]
    fn human_table_shape_and_order() {
        let t = human_table(&report());
        assert_eq!(t.headers, HUMAN_HEADERS.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(t.len(), 4);
        assert_eq!(t.rows[0][1], "Aaron Jones");
        assert_eq!(t.rows[3][0], "zed");
        let note = t.column("note").unwrap();
        assert_eq!(t.rows[2][note], "drafted in first round");
    }

    #[test]
    fn eligible_table_filters() {
        let t = eligible_table(&report());
        assert_eq!(t.len(), 3);
        let eligible = t.column("eligible").unwrap();
        assert!(t.rows.iter().all(|r| r[eligible] == "yes"));
    }

    #[test]
    fn position_table_sorts_by_cost_within_owner() {
        let t = position_table(&report(), Position::RB);
        assert_eq!(t.title, "Eligible RB keepers");
        let players: Vec<&str> = t.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(players, vec!["James Conner", "Aaron Jones"]);
        assert_eq!(t.rows[0][2], "Round 3");
    }

    #[test]
    fn full_table_has_every_column() {
        let t = full_table(&report());
        assert_eq!(t.headers.len(), 19);
        assert!(t.rows.iter().all(|r| r.len() == 19));
    }

    #[test]
    fn pick_summary_rows() {
        let t = pick_summary_table(&report());
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0], vec!["amy", "gained", "2023", "2", "zed", "zed"]);
    }

    #[test]
    fn kept_table_sorted() {
        let records = vec![
            KeptPlayerRecord {
                player_id: "1".into(),
                player_name: "B".into(),
                years_kept: 1,
                manager: "zed".into(),
            },
            KeptPlayerRecord {
                player_id: "2".into(),
                player_name: "A".into(),
                years_kept: 2,
                manager: "amy".into(),
            },
        ];
        let t = kept_table(&records);
        assert_eq!(t.rows[0], vec!["amy", "A", "2"]);
    }
}
