// Report export: CSV files per table, the plain-text keeper sheet, and a
// fixed-width rendering for the terminal.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keeper_core::engine::KeeperVerdict;
use keeper_core::history::KeptPlayerRecord;
use keeper_core::player::Position;
use keeper_core::report::{self, ReportTable};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::pipeline::{season_dir, SeasonRun};

pub const FINAL_KEEPERS_FILE: &str = "final_keepers.txt";

pub fn table_csv_bytes(table: &ReportTable) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to render {}: {}", table.title, e.error()))
}

/// Write every `(path, contents)` pair or leave the targets as they were.
///
/// Contents go to `{name}.tmp` siblings first; only when all of them are on
/// disk are they renamed into place, in order. Put the file readers look at
/// first last.
pub fn write_files_staged(files: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Err(e) = fs::write(&tmp, contents) {
            for (written, _) in &staged {
                let _ = fs::remove_file(written);
            }
            return Err(e).with_context(|| format!("failed to write {}", tmp.display()));
        }
        staged.push((tmp, path.as_path()));
    }

    for (i, (tmp, path)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, path) {
            for (rest, _) in &staged[i..] {
                let _ = fs::remove_file(rest);
            }
            return Err(e).with_context(|| format!("failed to replace {}", path.display()));
        }
    }
    Ok(())
}

/// Every table for a season run, as `(file name, table)`.
pub fn season_tables(run: &SeasonRun, position: Option<Position>) -> Vec<(String, ReportTable)> {
    let mut tables = vec![
        ("keepers_full.csv".to_string(), report::full_table(&run.report)),
        ("keepers.csv".to_string(), report::human_table(&run.report)),
        ("eligible_keepers.csv".to_string(), report::eligible_table(&run.report)),
        ("excluded_keepers.csv".to_string(), report::excluded_table(&run.report)),
        ("traded_picks.csv".to_string(), report::traded_picks_table(&run.picks)),
        ("draft_picks_by_owner.csv".to_string(), report::pick_summary_table(&run.report)),
    ];
    if let Some(pos) = position {
        tables.push((
            format!("eligible_{}.csv", pos.display_str().to_lowercase()),
            report::position_table(&run.report, pos),
        ));
    }
    tables
}

/// Write all CSVs and `final_keepers.txt` into the season directory.
/// Nothing in the directory changes unless every file could be written, and
/// `final_keepers.txt` is replaced last.
pub fn export_season(config: &Config, run: &SeasonRun, position: Option<Position>) -> Result<Vec<PathBuf>> {
    let dir = season_dir(config, run.season, &run.league_id);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut files = Vec::new();
    for (name, table) in season_tables(run, position) {
        files.push((dir.join(name), table_csv_bytes(&table)?));
    }
    files.push((
        dir.join(FINAL_KEEPERS_FILE),
        render_final_keepers(run, Utc::now()).into_bytes(),
    ));

    write_files_staged(&files)?;
    let written: Vec<PathBuf> = files.into_iter().map(|(path, _)| path).collect();
    info!("wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

pub fn export_kept(config: &Config, season: u32, league_id: &str, records: &[KeptPlayerRecord]) -> Result<PathBuf> {
    let dir = season_dir(config, season, league_id).join("kept_players");
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join("processed_kept_players.csv");
    let contents = table_csv_bytes(&report::kept_table(records))?;
    write_files_staged(&[(path.clone(), contents)])?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn keeper_line(v: &KeeperVerdict) -> String {
    let mut line = format!("{} {} - Keeper Cost: {}.", v.player_name, v.position, v.cost);
    if v.years_kept_after > 0 {
        let _ = write!(line, " Years Kept {}", v.years_kept_after);
    }
    line
}

/// The per-manager keeper sheet: pick movements first, then eligible
/// keepers cheapest first.
pub fn render_final_keepers(run: &SeasonRun, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "The {} Eligible Keepers for {}", run.league_name, run.season);
    let _ = writeln!(out, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));

    for summary in &run.report.pick_summaries {
        let _ = writeln!(out);
        let _ = writeln!(out, "Manager: {}", summary.owner_name);
        for m in &summary.lost {
            let _ = writeln!(
                out,
                "\t*Lost a {} round {} draft pick. Traded to {}",
                m.season, m.round, m.counterparty
            );
        }
        for m in &summary.gained {
            let _ = writeln!(
                out,
                "\t*Gained a {} round {} draft pick acquired from {}",
                m.season, m.round, m.counterparty
            );
        }

        let mut keepers: Vec<&KeeperVerdict> = run
            .report
            .verdicts_for(&summary.owner_name)
            .filter(|v| v.eligible)
            .collect();
        keepers.sort_by(|a, b| (a.cost.value(), &a.player_name).cmp(&(b.cost.value(), &b.player_name)));
        for v in keepers {
            let _ = writeln!(out, "\t{}", keeper_line(v));
        }
    }
    out
}

/// Fixed-width table for stdout.
pub fn render_table(table: &ReportTable) -> String {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let fmt_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}", w = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", table.title);
    let _ = writeln!(out, "{}", fmt_row(&table.headers));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &table.rows {
        let _ = writeln!(out, "{}", fmt_row(row));
    }
    out
}
