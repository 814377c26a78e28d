// Season pipeline: refresh platform data into the snapshot store, load it
// back into engine inputs, and run the keeper engine for one season.

use anyhow::{anyhow, bail, Context, Result};
use keeper_core::draft::{DraftLedger, DraftType, RawDraftPick};
use keeper_core::engine::{self, EngineInputs, KeeperReport};
use keeper_core::history::{self, KeeperHistory, KeptPlayerRecord, NameOverrides};
use keeper_core::picks::TradedPickLedger;
use keeper_core::player::{PlayerCatalog, RawPlayer};
use keeper_core::roster::{RawRoster, RawUser, RosterIndex};
use keeper_core::transactions::{self, ClassifiedTransactions, RawTransaction, TradeOverrides};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{Config, RunOptions};
use crate::sleeper::{discover_league, LeagueSource, SleeperDraft, SleeperLeague};
use crate::store::{self, Artifact, SnapshotKey, SnapshotStore};

/// Where a season's exports and kept-players CSV live, for either backend.
pub fn season_dir(config: &Config, season: u32, league_id: &str) -> PathBuf {
    PathBuf::from(&config.storage.data_dir)
        .join(season.to_string())
        .join(league_id)
}

pub fn kept_csv_path(config: &Config, season: u32, league_id: &str) -> PathBuf {
    season_dir(config, season, league_id)
        .join("kept_players")
        .join("kept_players.csv")
}

/// The configured league id for `season`, falling back to looking it up by
/// the configured username and league name.
pub async fn resolve_league_id<S: LeagueSource + ?Sized>(
    config: &Config,
    source: &S,
    season: u32,
) -> Result<String> {
    if let Some(id) = config.league.league_id_for(season) {
        return Ok(id.to_string());
    }
    let league = discover_league(
        source,
        &config.league.username,
        season,
        &config.league.name,
    )
    .await
    .with_context(|| format!("no league id configured for {season}"))?;
    Ok(league.league_id)
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

/// Fetch every artifact a season run needs, then persist them in one batch.
/// A failed fetch leaves the previously cached season untouched.
pub async fn refresh_season<S>(
    config: &Config,
    options: &RunOptions,
    source: &S,
    store: &dyn SnapshotStore,
    season: u32,
    league_id: &str,
) -> Result<()>
where
    S: LeagueSource + ?Sized,
{
    info!("refreshing {} league {}", season, league_id);
    let key = |artifact| SnapshotKey::season(season, league_id, artifact);

    let league = source
        .league(league_id)
        .await
        .with_context(|| format!("failed to fetch league {league_id}"))?;
    let users = source.users(league_id).await.context("failed to fetch league users")?;
    let rosters = source.rosters(league_id).await.context("failed to fetch rosters")?;

    let drafts = source.drafts(league_id).await.context("failed to fetch drafts")?;
    let draft = drafts
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("league {league_id} has no draft"))?;
    let picks = source
        .draft_picks(&draft.draft_id)
        .await
        .with_context(|| format!("failed to fetch picks for draft {}", draft.draft_id))?;

    let mut txs: Vec<RawTransaction> = Vec::new();
    for week in 0..=config.sleeper.last_week {
        let week_txs = source
            .transactions(league_id, week)
            .await
            .with_context(|| format!("failed to fetch week {week} transactions"))?;
        txs.extend(week_txs);
    }

    let mut batch = vec![
        store::entry(key(Artifact::League), &league)?,
        store::entry(key(Artifact::Users), &users)?,
        store::entry(key(Artifact::Rosters), &rosters)?,
        store::entry(key(Artifact::Draft), &draft)?,
        store::entry(key(Artifact::DraftPicks), &picks)?,
        store::entry(key(Artifact::Transactions), &txs)?,
    ];

    let have_players = store.get(&SnapshotKey::common(Artifact::Players))?.is_some();
    if options.player_refresh || !have_players {
        let players = fetch_players(source).await?;
        batch.push(store::entry(SnapshotKey::common(Artifact::Players), &players)?);
    }

    store
        .put_all(&batch)
        .with_context(|| format!("failed to save {season} snapshots"))?;

    info!(
        "refreshed {}: {} users, {} rosters, {} picks, {} transactions",
        season,
        users.len(),
        rosters.len(),
        picks.len(),
        txs.len()
    );
    Ok(())
}

async fn fetch_players<S>(source: &S) -> Result<BTreeMap<String, RawPlayer>>
where
    S: LeagueSource + ?Sized,
{
    let players = source.players().await.context("failed to fetch player catalog")?;
    info!("fetched {} players", players.len());
    Ok(players)
}

/// Fetch and persist the platform's full player catalog.
pub async fn refresh_players<S>(source: &S, store: &dyn SnapshotStore) -> Result<usize>
where
    S: LeagueSource + ?Sized,
{
    let players = fetch_players(source).await?;
    store::save(store, &SnapshotKey::common(Artifact::Players), &players)?;
    Ok(players.len())
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Normalized engine inputs for one season, read from the store.
pub struct SeasonInputs {
    pub season: u32,
    pub league_id: String,
    pub league: SleeperLeague,
    pub draft_type: DraftType,
    pub trade_deadline: u32,
    pub rosters: RosterIndex,
    pub draft: DraftLedger,
    pub transactions: ClassifiedTransactions,
    pub picks: TradedPickLedger,
    pub history: KeeperHistory,
    pub catalog: PlayerCatalog,
}

pub fn load_catalog(store: &dyn SnapshotStore) -> Result<PlayerCatalog> {
    let raw: BTreeMap<String, RawPlayer> =
        store::require(store, &SnapshotKey::common(Artifact::Players))?;
    Ok(PlayerCatalog::from_raw(&raw))
}

pub fn load_season(
    config: &Config,
    store: &dyn SnapshotStore,
    season: u32,
    league_id: &str,
) -> Result<SeasonInputs> {
    let key = |artifact| SnapshotKey::season(season, league_id, artifact);

    let league: SleeperLeague = store::require(store, &key(Artifact::League))?;
    let users: Vec<RawUser> = store::require(store, &key(Artifact::Users))?;
    let raw_rosters: Vec<RawRoster> = store::require(store, &key(Artifact::Rosters))?;
    let draft_meta: SleeperDraft = store::require(store, &key(Artifact::Draft))?;
    let raw_picks: Vec<RawDraftPick> = store::require(store, &key(Artifact::DraftPicks))?;
    let raw_txs: Vec<RawTransaction> = store::require(store, &key(Artifact::Transactions))?;
    let catalog = load_catalog(store)?;

    let rosters = RosterIndex::build(&raw_rosters, &users)
        .with_context(|| format!("invalid rosters for {season}"))?;
    let draft_type = DraftType::from_platform(&draft_meta.draft_type)?;
    let draft = DraftLedger::build(draft_type, &raw_picks)
        .with_context(|| format!("invalid draft {} for {season}", draft_meta.draft_id))?;

    let trade_deadline = match league.settings.trade_deadline {
        Some(week) => week,
        None => {
            warn!(
                "league {} has no trade deadline; treating week {} as the deadline",
                league_id, config.sleeper.last_week
            );
            config.sleeper.last_week
        }
    };
    let events = transactions::normalize(&raw_txs)
        .with_context(|| format!("invalid transactions for {season}"))?;
    let excluded = TradeOverrides::new(&config.overrides.trade_exclusions).excluded_for(league_id, season);
    let classified = transactions::classify(&events, trade_deadline, &excluded);
    let picks = TradedPickLedger::build(&transactions::traded_pick_descriptors(&events), &rosters)
        .with_context(|| format!("invalid traded picks for {season}"))?;

    let history = if config.league.is_first_year(season) || league.is_inaugural() {
        info!("{} is an inaugural season; no keeper history", season);
        KeeperHistory::empty()
    } else {
        let records: Vec<KeptPlayerRecord> = store::require(store, &key(Artifact::KeptPlayers))?;
        KeeperHistory::from_records(records)
    };

    info!(
        "loaded {}: {} rosters, {} draft picks, {} transactions, {} kept players",
        season,
        rosters.len(),
        draft.len(),
        events.len(),
        history.len()
    );

    Ok(SeasonInputs {
        season,
        league_id: league_id.to_string(),
        league,
        draft_type,
        trade_deadline,
        rosters,
        draft,
        transactions: classified,
        picks,
        history,
        catalog,
    })
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub struct SeasonRun {
    pub season: u32,
    pub league_id: String,
    pub league_name: String,
    pub report: KeeperReport,
    pub picks: TradedPickLedger,
}

pub fn run_season(
    config: &Config,
    store: &dyn SnapshotStore,
    season: u32,
    league_id: &str,
) -> Result<SeasonRun> {
    let inputs = load_season(config, store, season, league_id)?;
    let report = engine::evaluate(
        &EngineInputs {
            rosters: &inputs.rosters,
            draft: &inputs.draft,
            transactions: &inputs.transactions,
            picks: &inputs.picks,
            history: &inputs.history,
            catalog: &inputs.catalog,
        },
        inputs.draft_type,
    )
    .with_context(|| format!("keeper evaluation failed for {season}"))?;

    info!(
        "{}: {} verdicts, {} eligible, {} excluded",
        season,
        report.verdicts.len(),
        report.eligible().count(),
        report.excluded.len()
    );

    Ok(SeasonRun {
        season,
        league_id: inputs.league_id,
        league_name: inputs.league.name,
        report,
        picks: inputs.picks,
    })
}

// ---------------------------------------------------------------------------
// Kept players
// ---------------------------------------------------------------------------

pub struct KeptPlayers {
    pub records: Vec<KeptPlayerRecord>,
    /// Sorted `Manager: Player - Years Kept N` lines.
    pub listing: Vec<String>,
}

/// Resolve the season's kept-players CSV against the catalog and persist it
/// as that season's keeper history.
pub fn process_kept(
    config: &Config,
    store: &dyn SnapshotStore,
    season: u32,
    league_id: &str,
) -> Result<KeptPlayers> {
    let path = kept_csv_path(config, season, league_id);
    if !path.exists() {
        bail!(
            "kept players file not found: {}; export the kept players sheet there as CSV",
            path.display()
        );
    }
    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let catalog = load_catalog(store)?;
    let overrides = NameOverrides::new(&config.overrides.name_overrides);

    let records = history::load_kept_players_from_reader(file, &catalog, &overrides)
        .with_context(|| format!("failed to process {}", path.display()))?;
    store::save(
        store,
        &SnapshotKey::season(season, league_id, Artifact::KeptPlayers),
        &records,
    )?;

    let listing = history::kept_listing(&records);
    Ok(KeptPlayers { records, listing })
}
