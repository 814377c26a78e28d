// Sleeper keeper entry point.
//
// Every command follows the same shape:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the snapshot store
// 4. Refresh from Sleeper when asked, then compute and export

use keeper_app::config::{self, Config, RunOptions};
use keeper_app::export;
use keeper_app::pipeline;
use keeper_app::sleeper::SleeperClient;
use keeper_app::store::{self, SnapshotStore};
use keeper_core::player::Position;
use keeper_core::report;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "sleeper-keeper")]
#[command(about = "Keeper eligibility and cost for a Sleeper keeper league")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute keepers for one season
    Run {
        /// Season to evaluate (defaults to current_year)
        #[arg(short, long)]
        year: Option<u32>,
        /// Re-fetch league data from Sleeper
        #[arg(long)]
        refresh: bool,
        /// Re-fetch the full player catalog
        #[arg(long)]
        player_refresh: bool,
        /// Only show eligible keepers at this position (QB, RB, WR, TE, DEF)
        #[arg(long, value_parser = parse_position)]
        pos: Option<Position>,
        /// Verbose logging
        #[arg(long)]
        debug: bool,
    },
    /// Resolve a season's kept_players.csv into keeper history
    ProcessKept {
        #[arg(short, long)]
        year: Option<u32>,
    },
    /// Refresh and recompute every configured season, oldest first
    RefreshAll,
}

fn parse_position(s: &str) -> Result<Position, String> {
    Position::parse_keeper_position(s).ok_or_else(|| format!("`{s}` is not one of QB, RB, WR, TE, DEF"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let debug = matches!(cli.command, Command::Run { debug: true, .. });

    init_tracing(debug)?;
    info!("sleeper-keeper starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, seasons {}-{}",
        config.league.name, config.league.first_year, config.league.current_year
    );

    let store = store::open_store(&config).context("failed to open snapshot store")?;

    match cli.command {
        Command::Run {
            year,
            refresh,
            player_refresh,
            pos,
            debug: _,
        } => {
            let options = RunOptions {
                refresh,
                player_refresh,
            };
            let season = year.unwrap_or(config.league.current_year);
            run(&config, &options, store.as_ref(), season, pos).await
        }
        Command::ProcessKept { year } => {
            let season = year.unwrap_or(config.league.current_year);
            process_kept(&config, store.as_ref(), season)
        }
        Command::RefreshAll => refresh_all(&config, store.as_ref()).await,
    }
}

async fn run(
    config: &Config,
    options: &RunOptions,
    store: &dyn SnapshotStore,
    season: u32,
    pos: Option<Position>,
) -> anyhow::Result<()> {
    let client = SleeperClient::from_config(&config.sleeper);

    let league_id = if options.refresh {
        let id = pipeline::resolve_league_id(config, &client, season).await?;
        pipeline::refresh_season(config, options, &client, store, season, &id).await?;
        id
    } else {
        if options.player_refresh {
            pipeline::refresh_players(&client, store).await?;
        }
        config
            .league
            .league_id_for(season)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no league id configured for {season}; add it to [league.seasons] or rerun with --refresh"))?
    };

    let run = pipeline::run_season(config, store, season, &league_id)?;
    let written = export::export_season(config, &run, pos)?;

    let table = match pos {
        Some(p) => report::position_table(&run.report, p),
        None => report::human_table(&run.report),
    };
    println!("{}", export::render_table(&table));
    if !run.report.excluded.is_empty() {
        println!("{}", export::render_table(&report::excluded_table(&run.report)));
    }
    if !run.report.needs_reconciliation.is_empty() {
        warn!(
            "{} rostered players are missing from the player catalog",
            run.report.needs_reconciliation.len()
        );
        eprintln!(
            "warning: players not in the catalog (rerun with --player-refresh): {}",
            run.report.needs_reconciliation.join(", ")
        );
    }
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn process_kept(config: &Config, store: &dyn SnapshotStore, season: u32) -> anyhow::Result<()> {
    let league_id = config
        .league
        .league_id_for(season)
        .ok_or_else(|| anyhow!("no league id configured for {season}"))?;
    let kept = pipeline::process_kept(config, store, season, league_id)?;
    let path = export::export_kept(config, season, league_id, &kept.records)?;

    println!("Kept players for {season}");
    for line in &kept.listing {
        println!("{line}");
    }
    println!("wrote {}", path.display());
    Ok(())
}

async fn refresh_all(config: &Config, store: &dyn SnapshotStore) -> anyhow::Result<()> {
    let client = SleeperClient::from_config(&config.sleeper);
    let options = RunOptions {
        refresh: true,
        ..RunOptions::default()
    };

    let mut failed = Vec::new();
    for season in config.league.eligible_years() {
        let result = async {
            let id = pipeline::resolve_league_id(config, &client, season).await?;
            pipeline::refresh_season(config, &options, &client, store, season, &id).await?;
            let run = pipeline::run_season(config, store, season, &id)?;
            export::export_season(config, &run, None)
        }
        .await;

        match result {
            Ok(written) => println!("{season}: wrote {} files", written.len()),
            Err(e) => {
                error!("{} failed: {:#}", season, e);
                eprintln!("{season}: {e:#}");
                failed.push(season);
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} season(s) failed: {:?}", failed.len(), failed);
    }
    Ok(())
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("sleeper-keeper.log"))?;

    let default_filter = if debug {
        "keeper_app=debug,keeper_core=debug,warn"
    } else {
        "keeper_app=info,keeper_core=info,warn"
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
