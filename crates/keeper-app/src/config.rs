// Configuration loading and parsing (league.toml, overrides.toml).

use keeper_core::transactions::TradeExclusion;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("cannot set up config/ from defaults/: {message}")]
    SeedError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub storage: StorageConfig,
    pub sleeper: SleeperConfig,
    pub overrides: OverridesConfig,
}

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Re-fetch league data from the platform instead of using the cache.
    pub refresh: bool,
    /// Re-fetch the full player catalog.
    pub player_refresh: bool,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: RawLeague,
    storage: StorageConfig,
    #[serde(default)]
    sleeper: SleeperConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLeague {
    name: String,
    platform: String,
    username: String,
    first_year: u32,
    current_year: u32,
    /// TOML keys are strings; converted to years during loading.
    #[serde(default)]
    seasons: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct LeagueConfig {
    /// Must match the league name on the platform exactly.
    pub name: String,
    pub platform: String,
    pub username: String,
    pub first_year: u32,
    pub current_year: u32,
    /// Year -> platform league id.
    pub seasons: BTreeMap<u32, String>,
}

impl LeagueConfig {
    pub fn league_id_for(&self, year: u32) -> Option<&str> {
        self.seasons.get(&year).map(String::as_str)
    }

    /// Years with a configured league, oldest first.
    pub fn eligible_years(&self) -> Vec<u32> {
        self.seasons.keys().copied().collect()
    }

    pub fn is_first_year(&self, year: u32) -> bool {
        year == self.first_year
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: String,
    pub data_dir: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "sleeper-keeper.db".into()
}

impl StorageConfig {
    /// Only meaningful after validation.
    pub fn backend_kind(&self) -> StorageBackend {
        if self.backend.eq_ignore_ascii_case("sqlite") {
            StorageBackend::Sqlite
        } else {
            StorageBackend::File
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SleeperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Last week whose transactions are fetched (weeks start at 0).
    #[serde(default = "default_last_week")]
    pub last_week: u32,
}

impl Default for SleeperConfig {
    fn default() -> Self {
        SleeperConfig {
            base_url: default_base_url(),
            last_week: default_last_week(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.sleeper.app/v1".into()
}

fn default_last_week() -> u32 {
    18
}

// ---------------------------------------------------------------------------
// overrides.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverridesConfig {
    #[serde(default)]
    pub trade_exclusions: Vec<TradeExclusion>,
    /// Lowercased full name -> player id.
    #[serde(default)]
    pub name_overrides: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and (optionally)
/// `config/overrides.toml`, both relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` handles that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let mut seasons = BTreeMap::new();
    for (year, id) in league_file.league.seasons {
        let parsed: u32 = year.trim().parse().map_err(|_| ConfigError::ValidationError {
            field: format!("league.seasons.{year}"),
            message: "season keys must be years".into(),
        })?;
        seasons.insert(parsed, id);
    }

    let league = LeagueConfig {
        name: league_file.league.name,
        platform: league_file.league.platform,
        username: league_file.league.username,
        first_year: league_file.league.first_year,
        current_year: league_file.league.current_year,
        seasons,
    };

    // --- overrides.toml (optional) ---
    let overrides_path = config_dir.join("overrides.toml");
    let overrides = if overrides_path.exists() {
        let text = read_file(&overrides_path)?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: overrides_path.clone(),
            source: e,
        })?
    } else {
        OverridesConfig::default()
    };

    let config = Config {
        league,
        storage: league_file.storage,
        sleeper: league_file.sleeper,
        overrides,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` with any league file the user has not created yet, taken
/// from the shipped `defaults/`. Existing files are never touched, and
/// `*.example` seeds (the overrides template) are left for the user to copy.
/// Returns the paths that were created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let seeds_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !seeds_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(Vec::new());
        }
        return Err(ConfigError::SeedError {
            message: format!(
                "{} has neither config/league.toml nor a defaults/ directory to create it from; \
                 run sleeper-keeper from its install directory",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::SeedError {
        message: format!("cannot create {}: {e}", config_dir.display()),
    })?;

    let listing = std::fs::read_dir(&seeds_dir).map_err(|e| ConfigError::SeedError {
        message: format!("cannot list {}: {e}", seeds_dir.display()),
    })?;

    let mut created = Vec::new();
    for item in listing {
        let seed = item
            .map_err(|e| ConfigError::SeedError {
                message: format!("cannot list {}: {e}", seeds_dir.display()),
            })?
            .path();
        let Some(name) = seed.file_name().filter(|_| seed.is_file()) else {
            continue;
        };
        if seed.extension().is_some_and(|ext| ext == "example") {
            continue;
        }
        let target = config_dir.join(name);
        if seed_if_absent(&seed, &target)? {
            created.push(target);
        }
    }

    Ok(created)
}

/// Copy `seed` to `target` unless `target` already exists.
fn seed_if_absent(seed: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(ConfigError::SeedError {
                message: format!("cannot create {}: {e}", target.display()),
            })
        }
    };
    let body = std::fs::read(seed).map_err(|e| ConfigError::SeedError {
        message: format!("cannot read seed {}: {e}", seed.display()),
    })?;
    std::io::Write::write_all(&mut dest, &body).map_err(|e| ConfigError::SeedError {
        message: format!("cannot write {}: {e}", target.display()),
    })?;
    Ok(true)
}

/// League config for a run: seeds `config/` from `defaults/` in the working
/// directory, then loads and validates it.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("config/league.toml"),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;

    if league.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.name".into(),
            message: "must not be empty".into(),
        });
    }

    if !league.platform.eq_ignore_ascii_case("sleeper") {
        return Err(ConfigError::ValidationError {
            field: "league.platform".into(),
            message: format!("only \"sleeper\" is supported, got \"{}\"", league.platform),
        });
    }

    if league.first_year > league.current_year {
        return Err(ConfigError::ValidationError {
            field: "league.first_year".into(),
            message: format!(
                "must not be after current_year ({} > {})",
                league.first_year, league.current_year
            ),
        });
    }

    if league.league_id_for(league.current_year).is_none() {
        return Err(ConfigError::ValidationError {
            field: "league.seasons".into(),
            message: format!("no league id configured for current_year {}", league.current_year),
        });
    }

    if let Some((year, _)) = league.seasons.iter().find(|(_, id)| id.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: format!("league.seasons.{year}"),
            message: "league id must not be empty".into(),
        });
    }

    let backend = config.storage.backend.to_ascii_lowercase();
    if backend != "file" && backend != "sqlite" {
        return Err(ConfigError::ValidationError {
            field: "storage.backend".into(),
            message: format!("must be \"file\" or \"sqlite\", got \"{}\"", config.storage.backend),
        });
    }

    if config.storage.data_dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "storage.data_dir".into(),
            message: "must not be empty".into(),
        });
    }

    if config.sleeper.last_week == 0 {
        return Err(ConfigError::ValidationError {
            field: "sleeper.last_week".into(),
            message: "must be >= 1".into(),
        });
    }

    for exclusion in &config.overrides.trade_exclusions {
        if !league.seasons.contains_key(&exclusion.season) {
            return Err(ConfigError::ValidationError {
                field: "trade_exclusions.season".into(),
                message: format!(
                    "season {} (player {}) is not a configured season",
                    exclusion.season, exclusion.player_id
                ),
            });
        }
    }

    if let Some((name, _)) = config
        .overrides
        .name_overrides
        .iter()
        .find(|(_, id)| id.trim().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: format!("name_overrides.{name}"),
            message: "player id must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn crate_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    }

    /// Fresh temp project dir with `defaults/` copied in.
    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        for file in ["league.toml", "overrides.toml.example"] {
            fs::copy(
                crate_root().join("defaults").join(file),
                tmp.join("defaults").join(file),
            )
            .unwrap();
        }
        tmp
    }

    fn write_league(dir: &Path, body: &str) {
        fs::create_dir_all(dir.join("config")).unwrap();
        fs::write(dir.join("config/league.toml"), body).unwrap();
    }

    const MINIMAL: &str = r#"
[league]
name = "Test League"
platform = "sleeper"
username = "someone"
first_year = 2020
current_year = 2021

[league.seasons]
2020 = "100"
2021 = "200"

[storage]
backend = "file"
data_dir = "data_files"
"#;

    // -- defaults --

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = scratch("keeper_config_defaults");
        let copied = ensure_config_files(&tmp).expect("should copy default configs");
        assert_eq!(copied.len(), 1, "example files are not copied");

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.league.name, "YAFL 2.0");
        assert_eq!(config.league.platform, "sleeper");
        assert_eq!(config.league.first_year, 2019);
        assert!(config.league.league_id_for(config.league.current_year).is_some());
        assert_eq!(config.storage.backend_kind(), StorageBackend::File);
        assert_eq!(config.sleeper.base_url, "https://api.sleeper.app/v1");
        assert_eq!(config.sleeper.last_week, 18);
        assert!(config.overrides.trade_exclusions.is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_does_not_overwrite() {
        let tmp = scratch("keeper_config_no_overwrite");
        write_league(&tmp, MINIMAL);
        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.league.name, "Test League");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_defaults_and_config_is_error() {
        let tmp = std::env::temp_dir().join("keeper_config_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::SeedError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn config_without_defaults_is_used_as_is() {
        let tmp = std::env::temp_dir().join("keeper_config_no_seeds");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, MINIMAL);
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(load_config_from(&tmp).unwrap().league.name, "Test League");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_league_toml_is_file_not_found() {
        let tmp = std::env::temp_dir().join("keeper_config_missing_league");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    // -- seasons --

    #[test]
    fn seasons_are_years() {
        let tmp = std::env::temp_dir().join("keeper_config_seasons");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, MINIMAL);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.league.eligible_years(), vec![2020, 2021]);
        assert_eq!(config.league.league_id_for(2020), Some("100"));
        assert!(config.league.is_first_year(2020));
        assert!(!config.league.is_first_year(2021));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn non_numeric_season_key_is_rejected() {
        let tmp = std::env::temp_dir().join("keeper_config_bad_season");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, &MINIMAL.replace("2020 = \"100\"", "last = \"100\""));
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "league.seasons.last"));
        let _ = fs::remove_dir_all(&tmp);
    }

    // -- validation --

    #[test]
    fn current_year_needs_league_id() {
        let tmp = std::env::temp_dir().join("keeper_config_no_current");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, &MINIMAL.replace("current_year = 2021", "current_year = 2022"));
        let err = load_config_from(&tmp).unwrap_err();
        assert!(err.to_string().contains("current_year 2022"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn first_year_after_current_is_rejected() {
        let tmp = std::env::temp_dir().join("keeper_config_first_after");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, &MINIMAL.replace("first_year = 2020", "first_year = 2023"));
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ValidationError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let tmp = std::env::temp_dir().join("keeper_config_backend");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, &MINIMAL.replace("backend = \"file\"", "backend = \"s3\""));
        let err = load_config_from(&tmp).unwrap_err();
        assert!(err.to_string().contains("storage.backend"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn sqlite_backend_and_db_path() {
        let tmp = std::env::temp_dir().join("keeper_config_sqlite");
        let _ = fs::remove_dir_all(&tmp);
        write_league(
            &tmp,
            &MINIMAL.replace("backend = \"file\"", "backend = \"sqlite\"\ndb_path = \"k.db\""),
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.storage.backend_kind(), StorageBackend::Sqlite);
        assert_eq!(config.storage.db_path, "k.db");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_names_the_file() {
        let tmp = std::env::temp_dir().join("keeper_config_parse");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, "[league\nname = ");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("league.toml"));
        let _ = fs::remove_dir_all(&tmp);
    }

    // -- overrides --

    #[test]
    fn overrides_are_loaded() {
        let tmp = std::env::temp_dir().join("keeper_config_overrides");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, MINIMAL);
        fs::write(
            tmp.join("config/overrides.toml"),
            r#"
[[trade_exclusions]]
league_id = "200"
season = 2021
player_id = "4034"
reason = "ruled invalid"

[name_overrides]
"mike williams" = "4068"
"#,
        )
        .unwrap();
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.overrides.trade_exclusions.len(), 1);
        assert_eq!(config.overrides.trade_exclusions[0].player_id, "4034");
        assert_eq!(
            config.overrides.name_overrides.get("mike williams").map(String::as_str),
            Some("4068")
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn exclusion_for_unknown_season_is_rejected() {
        let tmp = std::env::temp_dir().join("keeper_config_bad_exclusion");
        let _ = fs::remove_dir_all(&tmp);
        write_league(&tmp, MINIMAL);
        fs::write(
            tmp.join("config/overrides.toml"),
            "[[trade_exclusions]]\nleague_id = \"x\"\nseason = 1999\nplayer_id = \"1\"\n",
        )
        .unwrap();
        let err = load_config_from(&tmp).unwrap_err();
        assert!(err.to_string().contains("1999"));
        let _ = fs::remove_dir_all(&tmp);
    }
}
