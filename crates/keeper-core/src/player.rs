// Player identity, positions, and the platform player catalog.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Football positions that matter for keeper valuation.
///
/// Anything the platform reports that is not one of the five keeper positions
/// (kickers, IDP slots, unmatched team codes) collapses to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    DEF,
    Unknown,
}

/// The positions a keeper can be priced at, in display order.
pub const KEEPER_POSITIONS: [Position; 5] = [
    Position::QB,
    Position::RB,
    Position::WR,
    Position::TE,
    Position::DEF,
];

impl Position {
    /// Parse a platform position code. Never fails; unrecognised codes map to
    /// `Unknown`.
    pub fn from_str_pos(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "QB" => Position::QB,
            "RB" => Position::RB,
            "WR" => Position::WR,
            "TE" => Position::TE,
            "DEF" | "DST" | "D/ST" => Position::DEF,
            _ => Position::Unknown,
        }
    }

    /// Strict parse used for user input such as the `--pos` filter.
    pub fn parse_keeper_position(s: &str) -> Option<Self> {
        match Self::from_str_pos(s) {
            Position::Unknown => None,
            pos => Some(pos),
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::DEF => "DEF",
            Position::Unknown => "UNK",
        }
    }

    pub fn is_keeper_position(&self) -> bool {
        !matches!(self, Position::Unknown)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub full_name: String,
    pub position: Position,
    pub team: Option<String>,
}

impl Player {
    /// Stand-in for a rostered id the catalog does not know about.
    pub fn placeholder(player_id: &str) -> Self {
        Player {
            player_id: player_id.to_string(),
            full_name: format!("Unknown player {player_id}"),
            position: Position::Unknown,
            team: None,
        }
    }
}

/// One entry of the platform's player dump, as delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlayer {
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Lookup table over the platform player dump.
#[derive(Debug, Clone, Default)]
pub struct PlayerCatalog {
    players: BTreeMap<String, Player>,
    by_name: HashMap<String, Vec<String>>,
}

impl PlayerCatalog {
    /// Build from the raw dump keyed by player id. The map key wins over an
    /// embedded `player_id` when both are present.
    pub fn from_raw(raw: &BTreeMap<String, RawPlayer>) -> Self {
        let players = raw
            .iter()
            .map(|(id, entry)| {
                let first = entry.first_name.as_deref().unwrap_or("").trim();
                let last = entry.last_name.as_deref().unwrap_or("").trim();
                let full_name = match (first.is_empty(), last.is_empty()) {
                    (true, true) => id.clone(),
                    (false, true) => first.to_string(),
                    (true, false) => last.to_string(),
                    (false, false) => format!("{first} {last}"),
                };
                let player = Player {
                    player_id: id.clone(),
                    full_name,
                    position: Position::from_str_pos(entry.position.as_deref().unwrap_or("")),
                    team: entry.team.clone(),
                };
                (id.clone(), player)
            })
            .collect();
        Self::from_players(players)
    }

    pub fn from_players(players: BTreeMap<String, Player>) -> Self {
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for player in players.values() {
            by_name
                .entry(normalize_name(&player.full_name))
                .or_default()
                .push(player.player_id.clone());
        }
        PlayerCatalog { players, by_name }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Returns the catalog entry, or a placeholder plus `false` when the id is
    /// unknown.
    pub fn lookup_or_placeholder(&self, player_id: &str) -> (Player, bool) {
        match self.players.get(player_id) {
            Some(p) => (p.clone(), true),
            None => (Player::placeholder(player_id), false),
        }
    }

    /// Exact, case-insensitive full-name match. Returns every candidate id in
    /// ascending order so callers can detect ambiguity.
    pub fn find_by_full_name(&self, name: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .by_name
            .get(&normalize_name(name))
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(first: &str, last: &str, pos: &str) -> RawPlayer {
        RawPlayer {
            player_id: None,
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            position: Some(pos.into()),
            team: Some("SEA".into()),
        }
    }

    fn sample_catalog() -> PlayerCatalog {
        let mut dump = BTreeMap::new();
        dump.insert("4034".to_string(), raw("Christian", "McCaffrey", "RB"));
        dump.insert("4068".to_string(), raw("Mike", "Williams", "WR"));
        dump.insert("4950".to_string(), raw("Mike", "Williams", "WR"));
        dump.insert("SEA".to_string(), raw("Seattle", "Seahawks", "DEF"));
        dump.insert("1234".to_string(), raw("Justin", "Tucker", "K"));
        PlayerCatalog::from_raw(&dump)
    }

    // -- Position --

    #[test]
    fn position_parsing() {
        assert_eq!(Position::from_str_pos("qb"), Position::QB);
        assert_eq!(Position::from_str_pos("DEF"), Position::DEF);
        assert_eq!(Position::from_str_pos("K"), Position::Unknown);
        assert_eq!(Position::parse_keeper_position("te"), Some(Position::TE));
        assert_eq!(Position::parse_keeper_position("K"), None);
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::RB.to_string(), "RB");
        assert_eq!(Position::Unknown.to_string(), "UNK");
    }

    // -- Catalog --

    #[test]
    fn builds_full_names_and_positions() {
        let catalog = sample_catalog();
        let cmc = catalog.get("4034").unwrap();
        assert_eq!(cmc.full_name, "Christian McCaffrey");
        assert_eq!(cmc.position, Position::RB);

        let kicker = catalog.get("1234").unwrap();
        assert_eq!(kicker.position, Position::Unknown);
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let catalog = sample_catalog();
        assert_eq!(catalog.find_by_full_name("christian mccaffrey"), vec!["4034"]);
        assert_eq!(catalog.find_by_full_name("  SEATTLE SEAHAWKS "), vec!["SEA"]);
        assert!(catalog.find_by_full_name("Christian McCaffery").is_empty());
    }

    #[test]
    fn duplicate_names_return_all_candidates() {
        let catalog = sample_catalog();
        assert_eq!(catalog.find_by_full_name("Mike Williams"), vec!["4068", "4950"]);
    }

    #[test]
    fn unknown_id_yields_placeholder() {
        let catalog = sample_catalog();
        let (player, found) = catalog.lookup_or_placeholder("9999");
        assert!(!found);
        assert_eq!(player.player_id, "9999");
        assert_eq!(player.position, Position::Unknown);

        let (player, found) = catalog.lookup_or_placeholder("4034");
        assert!(found);
        assert_eq!(player.full_name, "Christian McCaffrey");
    }

    #[test]
    fn missing_names_fall_back_to_id() {
        let mut dump = BTreeMap::new();
        dump.insert("OAK".to_string(), RawPlayer::default());
        let catalog = PlayerCatalog::from_raw(&dump);
        assert_eq!(catalog.get("OAK").unwrap().full_name, "OAK");
    }
}
