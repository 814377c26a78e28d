// Sleeper API client and the `LeagueSource` seam the pipeline fetches through.
//
// Only the read-only, unauthenticated endpoints are used. There are no
// retries: a failed request fails the refresh with the URL that was tried.

use async_trait::async_trait;
use keeper_core::draft::RawDraftPick;
use keeper_core::player::RawPlayer;
use keeper_core::roster::{RawRoster, RawUser};
use keeper_core::transactions::RawTransaction;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SleeperConfig;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueSettings {
    #[serde(default)]
    pub trade_deadline: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleeperLeague {
    pub league_id: String,
    pub name: String,
    pub season: String,
    #[serde(default)]
    pub previous_league_id: Option<String>,
    #[serde(default)]
    pub settings: LeagueSettings,
}

impl SleeperLeague {
    /// A league with no predecessor is its franchise's first season.
    pub fn is_inaugural(&self) -> bool {
        match self.previous_league_id.as_deref() {
            None => true,
            Some(id) => id.is_empty() || id == "0",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleeperDraft {
    pub draft_id: String,
    #[serde(rename = "type")]
    pub draft_type: String,
    pub season: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SleeperUser {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SleeperError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },

    #[error("no Sleeper user named `{username}`")]
    UserNotFound { username: String },

    #[error("user `{username}` has no {season} league named `{name}`")]
    LeagueNotFound {
        username: String,
        season: u32,
        name: String,
    },
}

// ---------------------------------------------------------------------------
// LeagueSource
// ---------------------------------------------------------------------------

/// The platform calls a season refresh needs.
#[async_trait]
pub trait LeagueSource: Send + Sync {
    async fn league(&self, league_id: &str) -> Result<SleeperLeague, SleeperError>;
    async fn users(&self, league_id: &str) -> Result<Vec<RawUser>, SleeperError>;
    async fn rosters(&self, league_id: &str) -> Result<Vec<RawRoster>, SleeperError>;
    async fn drafts(&self, league_id: &str) -> Result<Vec<SleeperDraft>, SleeperError>;
    async fn draft_picks(&self, draft_id: &str) -> Result<Vec<RawDraftPick>, SleeperError>;
    async fn transactions(&self, league_id: &str, week: u32) -> Result<Vec<RawTransaction>, SleeperError>;
    async fn players(&self) -> Result<BTreeMap<String, RawPlayer>, SleeperError>;
    async fn user(&self, username: &str) -> Result<Option<SleeperUser>, SleeperError>;
    async fn user_leagues(&self, user_id: &str, season: u32) -> Result<Vec<SleeperLeague>, SleeperError>;
}

/// Resolve a league id from a member's username and the exact league name.
pub async fn discover_league<S: LeagueSource + ?Sized>(
    source: &S,
    username: &str,
    season: u32,
    name: &str,
) -> Result<SleeperLeague, SleeperError> {
    let user = source
        .user(username)
        .await?
        .ok_or_else(|| SleeperError::UserNotFound {
            username: username.to_string(),
        })?;
    let leagues = source.user_leagues(&user.user_id, season).await?;
    let league = leagues
        .into_iter()
        .find(|l| l.name == name)
        .ok_or_else(|| SleeperError::LeagueNotFound {
            username: username.to_string(),
            season,
            name: name.to_string(),
        })?;
    info!("found {} league `{}`: {}", season, name, league.league_id);
    Ok(league)
}

// ---------------------------------------------------------------------------
// SleeperClient
// ---------------------------------------------------------------------------

pub struct SleeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &SleeperConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SleeperError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| SleeperError::Http {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SleeperError::Status {
                url,
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|source| SleeperError::Decode { url, source })
    }
}

#[async_trait]
impl LeagueSource for SleeperClient {
    async fn league(&self, league_id: &str) -> Result<SleeperLeague, SleeperError> {
        self.get_json(&format!("/league/{league_id}")).await
    }

    async fn users(&self, league_id: &str) -> Result<Vec<RawUser>, SleeperError> {
        self.get_json(&format!("/league/{league_id}/users")).await
    }

    async fn rosters(&self, league_id: &str) -> Result<Vec<RawRoster>, SleeperError> {
        self.get_json(&format!("/league/{league_id}/rosters")).await
    }

    async fn drafts(&self, league_id: &str) -> Result<Vec<SleeperDraft>, SleeperError> {
        self.get_json(&format!("/league/{league_id}/drafts")).await
    }

    async fn draft_picks(&self, draft_id: &str) -> Result<Vec<RawDraftPick>, SleeperError> {
        self.get_json(&format!("/draft/{draft_id}/picks")).await
    }

    async fn transactions(&self, league_id: &str, week: u32) -> Result<Vec<RawTransaction>, SleeperError> {
        let mut txs: Vec<RawTransaction> = self
            .get_json(&format!("/league/{league_id}/transactions/{week}"))
            .await?;
        for tx in &mut txs {
            tx.week = Some(week);
        }
        Ok(txs)
    }

    async fn players(&self) -> Result<BTreeMap<String, RawPlayer>, SleeperError> {
        self.get_json("/players/nfl").await
    }

    async fn user(&self, username: &str) -> Result<Option<SleeperUser>, SleeperError> {
        // Unknown usernames come back as a JSON `null` with status 200.
        self.get_json(&format!("/user/{username}")).await
    }

    async fn user_leagues(&self, user_id: &str, season: u32) -> Result<Vec<SleeperLeague>, SleeperError> {
        self.get_json(&format!("/user/{user_id}/leagues/nfl/{season}"))
            .await
    }
}
