// Error taxonomy for the keeper engine and its ingestion boundary.

use thiserror::Error;

/// Broad classification of a `KeeperError`, used by callers to decide how to
/// report a failed run (fix upstream data, fix the kept-players CSV, or add a
/// disambiguation override).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream records are inconsistent with each other.
    DataIntegrity,
    /// A name in the keeper history matched no player.
    UnmatchedEntity,
    /// A name in the keeper history matched more than one player.
    AmbiguousEntity,
}

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error(
        "roster {roster_id} is owned by user {owner_id}, which has no display name; \
         refresh the league users or fix the cached users snapshot"
    )]
    MissingDisplayName { owner_id: String, roster_id: u32 },

    #[error("roster {roster_id} has no owner; assign the roster in the league before computing keepers")]
    OrphanRoster { roster_id: u32 },

    #[error("display name `{name}` is used by more than one owner ({first_owner_id}, {second_owner_id})")]
    DuplicateOwnerName {
        name: String,
        first_owner_id: String,
        second_owner_id: String,
    },

    #[error("traded pick references roster {roster_id}, which is not in the roster index")]
    UnknownRoster { roster_id: u32 },

    #[error(
        "kept player `{name}` (manager {manager}) matches no player in the catalog; \
         correct the name in the kept players CSV or add a name override"
    )]
    UnmatchedKeptPlayer { name: String, manager: String },

    #[error(
        "kept player `{name}` matches several players ({}); add a name override to pick one",
        candidates.join(", ")
    )]
    AmbiguousKeptPlayer { name: String, candidates: Vec<String> },

    #[error("invalid {record} record: {detail}")]
    InvalidRecord { record: &'static str, detail: String },

    #[error("failed to read kept players CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl KeeperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeeperError::UnmatchedKeptPlayer { .. } => ErrorKind::UnmatchedEntity,
            KeeperError::AmbiguousKeptPlayer { .. } => ErrorKind::AmbiguousEntity,
            KeeperError::MissingDisplayName { .. }
            | KeeperError::OrphanRoster { .. }
            | KeeperError::DuplicateOwnerName { .. }
            | KeeperError::UnknownRoster { .. }
            | KeeperError::InvalidRecord { .. }
            | KeeperError::Csv(_) => ErrorKind::DataIntegrity,
        }
    }

    pub(crate) fn invalid(record: &'static str, detail: impl Into<String>) -> Self {
        KeeperError::InvalidRecord {
            record,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeeperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let unmatched = KeeperError::UnmatchedKeptPlayer {
            name: "Nobody".into(),
            manager: "chilliah".into(),
        };
        assert_eq!(unmatched.kind(), ErrorKind::UnmatchedEntity);

        let ambiguous = KeeperError::AmbiguousKeptPlayer {
            name: "Mike Williams".into(),
            candidates: vec!["4068".into(), "4950".into()],
        };
        assert_eq!(ambiguous.kind(), ErrorKind::AmbiguousEntity);

        let missing = KeeperError::MissingDisplayName {
            owner_id: "123".into(),
            roster_id: 4,
        };
        assert_eq!(missing.kind(), ErrorKind::DataIntegrity);
    }

    #[test]
    fn messages_name_the_missing_key() {
        let err = KeeperError::MissingDisplayName {
            owner_id: "461690174502334464".into(),
            roster_id: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("461690174502334464"));
        assert!(msg.contains("roster 7"));

        let err = KeeperError::AmbiguousKeptPlayer {
            name: "Mike Williams".into(),
            candidates: vec!["4068".into(), "4950".into()],
        };
        assert!(err.to_string().contains("4068, 4950"));
    }
}
