use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Step of the game store that talked to CouchDB, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouchOperation {
    EnsureDatabase,
    CreateDatabase,
    Ping,
    LoadGame,
    SaveGame,
    ListGames,
}

impl std::fmt::Display for CouchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CouchOperation::EnsureDatabase => "check database",
            CouchOperation::CreateDatabase => "create database",
            CouchOperation::Ping => "ping",
            CouchOperation::LoadGame => "load game",
            CouchOperation::SaveGame => "save game",
            CouchOperation::ListGames => "list games",
        })
    }
}

/// Failures of the CouchDB game store.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// No HTTP response came back.
    #[error("CouchDB {operation} on `{target}` failed")]
    Transport {
        operation: CouchOperation,
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB {operation} on `{target}` answered {status}")]
    UnexpectedStatus {
        operation: CouchOperation,
        target: String,
        status: StatusCode,
    },
    #[error("unreadable CouchDB response body for `{target}`")]
    Decode {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    /// A `game::` document whose body is not a game.
    #[error("document `{doc_id}` is not a valid game")]
    InvalidGame {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid document ID `{doc_id}`: {kind}")]
    InvalidDocId { doc_id: String, kind: &'static str },
    #[error("game `{id}` already exists")]
    DuplicateGame { id: Uuid },
}

impl CouchDaoError {
    pub(super) fn transport(
        operation: CouchOperation,
        target: impl Into<String>,
        source: reqwest::Error,
    ) -> Self {
        CouchDaoError::Transport {
            operation,
            target: target.into(),
            source,
        }
    }

    pub(super) fn status(
        operation: CouchOperation,
        target: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        CouchDaoError::UnexpectedStatus {
            operation,
            target: target.into(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_name_the_operation() {
        let err = CouchDaoError::status(
            CouchOperation::SaveGame,
            "game::42",
            StatusCode::FORBIDDEN,
        );
        assert_eq!(
            err.to_string(),
            "CouchDB save game on `game::42` answered 403 Forbidden"
        );
    }
}
