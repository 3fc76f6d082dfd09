use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::{
    game_store::couchdb::error::CouchDaoError,
    models::{GameEntity, ParticipantEntity, RosterEntity},
};

pub const GAME_PREFIX: &str = "game::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameBody {
    pub venue: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub max_players: u32,
    #[serde(default)]
    pub participants: Vec<ParticipantEntity>,
    #[serde(default)]
    pub waiting_list: Vec<ParticipantEntity>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub version: u64,
}

impl From<GameEntity> for CouchGameDocument {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game_doc_id(game.id),
            rev: None,
            game: GameBody {
                venue: game.venue,
                date: game.date,
                max_players: game.max_players,
                participants: game.participants,
                waiting_list: game.waiting_list,
                created_at: game.created_at,
                version: game.version,
            },
        }
    }
}

impl CouchGameDocument {
    /// Swap in a new roster and advance the version when the stored version
    /// still equals `expected_version`. `_rev` is kept for the conditional PUT.
    ///
    /// Returns `false`, leaving the document untouched, on a stale version.
    pub fn try_apply_roster(&mut self, expected_version: u64, roster: RosterEntity) -> bool {
        if self.game.version != expected_version {
            return false;
        }
        self.game.participants = roster.participants;
        self.game.waiting_list = roster.waiting_list;
        self.game.version += 1;
        true
    }

    /// Decode one `_all_docs` row body.
    pub fn from_row(doc_id: &str, value: Value) -> Result<Self, CouchDaoError> {
        serde_json::from_value(value).map_err(|source| CouchDaoError::InvalidGame {
            doc_id: doc_id.to_string(),
            source,
        })
    }
}

impl TryFrom<CouchGameDocument> for GameEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchGameDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            venue: doc.game.venue,
            date: doc.game.date,
            max_players: doc.game.max_players,
            participants: doc.game.participants,
            waiting_list: doc.game.waiting_list,
            created_at: doc.game.created_at,
            version: doc.game.version,
        })
    }
}

pub fn game_doc_id(id: Uuid) -> String {
    format!("{}{}", GAME_PREFIX, id)
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}
