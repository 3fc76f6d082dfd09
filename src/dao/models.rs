use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Snapshot of a user taken when they joined a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Identity of the user as issued by the auth provider.
    pub id: String,
    /// Display name at the time of joining.
    pub name: String,
    /// Contact handle at the time of joining, when the user has one.
    #[serde(default)]
    pub whatsapp: Option<String>,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameEntity {
    /// Primary key of the game, assigned by the store.
    pub id: Uuid,
    /// Where the game is played.
    pub venue: String,
    /// Scheduled kick-off.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Capacity of the participant list.
    pub max_players: u32,
    /// Confirmed players in join order.
    pub participants: Vec<ParticipantEntity>,
    /// Players waiting for a slot, in arrival order.
    pub waiting_list: Vec<ParticipantEntity>,
    /// Creation timestamp, never updated.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Write counter bumped by every roster update.
    #[serde(default)]
    pub version: u64,
}

/// Fields supplied when a game is first persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameEntity {
    pub venue: String,
    pub date: OffsetDateTime,
    pub max_players: u32,
    pub created_at: OffsetDateTime,
}

impl NewGameEntity {
    /// Materialise the stored entity once an identifier has been allocated.
    pub fn into_entity(self, id: Uuid) -> GameEntity {
        GameEntity {
            id,
            venue: self.venue,
            date: self.date,
            max_players: self.max_players,
            participants: Vec::new(),
            waiting_list: Vec::new(),
            created_at: self.created_at,
            version: 0,
        }
    }
}

/// The mutable part of a game written back by join and cancel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntity {
    pub participants: Vec<ParticipantEntity>,
    pub waiting_list: Vec<ParticipantEntity>,
}

impl GameEntity {
    /// Replace the roster and bump the version, as every store does on a successful write.
    pub fn apply_roster(&mut self, roster: RosterEntity) {
        self.participants = roster.participants;
        self.waiting_list = roster.waiting_list;
        self.version += 1;
    }
}
