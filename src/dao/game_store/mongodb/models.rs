use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{GameEntity, ParticipantEntity};

/// Shape of a game inside the `games` collection.
///
/// Identifiers are stored as hyphenated strings and counters as `i64` so the
/// documents stay readable from any client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    venue: String,
    #[serde(with = "time::serde::rfc3339")]
    date: OffsetDateTime,
    max_players: i64,
    #[serde(default)]
    participants: Vec<ParticipantEntity>,
    #[serde(default)]
    waiting_list: Vec<ParticipantEntity>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(default)]
    version: i64,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            venue: value.venue,
            date: value.date,
            max_players: i64::from(value.max_players),
            participants: value.participants,
            waiting_list: value.waiting_list,
            created_at: value.created_at,
            version: version_as_i64(value.version),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        let invalid = |reason| MongoDaoError::InvalidDocument {
            doc_id: value.id.clone(),
            reason,
        };
        let id = Uuid::parse_str(&value.id).map_err(|_| invalid("id is not a UUID"))?;
        let max_players =
            u32::try_from(value.max_players).map_err(|_| invalid("maxPlayers out of range"))?;
        let version = u64::try_from(value.version).map_err(|_| invalid("negative version"))?;

        Ok(Self {
            id,
            venue: value.venue,
            date: value.date,
            max_players,
            participants: value.participants,
            waiting_list: value.waiting_list,
            created_at: value.created_at,
            version,
        })
    }
}

pub fn version_as_i64(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching a game only while it is still at `version`.
///
/// Documents written without a `version` field read back as version 0, so the
/// version 0 filter also matches a missing field.
pub fn versioned_doc_id(id: Uuid, version: u64) -> Document {
    if version == 0 {
        doc! {
            "_id": id.to_string(),
            "$or": [{"version": 0_i64}, {"version": {"$exists": false}}],
        }
    } else {
        doc! {"_id": id.to_string(), "version": version_as_i64(version)}
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn entity() -> GameEntity {
        GameEntity {
            id: Uuid::new_v4(),
            venue: "Five-a-side arena".into(),
            date: datetime!(2026-11-05 20:00 +01:00),
            max_players: 10,
            participants: vec![ParticipantEntity {
                id: "u-1".into(),
                name: "Ana".into(),
                whatsapp: Some("+33600000000".into()),
            }],
            waiting_list: Vec::new(),
            created_at: datetime!(2026-10-17 08:00 UTC),
            version: 3,
        }
    }

    #[test]
    fn document_conversion_keeps_every_field() {
        let original = entity();
        let document = MongoGameDocument::from(original.clone());
        let restored = GameEntity::try_from(document).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn negative_capacity_is_rejected() {
        let mut document = MongoGameDocument::from(entity());
        document.max_players = -1;
        assert!(matches!(
            GameEntity::try_from(document),
            Err(MongoDaoError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn version_filter_pins_the_expected_version() {
        let id = Uuid::new_v4();
        assert_eq!(
            versioned_doc_id(id, 4),
            doc! {"_id": id.to_string(), "version": 4_i64}
        );
    }

    #[test]
    fn first_write_also_matches_unversioned_documents() {
        let id = Uuid::new_v4();
        assert_eq!(
            versioned_doc_id(id, 0),
            doc! {
                "_id": id.to_string(),
                "$or": [{"version": 0_i64}, {"version": {"$exists": false}}],
            }
        );
    }

    #[test]
    fn unversioned_document_reads_as_version_zero() {
        let document: MongoGameDocument = mongodb::bson::deserialize_from_document(doc! {
            "_id": Uuid::new_v4().to_string(),
            "venue": "Five-a-side arena",
            "date": "2026-11-05T20:00:00+01:00",
            "maxPlayers": 10_i64,
            "createdAt": "2026-10-17T08:00:00Z",
        })
        .unwrap();
        assert_eq!(GameEntity::try_from(document).unwrap().version, 0);
    }
}
