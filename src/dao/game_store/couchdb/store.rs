use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, NewGameEntity, RosterEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchOperation, CouchResult},
    models::{AllDocsResponse, CouchGameDocument, END_SUFFIX, GAME_PREFIX, game_doc_id},
};

/// Result of a PUT on a game document.
enum SaveOutcome {
    Saved,
    /// CouchDB refused the `_rev`; someone else wrote the document first.
    RevisionConflict,
}

/// CouchDB-backed [`GameStore`]: one `game::<uuid>` document per game.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    database_url: Arc<str>,
    credentials: Option<Arc<(String, String)>>,
}

impl CouchGameStore {
    /// Build the HTTP client and make sure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let store = Self::new(config)?;
        store.ensure_database().await?;
        Ok(store)
    }

    fn new(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;
        let database_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.database
        );

        Ok(Self {
            client,
            database_url: database_url.into(),
            credentials: config.username.zip(config.password).map(Arc::new),
        })
    }

    fn game_url(&self, id: Uuid) -> String {
        format!("{}/{}", self.database_url, game_doc_id(id))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.as_deref() {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn send(
        &self,
        operation: CouchOperation,
        target: &str,
        builder: RequestBuilder,
    ) -> CouchResult<Response> {
        self.authorized(builder)
            .send()
            .await
            .map_err(|source| CouchDaoError::transport(operation, target, source))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let url = self.database_url.as_ref();
        let response = self
            .send(CouchOperation::EnsureDatabase, url, self.client.get(url))
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let created = self
                    .send(CouchOperation::CreateDatabase, url, self.client.put(url))
                    .await?;
                match created.status() {
                    // 412: another instance created it in between.
                    status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => {
                        Ok(())
                    }
                    status => Err(CouchDaoError::status(
                        CouchOperation::CreateDatabase,
                        url,
                        status,
                    )),
                }
            }
            status => Err(CouchDaoError::status(
                CouchOperation::EnsureDatabase,
                url,
                status,
            )),
        }
    }

    async fn load(&self, id: Uuid) -> CouchResult<Option<CouchGameDocument>> {
        let url = self.game_url(id);
        let response = self
            .send(CouchOperation::LoadGame, &url, self.client.get(&url))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchGameDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::Decode {
                    target: url,
                    source,
                }),
            status => Err(CouchDaoError::status(CouchOperation::LoadGame, url, status)),
        }
    }

    async fn save(&self, id: Uuid, document: &CouchGameDocument) -> CouchResult<SaveOutcome> {
        let url = self.game_url(id);
        let response = self
            .send(
                CouchOperation::SaveGame,
                &url,
                self.client.put(&url).json(document),
            )
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(SaveOutcome::RevisionConflict),
            status if status.is_success() => Ok(SaveOutcome::Saved),
            status => Err(CouchDaoError::status(CouchOperation::SaveGame, url, status)),
        }
    }

    async fn list_games(&self) -> CouchResult<Vec<GameEntity>> {
        let url = format!("{}/_all_docs", self.database_url);
        let request = self.client.get(&url).query(&[
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{GAME_PREFIX}\"")),
            ("endkey", format!("\"{GAME_PREFIX}{END_SUFFIX}\"")),
        ]);
        let response = self.send(CouchOperation::ListGames, &url, request).await?;
        if !response.status().is_success() {
            return Err(CouchDaoError::status(
                CouchOperation::ListGames,
                url,
                response.status(),
            ));
        }

        let payload = response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::Decode {
                target: url.clone(),
                source,
            })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .map(|(doc_id, doc)| {
                CouchGameDocument::from_row(&doc_id, doc).and_then(GameEntity::try_from)
            })
            .collect()
    }

    async fn create_game(&self, game: NewGameEntity) -> CouchResult<GameEntity> {
        let entity = game.into_entity(Uuid::new_v4());
        match self.save(entity.id, &entity.clone().into()).await? {
            SaveOutcome::Saved => Ok(entity),
            SaveOutcome::RevisionConflict => Err(CouchDaoError::DuplicateGame { id: entity.id }),
        }
    }

    /// Version check on the fetched document, then a PUT guarded by its `_rev`.
    /// `false` when either moved on or the game is gone.
    async fn update_roster(
        &self,
        id: Uuid,
        expected_version: u64,
        roster: RosterEntity,
    ) -> CouchResult<bool> {
        let Some(mut document) = self.load(id).await? else {
            return Ok(false);
        };
        if !document.try_apply_roster(expected_version, roster) {
            return Ok(false);
        }

        Ok(matches!(
            self.save(id, &document).await?,
            SaveOutcome::Saved
        ))
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url.as_ref();
        let response = self
            .send(CouchOperation::Ping, url, self.client.get(url))
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::status(
                CouchOperation::Ping,
                url,
                response.status(),
            ))
        }
    }
}

impl GameStore for CouchGameStore {
    fn create_game(&self, game: NewGameEntity) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.load(id).await?;
            Ok(document.map(GameEntity::try_from).transpose()?)
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn update_roster(
        &self,
        id: Uuid,
        expected_version: u64,
        roster: RosterEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if store.update_roster(id, expected_version, roster).await? {
                Ok(())
            } else {
                Err(StorageError::conflict(id, expected_version))
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_urls_ignore_trailing_slash() {
        let store = CouchGameStore::new(CouchConfig::new("http://couch:5984/", "matchday")).unwrap();
        let id = Uuid::new_v4();
        assert_eq!(
            store.game_url(id),
            format!("http://couch:5984/matchday/game::{id}")
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let store = CouchGameStore::new(CouchConfig::new("http://127.0.0.1:9", "matchday")).unwrap();
        let err = store.find_game(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}
