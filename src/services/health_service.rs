use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the installed store and report whether games can be served.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let storage_reachable = match state.require_game_store().await {
        Ok(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        Err(_) => {
            warn!("storage unavailable (degraded mode)");
            false
        }
    };

    HealthResponse::from_check(state.is_degraded().await, storage_reachable)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        auth::JwtVerifier, config::AppConfig, dao::game_store::memory::MemoryGameStore,
        state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default(), JwtVerifier::new(b"secret"));

        let before = health_status(&state).await;
        assert_eq!(before.status, "degraded");
        assert!(!before.storage_reachable);

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        let after = health_status(&state).await;
        assert_eq!(after.status, "ok");
        assert!(after.storage_reachable);
    }
}
