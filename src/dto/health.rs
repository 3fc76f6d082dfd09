use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when games can be read and written, "degraded" otherwise.
    pub status: String,
    /// Result of the last storage ping performed for this request.
    pub storage_reachable: bool,
}

impl HealthResponse {
    pub fn from_check(degraded: bool, storage_reachable: bool) -> Self {
        let status = if degraded || !storage_reachable {
            "degraded"
        } else {
            "ok"
        };
        Self {
            status: status.to_string(),
            storage_reachable,
        }
    }
}
