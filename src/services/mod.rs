/// OpenAPI documentation generation.
pub mod documentation;
/// Game scheduling and the join/cancel roster workflow.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Background supervision of the storage connection.
pub mod storage_supervisor;
