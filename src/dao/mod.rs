/// Game document stores (in-memory, MongoDB, CouchDB).
pub mod game_store;
/// Persisted game and participant models.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
