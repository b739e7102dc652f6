//! Replay REST API
//!
//! Exposes replay console sessions over HTTP so a browser console can drive
//! them: create a session, start a run, then post one line of input whenever
//! the session reports `waiting`.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppState, SharedBackend};
