//! Web host: REST and WebSocket access to a shared wizard session.

pub mod routes;
pub mod ws;

pub use routes::{AppState, wizard_routes};
pub use ws::ClientAction;
