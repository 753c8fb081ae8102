pub mod catalog;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod recipes;
pub mod relations;
pub mod routes;
pub mod shopping;
pub mod state;

pub use routes::router;
pub use state::{AppState, AppStateInner};
