pub mod auth;
pub mod config;
pub mod error;
pub mod fabric;
pub mod handlers;
pub mod models;
pub mod persistence;
pub mod registry;
pub mod state;

pub use handlers::router as create_router;
pub use state::AppState;
