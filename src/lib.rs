pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use api::router as app;
pub use state::AppState;
