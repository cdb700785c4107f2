pub mod app;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod locale;
pub mod models;
pub mod stats;
pub mod storage;
pub mod ui;
pub mod state;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::Store;
