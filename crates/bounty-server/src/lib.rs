pub mod config;
pub mod demo;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod persistence;
pub mod state;

pub use config::*;
pub use error::*;
pub use handlers::router;
pub use state::AppState;
