pub mod error;
pub mod event;
pub mod principal;
pub mod rating;
pub mod rules;
pub mod task;

pub use error::*;
pub use event::*;
pub use principal::*;
pub use rating::*;
pub use rules::*;
pub use task::*;
