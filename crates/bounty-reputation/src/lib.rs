pub mod engine;
pub mod score;

pub use engine::*;
pub use score::*;
