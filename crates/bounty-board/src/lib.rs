pub mod board;
pub mod operation;
pub mod store;

pub use board::*;
pub use operation::*;
pub use store::*;
