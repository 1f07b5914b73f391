pub mod entry;
pub mod memory;
pub mod traits;

pub use entry::*;
pub use memory::*;
pub use traits::*;
