//! Domain data models

pub mod execution;
pub mod recipe;
pub mod zone;

pub use execution::*;
pub use recipe::*;
pub use zone::*;
