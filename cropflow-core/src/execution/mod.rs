//! Recipe execution module

pub mod adapters;
pub mod error;
pub mod service;
pub mod stage_config;
pub mod store;
pub mod sweep;

pub use adapters::*;
pub use error::*;
pub use service::*;
pub use stage_config::*;
pub use store::*;
pub use sweep::*;
