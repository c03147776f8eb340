//! CLI command definitions and handlers

pub mod config;
pub mod execution;
pub mod handlers;
