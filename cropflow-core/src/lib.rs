//! # Cropflow Core Library
//!
//! Core logic for driving a growing zone through the ordered stages of a crop
//! recipe: stage-duration tracking, human approval of stage transitions,
//! equipment configuration per stage, and the periodic sweep that watches all
//! live executions.

pub mod clock;
pub mod execution;
pub mod models;
pub mod services;
