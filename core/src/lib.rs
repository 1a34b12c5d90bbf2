//! Dependency-aware parallel task scheduler.
//!
//! See [`executor`] for the pipeline and [`api`] for the stable import
//! surface.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
