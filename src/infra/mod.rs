//! The infrastructure module.
//!
//! Contains common modules that help with non-functional requirements.

pub mod config;
pub mod error;
pub mod logging;
pub(crate) mod middleware;
