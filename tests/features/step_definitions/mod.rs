//! Step definitions for all features

pub mod common_steps;
pub mod session_steps;
