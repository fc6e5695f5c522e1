//! Integration tests for the CampaignHub API
//!
//! These tests drive the full router, so every request crosses the real
//! origin, authentication, and guard middleware.

mod guard_tests;
mod origin_tests;
mod session_admin_tests;
