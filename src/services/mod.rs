//! Business logic services

pub mod auth;
pub mod session;

pub use auth::{AuthService, LoginError};
pub use session::{
    spawn_session_cleanup, MemorySessionStore, NewSession, SessionData, SessionError,
    SessionStore, SessionSummary,
};
