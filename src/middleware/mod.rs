pub mod auth;

pub use auth::{require_session, session_from_headers, SessionUser};
