// handlers/protected/mod.rs - Protected handlers (session required)
//
// Every route here sits behind `require_session`, which validates the
// session token and injects a `SessionUser` into the request extensions.
//
// Route Prefix: /api/*

pub mod auth;
pub mod motif_tags;
