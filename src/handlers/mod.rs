// handlers/mod.rs - HTTP handlers by security tier
//
// Public (no session) → Protected (session cookie or Bearer token)
pub mod protected; // Session required (/api/auth/whoami, POST /api/motif-tags/*)
pub mod public;    // Everything else
