pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod imaging;
pub mod layout;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod services;
pub mod sitemap;
pub mod state;
pub mod tagging;
pub mod types;

pub use routes::app;
pub use state::AppState;
