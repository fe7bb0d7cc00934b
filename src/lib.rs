//! Grindstone: a real-time coaching daemon for competitive programming
//! practice.
//!
//! An editor plugin streams code/thoughts snapshots over a WebSocket. For
//! each snapshot the daemon resolves the problem statement (rendering it
//! through a browserless sidecar on first use), asks the model for
//! structured feedback at most once per minute per problem, and records the
//! history. A consolidated summary of a problem's feedback history is
//! served over HTTP.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod problem;
pub mod server;
pub mod session;
pub mod statement;
pub mod summary;
