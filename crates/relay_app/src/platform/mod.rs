//! Process-level concerns of the relay binaries: configuration, logging,
//! file-backed page and input drivers, and task wiring.
pub mod app;
pub mod config;
pub mod logging;
pub mod mirror;
pub mod outbox;
