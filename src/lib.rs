//! Stash client library
//!
//! Codec, session handling, and transfer engine for a fixed binary backup
//! protocol carried over TCP

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod listing;
pub mod log;
pub mod logger;
pub mod protocol;
pub mod session;
pub mod transfer;
