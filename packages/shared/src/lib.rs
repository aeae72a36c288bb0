//! Shared utilities for the Idobata chat application.
//!
//! Cross-cutting concerns used by both the server and external tooling:
//! time handling with a clock abstraction, and tracing setup.

pub mod logger;
pub mod time;
