//! Real-time messaging coordinator for Idobata.
//!
//! Maps authenticated users to live WebSocket connections, tracks
//! presence, manages room/conversation membership, and fans out chat
//! messages, typing signals and read receipts to exactly the right set
//! of connections with per-destination ordering.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
