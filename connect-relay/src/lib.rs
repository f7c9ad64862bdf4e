//! # connect-relay
//!
//! In-memory pairing relay for QS Connect.
//!
//! Devices register under a self-chosen identifier, are placed in a room,
//! and exchange text snippets and files by pushing entries into the room and
//! polling its history. Several devices can be bridged into one room, which
//! merges the histories of the rooms involved.
//!
//! ## Architecture
//!
//! ```text
//! Device A ──┐    HTTP (axum)     ┌── Device B
//!            ├───────────────────►│
//!        ┌───┴────────────────────┴───┐
//!        │        ConnectRelay        │
//!        │  Registry   device → room  │
//!        │  RoomLogs   room → [Entry] │
//!        └─────────────┬──────────────┘
//!                      │ storage refs
//!               ┌──────┴──────┐
//!               │  BlobStore  │  uploaded files
//!               └─────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `GET /api/init/:node_id` → room id
//! - `POST /api/push` → append text or file entry
//! - `GET /api/poll/:node_id` → full room history
//! - `GET /api/participants/:node_id` → devices in the room
//! - `POST /api/bridge` → link devices into one room
//! - `GET /download/:reference` → uploaded file

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod rooms;
pub mod server;
pub mod storage;
