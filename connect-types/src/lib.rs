//! # connect-types
//!
//! Shared types for the QS Connect pairing relay.
//!
//! - [`DeviceId`], [`RoomId`], [`EntryId`] - Identity types
//! - [`IdGenerator`] - Source of short random tokens
//! - [`Entry`], [`EntryBody`] - Items relayed inside a room
//! - [`api`] - JSON payloads of the HTTP surface

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
mod entry;
mod ids;

pub use entry::{Entry, EntryBody};
pub use ids::{DeviceId, EntryId, IdGenerator, RoomId, SequentialIdGenerator, UuidIdGenerator};
