//! Wire types for trail interaction sessions.
//!
//! This crate contains the serde-serializable shapes shared between the
//! capture core, the persisted key-value layout, the command channel and the
//! exported session documents. These types represent the "protocol layer":
//! the shapes of data as they appear in storage and on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Tagged: Every action is a variant with explicit typed fields
//! * Stable: Changes only when the persisted or exported layout changes
//!
//! Capture, persistence and the session state machine live in `trail-rs`.

pub mod action;
pub mod command;
pub mod export;
pub mod keys;
pub mod session;

pub use action::*;
pub use command::*;
pub use export::*;
pub use session::*;
