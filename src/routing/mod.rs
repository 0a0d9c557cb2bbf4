//! Action routing subsystem.
//!
//! # Data Flow
//! ```text
//! /api/{action}      → table::is_sync decides sync vs async leg
//! /api/{action}      → table::callback_of names the response template
//! /webhook/{cb}      → table::forward_of recovers the slot's action
//! ```
//!
//! # Design Decisions
//! - Immutable after compilation (thread-safe without locks)
//! - The forward↔callback pairing is a table, not suffix arithmetic
//! - Explicit `None` for unknown names rather than a guessed default

pub mod table;

pub use table::{callback_of, forward_of, is_sync};
