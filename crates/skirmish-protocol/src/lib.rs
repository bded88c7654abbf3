//! Line protocol for Skirmish.
//!
//! This crate defines the "language" clients and the server speak:
//!
//! - **Commands** ([`Command`]): what a client line means, parsed once
//!   into a tagged union so the router can match exhaustively.
//! - **Text** ([`text`]): every line the server sends back. Clients match
//!   on these strings, so they live in one place and never drift.
//!
//! # Architecture
//!
//! ```text
//! Transport (lines) → Protocol (Command / text) → Router (state)
//! ```
//!
//! The protocol layer knows nothing about players or locations beyond the
//! names it is handed; it only knows how lines look.

mod command;
pub mod text;

pub use command::{parse_nickname, Command};
