//! Text codecs for the savegame's compact encodings.
//!
//! RULE: codecs are pure. They never touch the world and only read or
//! write the section file paths they are given.

pub mod attrs;
pub mod hex;
pub mod orders;
pub mod quote;
pub mod row;
