//! Core data structures shared by every phase of the Cool compiler.
//!
//! Two pieces:
//! - `interner` - string interning (`Symbol`, `Interner`). Class names,
//!   identifiers, and literal tokens are interned once during parsing and
//!   compared as integers everywhere else.
//! - `names` - the table of pre-interned well-known symbols (basic class
//!   names, `SELF_TYPE`, `self`, runtime feature names).

mod interner;
mod names;


pub use interner::{Interner, Symbol};
pub use names::Names;
