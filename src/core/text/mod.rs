//! Text helpers (ANSI skipping, width calculations, wrapping).
//!
//! These helpers are pure (string in/string out) so widgets and the diagram engine can share
//! them without pulling in any widget state.

pub mod ansi;
pub mod width;
pub mod wrap;
