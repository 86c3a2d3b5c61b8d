//! Core interfaces and text helpers.

pub mod component;
pub mod text;
