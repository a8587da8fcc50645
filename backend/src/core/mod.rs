//! Core simulation primitives

pub mod phase;
pub mod time;
