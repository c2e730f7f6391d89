//! Core engine: the repeated sweep, score, confirm and emit loop.

pub mod controller;
pub mod events;
