//! Serde helpers shared by the plan types.

pub mod duration_secs;
