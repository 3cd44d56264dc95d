//! Local usage accounting.

pub mod usage;
