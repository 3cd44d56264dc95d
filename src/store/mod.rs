//! Persisted local settings.

pub mod file;
