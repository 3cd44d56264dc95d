//! Wire types for the translator service.

pub mod models;
