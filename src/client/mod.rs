//! HTTP transport and typed API client.

pub mod http;
