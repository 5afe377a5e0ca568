//! vmsearch-typesense
//!
//! `SearchBackend` over the engine's REST protocol. See `client` for the
//! endpoint mapping.

pub mod client;

pub use client::TypesenseClient;
