//! ragrelay server crate: shared state, routing, and the relay handlers.
//!
//! The binary in `main.rs` wires CLI/env configuration into
//! [`server::router`]; integration tests build the same router against mock
//! upstreams.

pub mod relay;
pub mod routes;
pub mod server;
