//! HTTP front end for the onepolicy authentication backend.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as
//! a library so integration tests can build the router without a socket.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
