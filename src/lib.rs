//! Propwire library.
//!
//! Binds device attributes and functions to numeric endpoint ids and
//! serves them over a CAN bus: each request frame is resolved, checked,
//! and answered with at most one response frame.

#![deny(unused_must_use)]

pub mod config;
pub mod error;
pub mod rpc;

pub use config::BusConfig;
pub use error::{Error, ErrorKind, RegistryError, Result};
