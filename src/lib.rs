#![doc = include_str!("../README.md")]
#![deny(missing_debug_implementations)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod proto;

pub mod blocking;
#[cfg(feature = "async")]
pub mod client;
#[cfg(feature = "codec")]
pub mod codec;
pub mod config;
pub mod error;
mod exchange;
pub mod frame;
pub mod transport;

// re-export dependencies that are used in the public API of our crate
pub use service_binding;
pub use ssh_encoding;
pub use ssh_key;
