//! (De)serializable Rust representations of the Cyphal data types the stack uses itself
//!
//! Application types should come from a DSDL code generator that implements the
//! `cybridge_encoding` traits.

mod byte_array;
mod heartbeat;

pub use byte_array::ByteArray;
pub use heartbeat::{Health, Heartbeat, Mode};
