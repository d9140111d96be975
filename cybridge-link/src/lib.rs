//! cybridge link interface
//!
//! The crate defines what the transport core needs from a CAN controller driver: a raw
//! extended-ID frame type and a small non-blocking [`link::Link`] trait. Driver crates should
//! depend on this crate; applications should depend on `cybridge` instead.
//!
//! The core does not own an executor. A driver's interrupt handler only raises a
//! receive-pending flag; the node's mainloop then pulls frames through `Link::try_receive`
//! and pushes outgoing frames through `Link::try_send`, which reports hardware backpressure
//! as `SendStatus::Busy` instead of waiting.

#![no_std]

pub mod frame;
pub mod link;

pub mod time {
    pub use embassy_time::{Duration, Instant};
}
