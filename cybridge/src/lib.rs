//! # Cybridge
//!
//! This library bridges a frame-oriented CAN/CAN-FD link and the transfer-oriented
//! Cyphal/CAN protocol \[1\] on `no_std` microcontrollers. All memory is sized at compile
//! time: payloads live in a fixed arena, frames in a fixed queue, and reassembly state in a
//! fixed session table. Nothing grows after construction.
//!
//! ## Architecture
//!
//! ```text
//!   CAN IRQ ──raise──► RxSignal
//!                         │ take
//!                         ▼
//! ┌──────┐ frames  ┌─────────────┐ transfers ┌──────────┐ on_transfer ┌─────────┐
//! │ Link ├────────►│ Reassembler ├──────────►│ Registry ├────────────►│ Handler │
//! └──────┘         └──────┬──────┘           └──────────┘             └─────────┘
//!     ▲                   │ blocks
//!     │                   ▼
//!     │               ┌──────┐
//!     │               │ Heap │
//!     │               └──────┘
//!     │ frames     ┌─────────┐  transfers  ┌───────────┐
//!     └────────────┤ TxQueue │◄────────────┤ Publisher │ (heartbeat, application)
//!                  └─────────┘             └───────────┘
//! ```
//! Components:
//! * _Node_ owns all the state below and drives it from [`node::Node::poll`], a
//!   single-threaded cooperative mainloop step.
//! * _Link_ is the non-blocking frame channel a CAN peripheral driver implements.
//! * _RxSignal_ is the only object shared with interrupt context. The receive interrupt
//!   raises it; the mainloop clears it before draining the link.
//! * _Reassembler_ turns frames into transfers, one session per (port, source node),
//!   checking toggle bits, transfer ids, extents and the transfer CRC.
//! * _Heap_ is a bounded O(1) allocator for reassembly payloads.
//! * _Registry_ maps ports to user-owned subscriptions and dispatches completed transfers
//!   to their handlers.
//! * _TxQueue_ splits outgoing transfers into frames and hands them to the link by
//!   priority and deadline, dropping frames that missed their deadline.
//! * _Publisher_ tracks the transfer id sequence of one subject.
//!
//! ## Concurrency model
//!
//! Everything except [`signal::RxSignal`] is confined to the mainloop. Handlers run
//! synchronously inside [`node::Node::poll`] and must not block. The signal mutex type is
//! a parameter: _CriticalSectionRawMutex_ when the interrupt raises it, _NoopRawMutex_ when
//! the link is polled without interrupts.
//!
//! ## Cyphal data types
//!
//! Payloads are (de)serialized with `canadensis_encoding` through the `cybridge_encoding`
//! re-export. The stack implements only the types it uses itself, see [`data_types`].
//!
//! ## Limitations
//!
//! * Redundant transports are not supported.
//! * Anonymous nodes publish single-frame messages only.
//!
//! # References:
//!
//! * \[1\] Cyphal Specification v1.0
//!   <https://opencyphal.org/specification/Cyphal_Specification.pdf>
#![no_std]

pub use cybridge_core as core;
pub use cybridge_link::{frame, link, time};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod codec;
pub mod config;
pub mod data_types;
pub mod heap;
pub mod monitor;
pub mod node;
pub mod publisher;
pub mod receive;
pub mod registry;
pub mod signal;
pub mod transfer;
pub mod transmit;
#[allow(dead_code)]
mod utils;
