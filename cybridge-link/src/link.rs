//! Non-blocking boundary between a CAN controller driver and the transport core

use crate::frame::Frame;

/// Outcome of offering a frame to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendStatus {
    /// The controller accepted the frame.
    Sent,
    /// The hardware transmit queue is full. Offer the frame again later.
    Busy,
    /// The controller rejected the frame. It will not be retried.
    Failed,
}

/// A CAN or CAN-FD controller as seen by the transport core
///
/// None of the methods may block. Register access, SPI transactions and FIFO management stay
/// behind this trait.
///
/// Frames returned by `try_receive` should carry their reception time in `timestamp`.
/// Frames passed to `try_send` carry their transmission deadline there; a driver with a
/// deep hardware queue may use it to drop frames that missed it.
pub trait Link {
    /// Offers a single frame for transmission.
    fn try_send(&mut self, frame: &Frame) -> SendStatus;

    /// Returns true if at least one received frame is waiting.
    fn rx_ready(&mut self) -> bool;

    /// Takes the oldest received frame, if any.
    fn try_receive(&mut self) -> Option<Frame>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn try_send(&mut self, frame: &Frame) -> SendStatus {
        (**self).try_send(frame)
    }

    fn rx_ready(&mut self) -> bool {
        (**self).rx_ready()
    }

    fn try_receive(&mut self) -> Option<Frame> {
        (**self).try_receive()
    }
}
