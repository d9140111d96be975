//! Outgoing frame queue
//!
//! Transfers are split into frames on push and stored inline in the queue slots. Frames
//! leave the queue in priority order, then by deadline, then in insertion order. A frame
//! past its deadline is dropped instead of being sent late.

use crate::codec::{encode_can_id, frame_from_fragment};
use crate::core::Priority;
use crate::frame::{Frame, Mtu};
use crate::link::SendStatus;
use crate::time::Instant;
use crate::transfer::TransferMeta;
use crate::utils::DeadlineQueue;

mod scatter;

pub use scatter::{Scatter, frame_count};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushError {
    /// Not enough free slots right now; nothing was queued
    QueueFull,
    /// The transfer needs more frames than the queue can ever hold
    TooLarge,
    AnonymousMultiFrame,
    /// Metadata does not describe a valid transfer kind
    InvalidMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxStatistics {
    pub accepted_transfers: u32,
    pub sent: u32,
    pub expired: u32,
    pub failed: u32,
    /// Rejected pushes
    pub rejected: u32,
}

/// Outcome of a single [`TxQueue::service`] pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceReport {
    pub sent: usize,
    pub expired: usize,
    pub failed: usize,
    /// The link reported backpressure before the queue was drained
    pub blocked: bool,
}

pub struct TxQueue<const N: usize> {
    mtu: Mtu,
    queue: DeadlineQueue<Instant, Frame, N>,
    statistics: TxStatistics,
}

impl<const N: usize> TxQueue<N> {
    pub fn new(mtu: Mtu) -> Self {
        Self {
            mtu,
            queue: DeadlineQueue::new(),
            statistics: Default::default(),
        }
    }

    pub fn mtu(&self) -> Mtu {
        self.mtu
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn statistics(&self) -> TxStatistics {
        self.statistics
    }

    /// Next frame to be offered to the link
    pub fn peek(&self) -> Option<&Frame> {
        self.queue.peek().map(|(_, _, frame)| frame)
    }

    /// Queues all frames of a transfer, or none of them
    ///
    /// Returns the number of frames queued. The frame timestamps hold `deadline`.
    pub fn push(
        &mut self,
        meta: &TransferMeta,
        payload: &[u8],
        deadline: Instant,
    ) -> Result<usize, PushError> {
        let result = self.try_push(meta, payload, deadline);
        match result {
            Ok(_) => self.statistics.accepted_transfers += 1,
            Err(err) => {
                self.statistics.rejected += 1;
                debug!("tx: push rejected: {:?}", err);
            }
        }
        result
    }

    fn try_push(
        &mut self,
        meta: &TransferMeta,
        payload: &[u8],
        deadline: Instant,
    ) -> Result<usize, PushError> {
        let header = meta.header();
        encode_can_id(&header).map_err(|_| PushError::InvalidMetadata)?;

        let count = frame_count(payload.len(), self.mtu);
        if count > 1 && header.source.is_none() {
            return Err(PushError::AnonymousMultiFrame);
        }
        if count > N {
            return Err(PushError::TooLarge);
        }
        if count > self.queue.free_count() {
            return Err(PushError::QueueFull);
        }

        for data in Scatter::new(meta.transfer_id, payload, self.mtu) {
            let frame = unwrap!(frame_from_fragment(&header, data, deadline, self.mtu));
            unwrap!(self.queue.push(meta.priority, deadline, frame).ok());
        }
        Ok(count)
    }

    /// Offers ready frames to `send` until the queue is empty or the link pushes back
    ///
    /// Expired frames met on the way are dropped without being offered.
    pub fn service(
        &mut self,
        now: Instant,
        mut send: impl FnMut(&Frame) -> SendStatus,
    ) -> ServiceReport {
        let mut report = ServiceReport::default();
        while let Some((priority, &deadline, frame)) = self.queue.peek() {
            if deadline < now {
                trace!("tx: frame {:x} expired", frame.id);
                self.drop_expired(priority);
                report.expired += 1;
                continue;
            }
            match send(frame) {
                SendStatus::Sent => {
                    self.queue.pop_level(priority);
                    self.statistics.sent += 1;
                    report.sent += 1;
                }
                SendStatus::Busy => {
                    report.blocked = true;
                    break;
                }
                SendStatus::Failed => {
                    warn!("tx: link rejected frame {:x}", frame.id);
                    self.queue.pop_level(priority);
                    self.statistics.failed += 1;
                    report.failed += 1;
                }
            }
        }
        if report.expired > 0 {
            debug!("tx: dropped {} expired frames", report.expired);
        }
        report
    }

    /// Drops every expired frame without touching the link
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut count = 0;
        for priority in self.queue.priorities() {
            while matches!(self.queue.peek_level(priority), Some((&deadline, _)) if deadline < now)
            {
                self.drop_expired(priority);
                count += 1;
            }
        }
        count
    }

    fn drop_expired(&mut self, priority: Priority) {
        self.queue.pop_level(priority);
        self.statistics.expired += 1;
    }
}
