//! Incoming transfer reassembly
//!
//! Frames are matched to sessions keyed by data specifier and source node. A session
//! accumulates one transfer at a time into a heap block sized for the subscription extent,
//! so memory use is fixed when the first frame arrives and never grows afterwards.

use crate::codec::fields_from_frame;
use crate::core::{DataSpecifier, NodeId};
use crate::frame::Frame;
use crate::heap::{Block, Heap};
use crate::registry::Registry;
use crate::time::{Duration, Instant};
use crate::transfer::TransferMeta;

mod session;

use session::{Progress, Session};

/// Why a frame did not contribute to a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RejectReason {
    /// Not a valid Cyphal/CAN frame
    Malformed,
    /// Service transfer for another node
    NotAddressed,
    NotSubscribed,
    /// Repeated frame or transfer
    Duplicate,
    /// Continuation frame without a started transfer
    OutOfSequence,
    ExtentExceeded,
    /// Transfer CRC mismatch
    Integrity,
    /// Heap exhausted or session table full
    OutOfMemory,
}

pub enum Accepted {
    Delivered(RxTransfer),
    Incomplete,
    Rejected(RejectReason),
}

/// Reassembled transfer holding its payload block
///
/// The block must be handed back with [`RxTransfer::release`].
#[derive(Debug)]
#[must_use]
pub struct RxTransfer {
    meta: TransferMeta,
    timestamp: Instant,
    block: Block,
    length: usize,
}

impl RxTransfer {
    pub fn meta(&self) -> &TransferMeta {
        &self.meta
    }

    /// Reception time of the first frame
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn payload<'h, const U: usize>(&self, heap: &'h Heap<U>) -> &'h [u8] {
        &heap.bytes(&self.block)[..self.length]
    }

    pub fn release<const U: usize>(self, heap: &mut Heap<U>) {
        heap.deallocate(self.block);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStatistics {
    pub frames: u32,
    pub delivered: u32,
    /// Partial transfers dropped by the transfer-id timeout
    pub expired: u32,
    /// Partial transfers superseded by a newer transfer id
    pub abandoned: u32,
    pub malformed: u32,
    pub not_addressed: u32,
    pub not_subscribed: u32,
    pub duplicate: u32,
    pub out_of_sequence: u32,
    pub extent_exceeded: u32,
    pub integrity: u32,
    pub out_of_memory: u32,
}

impl RxStatistics {
    fn count_rejected(&mut self, reason: RejectReason) {
        let counter = match reason {
            RejectReason::Malformed => &mut self.malformed,
            RejectReason::NotAddressed => &mut self.not_addressed,
            RejectReason::NotSubscribed => &mut self.not_subscribed,
            RejectReason::Duplicate => &mut self.duplicate,
            RejectReason::OutOfSequence => &mut self.out_of_sequence,
            RejectReason::ExtentExceeded => &mut self.extent_exceeded,
            RejectReason::Integrity => &mut self.integrity,
            RejectReason::OutOfMemory => &mut self.out_of_memory,
        };
        *counter = counter.saturating_add(1);
    }
}

pub struct Reassembler<const S: usize> {
    sessions: heapless::Vec<Session, S>,
    statistics: RxStatistics,
}

impl<const S: usize> Reassembler<S> {
    pub const fn new() -> Self {
        Self {
            sessions: heapless::Vec::new(),
            statistics: RxStatistics {
                frames: 0,
                delivered: 0,
                expired: 0,
                abandoned: 0,
                malformed: 0,
                not_addressed: 0,
                not_subscribed: 0,
                duplicate: 0,
                out_of_sequence: 0,
                extent_exceeded: 0,
                integrity: 0,
                out_of_memory: 0,
            },
        }
    }

    pub fn statistics(&self) -> RxStatistics {
        self.statistics
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Feeds a received frame
    ///
    /// `local` is the node id service transfers must be addressed to.
    pub fn accept<const U: usize>(
        &mut self,
        heap: &mut Heap<U>,
        registry: &Registry<'_>,
        local: Option<NodeId>,
        now: Instant,
        frame: &Frame,
    ) -> Accepted {
        self.statistics.frames = self.statistics.frames.saturating_add(1);
        match self.process(heap, registry, local, now, frame) {
            Ok(Progress::Delivered(transfer)) => {
                self.statistics.delivered = self.statistics.delivered.saturating_add(1);
                Accepted::Delivered(transfer)
            }
            Ok(Progress::Incomplete) => Accepted::Incomplete,
            Err(reason) => {
                self.statistics.count_rejected(reason);
                match reason {
                    RejectReason::OutOfMemory => {
                        warn!("rx: no memory for frame {:x}", frame.id)
                    }
                    _ => trace!("rx: frame {:x} rejected: {:?}", frame.id, reason),
                }
                Accepted::Rejected(reason)
            }
        }
    }

    fn process<const U: usize>(
        &mut self,
        heap: &mut Heap<U>,
        registry: &Registry<'_>,
        local: Option<NodeId>,
        now: Instant,
        frame: &Frame,
    ) -> Result<Progress, RejectReason> {
        let fields = fields_from_frame(frame).map_err(|_| RejectReason::Malformed)?;
        let header = &fields.header;
        if header.destination.is_some() && header.destination != local {
            return Err(RejectReason::NotAddressed);
        }
        let subscription = registry
            .lookup(header.data_spec)
            .ok_or(RejectReason::NotSubscribed)?;
        let extent = subscription.extent();

        let Some(source) = header.source else {
            let meta = TransferMeta::from_header(header, fields.transfer_id);
            let transfer =
                session::deliver_single(heap, meta, frame.timestamp, fields.payload, extent)?;
            return Ok(Progress::Delivered(transfer));
        };

        let timeout = subscription.timeout();
        let index = self.session_index(heap, header.data_spec, source, fields.sot, timeout, now)?;
        self.sessions[index].update(
            heap,
            &mut self.statistics,
            &fields,
            now,
            frame.timestamp,
            extent,
            timeout,
        )
    }

    fn session_index<const U: usize>(
        &mut self,
        heap: &mut Heap<U>,
        data_spec: DataSpecifier,
        source: NodeId,
        sot: bool,
        timeout: Duration,
        now: Instant,
    ) -> Result<usize, RejectReason> {
        if let Some(index) = self
            .sessions
            .iter()
            .position(|session| session.matches(data_spec, source))
        {
            return Ok(index);
        }
        if !sot {
            return Err(RejectReason::OutOfSequence);
        }

        if self.sessions.is_full() {
            // Reuse the oldest record that holds no payload
            let victim = self
                .sessions
                .iter()
                .enumerate()
                .filter(|(_, session)| !session.is_accumulating())
                .min_by_key(|(_, session)| session.last_frame_at())
                .map(|(index, _)| index)
                .ok_or(RejectReason::OutOfMemory)?;
            self.sessions.swap_remove(victim).release(heap);
        }

        let session = Session::new(data_spec, source, timeout, now);
        unwrap!(self.sessions.push(session).ok());
        Ok(self.sessions.len() - 1)
    }

    /// Drops records whose last frame is older than their transfer-id timeout
    ///
    /// Returns the number of partial transfers discarded.
    pub fn expire<const U: usize>(&mut self, heap: &mut Heap<U>, now: Instant) -> usize {
        let mut expired = 0;
        let mut index = 0;
        while index < self.sessions.len() {
            if self.sessions[index].is_stale(now) {
                let session = self.sessions.swap_remove(index);
                if session.is_accumulating() {
                    expired += 1;
                }
                session.release(heap);
            } else {
                index += 1;
            }
        }
        if expired > 0 {
            self.statistics.expired = self.statistics.expired.saturating_add(expired as u32);
            debug!("rx: {} partial transfers timed out", expired);
        }
        expired
    }

    /// Drops every record of a data specifier
    pub fn purge<const U: usize>(&mut self, heap: &mut Heap<U>, data_spec: DataSpecifier) {
        let mut index = 0;
        while index < self.sessions.len() {
            if self.sessions[index].data_spec() == data_spec {
                self.sessions.swap_remove(index).release(heap);
            } else {
                index += 1;
            }
        }
    }
}

impl<const S: usize> Default for Reassembler<S> {
    fn default() -> Self {
        Self::new()
    }
}
