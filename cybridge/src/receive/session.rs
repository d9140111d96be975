use core::mem;

use crate::codec::{FrameFields, PAD_VALUE, SOT_TOGGLE_BIT, TransferCrc};
use crate::core::{DataSpecifier, NodeId, TransferId};
use crate::frame::{DataLength, Mtu};
use crate::heap::{Block, Heap};
use crate::receive::{RejectReason, RxStatistics, RxTransfer};
use crate::time::{Duration, Instant};
use crate::transfer::TransferMeta;

const CRC_LENGTH: usize = TransferCrc::LENGTH;
const TAIL_LENGTH: usize = 1;

/// Largest zero padding a sender may append after the payload
const MAX_PADDING: usize = 15;

/// Padding a frame of `frame_length` bytes can carry
///
/// A sender pads only up to the next valid data length, so the padding is shorter than the
/// gap to the previous valid length.
fn padding_allowance(frame_length: usize) -> usize {
    let previous = DataLength::new_floor(frame_length - 1).as_usize();
    frame_length - 1 - previous
}

/// Copies a single-frame payload into a fresh block
///
/// Zero padding beyond `extent` is dropped. Any other byte beyond it rejects the transfer.
pub(super) fn deliver_single<const U: usize>(
    heap: &mut Heap<U>,
    meta: TransferMeta,
    timestamp: Instant,
    payload: &[u8],
    extent: usize,
) -> Result<RxTransfer, RejectReason> {
    let length = if payload.len() > extent {
        let excess = &payload[extent..];
        if excess.len() > padding_allowance(payload.len() + TAIL_LENGTH)
            || excess.iter().any(|&byte| byte != PAD_VALUE)
        {
            return Err(RejectReason::ExtentExceeded);
        }
        extent
    } else {
        payload.len()
    };

    let block = heap
        .allocate(length)
        .map_err(|_| RejectReason::OutOfMemory)?;
    heap.bytes_mut(&block).copy_from_slice(&payload[..length]);
    Ok(RxTransfer {
        meta,
        timestamp,
        block,
        length,
    })
}

pub(super) enum Progress {
    Incomplete,
    Delivered(RxTransfer),
}

enum Step {
    More,
    Done(usize),
    /// Drop the frame and keep the record
    Ignore(RejectReason),
    /// Drop the frame and the record
    Abort(RejectReason),
}

struct Accumulation {
    meta: TransferMeta,
    timestamp: Instant,
    block: Block,
    length: usize,
    crc: TransferCrc,
    toggle: bool,
}

impl Accumulation {
    fn push<const U: usize>(
        &mut self,
        heap: &mut Heap<U>,
        fields: &FrameFields<'_>,
        extent: usize,
    ) -> Step {
        if fields.toggle != self.toggle {
            return Step::Ignore(RejectReason::Duplicate);
        }

        let frame_length = fields.payload.len() + TAIL_LENGTH;
        let limit = if fields.eot {
            extent + CRC_LENGTH + padding_allowance(frame_length)
        } else {
            if Mtu::try_from(frame_length).is_err() {
                return Step::Abort(RejectReason::Malformed);
            }
            extent + CRC_LENGTH
        };
        let end = self.length + fields.payload.len();
        if end > limit {
            return Step::Abort(RejectReason::ExtentExceeded);
        }

        heap.bytes_mut(&self.block)[self.length..end].copy_from_slice(fields.payload);
        self.crc.add_bytes(fields.payload);
        self.length = end;
        self.toggle = !self.toggle;

        if !fields.eot {
            return Step::More;
        }
        if self.length < CRC_LENGTH || !self.crc.is_residue_zero() {
            return Step::Abort(RejectReason::Integrity);
        }

        let payload_length = self.length - CRC_LENGTH;
        if payload_length <= extent {
            return Step::Done(payload_length);
        }
        let excess = &heap.bytes(&self.block)[extent..payload_length];
        if excess.iter().all(|&byte| byte == PAD_VALUE) {
            Step::Done(extent)
        } else {
            Step::Abort(RejectReason::ExtentExceeded)
        }
    }
}

enum State {
    Idle,
    Accumulating(Accumulation),
    Completed(TransferId),
}

impl State {
    fn transfer_id(&self) -> Option<TransferId> {
        match self {
            State::Idle => None,
            State::Accumulating(accumulation) => Some(accumulation.meta.transfer_id),
            State::Completed(transfer_id) => Some(*transfer_id),
        }
    }
}

/// Reassembly state for one (data specifier, source) pair
///
/// A completed record stays around without payload memory, so that repeated frames of the
/// delivered transfer are recognized until the transfer-id timeout.
pub(super) struct Session {
    data_spec: DataSpecifier,
    source: NodeId,
    timeout: Duration,
    last_frame_at: Instant,
    state: State,
}

impl Session {
    pub fn new(data_spec: DataSpecifier, source: NodeId, timeout: Duration, now: Instant) -> Self {
        Self {
            data_spec,
            source,
            timeout,
            last_frame_at: now,
            state: State::Idle,
        }
    }

    pub fn matches(&self, data_spec: DataSpecifier, source: NodeId) -> bool {
        self.data_spec == data_spec && self.source == source
    }

    pub fn data_spec(&self) -> DataSpecifier {
        self.data_spec
    }

    pub fn last_frame_at(&self) -> Instant {
        self.last_frame_at
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, State::Accumulating(_))
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_frame_at) > self.timeout
    }

    /// Returns the payload memory, if any
    pub fn release<const U: usize>(self, heap: &mut Heap<U>) {
        if let State::Accumulating(accumulation) = self.state {
            heap.deallocate(accumulation.block);
        }
    }

    fn reset<const U: usize>(&mut self, heap: &mut Heap<U>) -> bool {
        match mem::replace(&mut self.state, State::Idle) {
            State::Accumulating(accumulation) => {
                heap.deallocate(accumulation.block);
                true
            }
            _ => false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update<const U: usize>(
        &mut self,
        heap: &mut Heap<U>,
        statistics: &mut RxStatistics,
        fields: &FrameFields<'_>,
        now: Instant,
        timestamp: Instant,
        extent: usize,
        timeout: Duration,
    ) -> Result<Progress, RejectReason> {
        self.timeout = timeout;
        if self.is_stale(now) && self.reset(heap) {
            statistics.expired += 1;
        }

        let transfer_id = fields.transfer_id;
        match self.state.transfer_id() {
            None => {}
            Some(current) if current == transfer_id => match self.state {
                State::Accumulating(_) if !fields.sot => {}
                _ => return Err(RejectReason::Duplicate),
            },
            Some(current) if current.precedes(transfer_id) => {
                if self.reset(heap) {
                    statistics.abandoned = statistics.abandoned.saturating_add(1);
                }
            }
            Some(_) => return Err(RejectReason::Duplicate),
        }

        if let State::Idle = self.state {
            if !fields.sot {
                return Err(RejectReason::OutOfSequence);
            }
            self.last_frame_at = now;
            return self.start(heap, fields, timestamp, extent);
        }
        self.last_frame_at = now;
        self.resume(heap, fields, extent)
    }

    fn start<const U: usize>(
        &mut self,
        heap: &mut Heap<U>,
        fields: &FrameFields<'_>,
        timestamp: Instant,
        extent: usize,
    ) -> Result<Progress, RejectReason> {
        let meta = TransferMeta::from_header(&fields.header, fields.transfer_id);
        if fields.is_single_frame() {
            let transfer = deliver_single(heap, meta, timestamp, fields.payload, extent)?;
            self.state = State::Completed(fields.transfer_id);
            return Ok(Progress::Delivered(transfer));
        }

        let block = heap
            .allocate(extent + CRC_LENGTH + MAX_PADDING)
            .map_err(|_| RejectReason::OutOfMemory)?;
        self.state = State::Accumulating(Accumulation {
            meta,
            timestamp,
            block,
            length: 0,
            crc: TransferCrc::default(),
            toggle: SOT_TOGGLE_BIT,
        });
        self.resume(heap, fields, extent)
    }

    fn resume<const U: usize>(
        &mut self,
        heap: &mut Heap<U>,
        fields: &FrameFields<'_>,
        extent: usize,
    ) -> Result<Progress, RejectReason> {
        let step = match &mut self.state {
            State::Accumulating(accumulation) => accumulation.push(heap, fields, extent),
            _ => Step::Ignore(RejectReason::OutOfSequence),
        };
        match step {
            Step::More => Ok(Progress::Incomplete),
            Step::Ignore(reason) => Err(reason),
            Step::Abort(reason) => {
                self.reset(heap);
                Err(reason)
            }
            Step::Done(length) => {
                let completed = State::Completed(fields.transfer_id);
                let accumulation = match mem::replace(&mut self.state, completed) {
                    State::Accumulating(accumulation) => Some(accumulation),
                    _ => None,
                };
                let Accumulation {
                    meta,
                    timestamp,
                    block,
                    ..
                } = unwrap!(accumulation);
                Ok(Progress::Delivered(RxTransfer {
                    meta,
                    timestamp,
                    block,
                    length,
                }))
            }
        }
    }
}
