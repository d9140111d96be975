use core::cmp::min;

use crate::codec::{PAD_VALUE, SOT_TOGGLE_BIT, TailByte, TransferCrc};
use crate::core::TransferId;
use crate::frame::{Data, DataLength, Mtu};

const CRC_LENGTH: usize = TransferCrc::LENGTH;
const TAIL_LENGTH: usize = 1;

/// Number of frames a payload occupies at the given MTU
pub fn frame_count(payload_length: usize, mtu: Mtu) -> usize {
    let capacity = usize::from(mtu) - TAIL_LENGTH;
    if payload_length <= capacity {
        1
    } else {
        (payload_length + CRC_LENGTH).div_ceil(capacity)
    }
}

/// Splits a transfer payload into frame data with tail bytes
///
/// Multi-frame transfers carry the payload followed by its CRC. When the last frame needs a
/// longer DLC than its content, zero padding goes between the payload and the CRC and is
/// covered by it.
pub struct Scatter<'p> {
    payload: &'p [u8],
    capacity: usize,
    transfer_id: TransferId,
    toggle: bool,
    offset: usize,
    crc: TransferCrc,
    done: bool,
}

impl<'p> Scatter<'p> {
    pub fn new(transfer_id: TransferId, payload: &'p [u8], mtu: Mtu) -> Self {
        let capacity = usize::from(mtu) - TAIL_LENGTH;
        let crc = if payload.len() > capacity {
            TransferCrc::of(payload)
        } else {
            TransferCrc::default()
        };
        Self {
            payload,
            capacity,
            transfer_id,
            toggle: SOT_TOGGLE_BIT,
            offset: 0,
            crc,
            done: false,
        }
    }

    fn is_single_frame(&self) -> bool {
        self.payload.len() <= self.capacity
    }

    fn single_frame(&mut self) -> Data {
        let length = unwrap!(DataLength::new_ceil(self.payload.len() + TAIL_LENGTH));
        let mut data = Data::new_zeros(length);
        let (tail, body) = unwrap!(data.split_last_mut());
        body[..self.payload.len()].copy_from_slice(self.payload);
        *tail = TailByte::new(true, true, SOT_TOGGLE_BIT, self.transfer_id).into();
        self.done = true;
        data
    }

    fn multi_frame(&mut self) -> Data {
        let total = self.payload.len() + CRC_LENGTH;
        let residual = total - self.offset;
        let chunk = min(residual, self.capacity);
        let length = unwrap!(DataLength::new_ceil(chunk + TAIL_LENGTH));

        let mut data = Data::new_zeros(length);
        let sot = self.offset == 0;
        let (tail, body) = unwrap!(data.split_last_mut());

        if body.len() > chunk {
            // Only the last frame can be padded, and it then holds the whole CRC.
            debug_assert!(self.offset <= self.payload.len());
            let rest = &self.payload[self.offset..];
            let (content, crc_bytes) = unwrap!(body.split_last_chunk_mut::<CRC_LENGTH>());
            let (head, padding) = content.split_at_mut(rest.len());
            head.copy_from_slice(rest);
            padding.fill(PAD_VALUE);

            let mut crc = self.crc;
            crc.add_bytes(padding);
            *crc_bytes = crc.get().to_be_bytes();
        } else {
            let crc_bytes = self.crc.get().to_be_bytes();
            let stream = self.payload.iter().chain(crc_bytes.iter()).skip(self.offset);
            body.iter_mut().zip(stream).for_each(|(dst, src)| *dst = *src);
        }
        self.offset += chunk;

        let eot = self.offset == total;
        *tail = TailByte::new(sot, eot, self.toggle, self.transfer_id).into();
        self.toggle = !self.toggle;
        self.done = eot;
        data
    }
}

impl Iterator for Scatter<'_> {
    type Item = Data;

    fn next(&mut self) -> Option<Data> {
        if self.done {
            None
        } else if self.is_single_frame() {
            Some(self.single_frame())
        } else {
            Some(self.multi_frame())
        }
    }
}
