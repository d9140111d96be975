//! Cyphal/CAN frame format
//!
//! Mapping between transfer metadata and the 29-bit CAN identifier \[1; 4.2.1\], the tail byte
//! \[1; 4.2.2\] and the transfer CRC \[1; 4.2.2.1\]. Everything here is stateless.

use crate::core::{DataSpecifier, NodeId, Priority, ServiceId, SubjectId, TransferId};
use crate::frame::{Data, Frame, Mtu};
use crate::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct TransferCrc(u16);

impl Default for TransferCrc {
    fn default() -> Self {
        Self(Self::INIT_VALUE)
    }
}

/// CRC-16/CCITT-FALSE
impl TransferCrc {
    pub const LENGTH: usize = 2;
    const INIT_VALUE: u16 = 0xffff;
    const POLYNOMIAL: u16 = 0x1021;

    pub fn add(&mut self, byte: u8) {
        self.0 ^= u16::from(byte) << 8;
        for _bit in 0..8 {
            if (self.0 & 0x8000) != 0 {
                self.0 = (self.0 << 1) ^ Self::POLYNOMIAL;
            } else {
                self.0 <<= 1;
            }
        }
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.add(byte));
    }

    pub fn of(bytes: &[u8]) -> Self {
        let mut crc = Self::default();
        crc.add_bytes(bytes);
        crc
    }

    pub fn get(&self) -> u16 {
        self.0
    }

    /// True once the CRC itself (big-endian) has been fed after a clean payload
    pub fn is_residue_zero(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailByte(u8);

impl TailByte {
    const START_OF_TRANSFER: u8 = 7;
    const END_OF_TRANSFER: u8 = 6;
    const TOGGLE_BIT: u8 = 5;

    pub fn new(sot: bool, eot: bool, toggle: bool, transfer_id: TransferId) -> Self {
        Self(
            (sot as u8) << Self::START_OF_TRANSFER
                | (eot as u8) << Self::END_OF_TRANSFER
                | (toggle as u8) << Self::TOGGLE_BIT
                | transfer_id.into_u8(),
        )
    }

    pub fn sot(&self) -> bool {
        (self.0 >> Self::START_OF_TRANSFER) & 0x1 != 0
    }

    pub fn eot(&self) -> bool {
        (self.0 >> Self::END_OF_TRANSFER) & 0x1 != 0
    }

    pub fn toggle(&self) -> bool {
        (self.0 >> Self::TOGGLE_BIT) & 0x1 != 0
    }

    pub fn transfer_id(&self) -> TransferId {
        TransferId::from_u8_truncating(self.0)
    }
}

impl From<TailByte> for u8 {
    fn from(value: TailByte) -> Self {
        value.0
    }
}

impl From<u8> for TailByte {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Toggle bit value for start-of-transfer frame [1; table 4.4]
pub const SOT_TOGGLE_BIT: bool = true;

pub const PAD_VALUE: u8 = 0;

const PRIORITY_OFFSET: u32 = 26;
const SERVICE_FLAG: u32 = 1 << 25;
const ANONYMOUS_FLAG: u32 = 1 << 24;
const REQUEST_FLAG: u32 = 1 << 24;
const RESERVED_23: u32 = 1 << 23;
const MESSAGE_FIXED_ONES: u32 = 0b11 << 21;
const RESERVED_7: u32 = 1 << 7;
const SUBJECT_OFFSET: u32 = 8;
const SERVICE_OFFSET: u32 = 14;
const DESTINATION_OFFSET: u32 = 7;

const fn lsb_mask(width: u32) -> u32 {
    (1 << width) - 1
}

const PRIORITY_MASK: u32 = lsb_mask(3);
const SUBJECT_MASK: u32 = lsb_mask(13);
const SERVICE_MASK: u32 = lsb_mask(9);
const NODE_MASK: u32 = lsb_mask(7);

/// Transfer properties carried by the CAN identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub priority: Priority,
    pub data_spec: DataSpecifier,
    /// `None` for anonymous messages
    pub source: Option<NodeId>,
    /// Service transfers only
    pub destination: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Messages have no destination; services need both ends
    InvalidHeader,
    /// Frame data exceeds the link MTU
    TooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// No tail byte
    Empty,
    /// Reserved identifier bits are set
    InvalidId,
    /// Service frame with equal source and destination
    SelfAddressed,
    AnonymousMultiFrame,
    /// Start-of-transfer frame with a cleared toggle bit
    InvalidToggle,
    /// Multi-frame transfer frame without payload
    EmptyFragment,
}

pub fn encode_can_id(header: &Header) -> Result<u32, EncodeError> {
    let priority = u32::from(header.priority.into_u8()) << PRIORITY_OFFSET;
    match (header.data_spec, header.source, header.destination) {
        (DataSpecifier::Message(subject), source, None) => {
            let subject = u32::from(subject.into_u16()) << SUBJECT_OFFSET;
            let source = match source {
                Some(node) => u32::from(node.into_u8()),
                None => ANONYMOUS_FLAG,
            };
            Ok(priority | MESSAGE_FIXED_ONES | subject | source)
        }
        (DataSpecifier::Request(service), Some(source), Some(destination)) => Ok(priority
            | SERVICE_FLAG
            | REQUEST_FLAG
            | service_fields(service, source, destination)),
        (DataSpecifier::Response(service), Some(source), Some(destination)) => {
            Ok(priority | SERVICE_FLAG | service_fields(service, source, destination))
        }
        _ => Err(EncodeError::InvalidHeader),
    }
}

fn service_fields(service: ServiceId, source: NodeId, destination: NodeId) -> u32 {
    u32::from(service.into_u16()) << SERVICE_OFFSET
        | u32::from(destination.into_u8()) << DESTINATION_OFFSET
        | u32::from(source.into_u8())
}

pub fn decode_can_id(id: u32) -> Result<Header, DecodeError> {
    let id = id & Frame::EXTENDED_ID_MASK;
    if id & RESERVED_23 != 0 {
        return Err(DecodeError::InvalidId);
    }

    let priority = Priority::from_u8_truncating((id >> PRIORITY_OFFSET & PRIORITY_MASK) as u8);
    let source = NodeId::from_u8_truncating((id & NODE_MASK) as u8);

    if id & SERVICE_FLAG == 0 {
        if id & RESERVED_7 != 0 {
            return Err(DecodeError::InvalidId);
        }
        let subject = SubjectId::from_u16_truncating((id >> SUBJECT_OFFSET & SUBJECT_MASK) as u16);
        Ok(Header {
            priority,
            data_spec: DataSpecifier::Message(subject),
            source: (id & ANONYMOUS_FLAG == 0).then_some(source),
            destination: None,
        })
    } else {
        let service = ServiceId::from_u16_truncating((id >> SERVICE_OFFSET & SERVICE_MASK) as u16);
        let destination = NodeId::from_u8_truncating((id >> DESTINATION_OFFSET & NODE_MASK) as u8);
        if destination == source {
            return Err(DecodeError::SelfAddressed);
        }
        let data_spec = if id & REQUEST_FLAG != 0 {
            DataSpecifier::Request(service)
        } else {
            DataSpecifier::Response(service)
        };
        Ok(Header {
            priority,
            data_spec,
            source: Some(source),
            destination: Some(destination),
        })
    }
}

/// Builds a link frame from frame data that already ends with its tail byte
///
/// Anonymous messages get a pseudo source id derived from the data, so that distinct
/// anonymous publishers are unlikely to collide in arbitration.
pub fn frame_from_fragment(
    header: &Header,
    data: Data,
    timestamp: Instant,
    mtu: Mtu,
) -> Result<Frame, EncodeError> {
    if data.len() > usize::from(mtu) {
        return Err(EncodeError::TooLong);
    }
    let mut id = encode_can_id(header)?;
    if header.source.is_none() {
        let body = data.split_last().map_or(&[][..], |(_, body)| body);
        id |= u32::from(TransferCrc::of(body).get()) & NODE_MASK;
    }
    Ok(Frame {
        id,
        data,
        fd: mtu == Mtu::Fd,
        timestamp,
    })
}

/// Decoded view of a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFields<'f> {
    pub header: Header,
    pub transfer_id: TransferId,
    pub sot: bool,
    pub eot: bool,
    pub toggle: bool,
    /// Frame data without the tail byte
    pub payload: &'f [u8],
}

impl FrameFields<'_> {
    pub fn is_single_frame(&self) -> bool {
        self.sot && self.eot
    }
}

pub fn fields_from_frame(frame: &Frame) -> Result<FrameFields<'_>, DecodeError> {
    let (&tail, payload) = frame.data.split_last().ok_or(DecodeError::Empty)?;
    let header = decode_can_id(frame.id)?;
    let tail = TailByte::from(tail);

    let fields = FrameFields {
        header,
        transfer_id: tail.transfer_id(),
        sot: tail.sot(),
        eot: tail.eot(),
        toggle: tail.toggle(),
        payload,
    };
    if fields.sot && fields.toggle != SOT_TOGGLE_BIT {
        return Err(DecodeError::InvalidToggle);
    }
    if !fields.is_single_frame() {
        if header.source.is_none() {
            return Err(DecodeError::AnonymousMultiFrame);
        }
        if payload.is_empty() {
            return Err(DecodeError::EmptyFragment);
        }
    }
    Ok(fields)
}
