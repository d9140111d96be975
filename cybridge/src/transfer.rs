use crate::codec::Header;
use crate::core::{DataSpecifier, NodeId, Priority, ServiceId, SubjectId, TransferId};
use crate::time::Instant;

/// Transfer properties except the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferMeta {
    pub priority: Priority,
    pub data_spec: DataSpecifier,
    /// `None` for anonymous transfers. The node fills it in on push.
    pub source: Option<NodeId>,
    /// Service transfers only
    pub destination: Option<NodeId>,
    pub transfer_id: TransferId,
}

impl TransferMeta {
    pub fn message(priority: Priority, subject: SubjectId, transfer_id: TransferId) -> Self {
        Self {
            priority,
            data_spec: DataSpecifier::Message(subject),
            source: None,
            destination: None,
            transfer_id,
        }
    }

    pub fn request(
        priority: Priority,
        service: ServiceId,
        destination: NodeId,
        transfer_id: TransferId,
    ) -> Self {
        Self {
            priority,
            data_spec: DataSpecifier::Request(service),
            source: None,
            destination: Some(destination),
            transfer_id,
        }
    }

    pub fn response(
        priority: Priority,
        service: ServiceId,
        destination: NodeId,
        transfer_id: TransferId,
    ) -> Self {
        Self {
            priority,
            data_spec: DataSpecifier::Response(service),
            source: None,
            destination: Some(destination),
            transfer_id,
        }
    }

    pub fn from_header(header: &Header, transfer_id: TransferId) -> Self {
        Self {
            priority: header.priority,
            data_spec: header.data_spec,
            source: header.source,
            destination: header.destination,
            transfer_id,
        }
    }

    pub fn header(&self) -> Header {
        Header {
            priority: self.priority,
            data_spec: self.data_spec,
            source: self.source,
            destination: self.destination,
        }
    }
}

/// Complete transfer as seen by handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer<'p> {
    pub meta: TransferMeta,
    /// Reception time of the first frame
    pub timestamp: Instant,
    /// Payload including any zero padding the sender added to fill the last frame up to a
    /// valid CAN-FD data length, cut at the subscription extent
    ///
    /// An 8-byte single-frame transfer over CAN-FD arrives as 11 bytes, for example.
    /// Self-delimiting encodings ignore the trailing zeros.
    pub payload: &'p [u8],
}
