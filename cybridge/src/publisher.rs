use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::core::{NodeId, Priority, SubjectId, TransferId};
use crate::node::Node;
use crate::time::{Duration, Instant};
use crate::transfer::TransferMeta;
use crate::transmit::{PushError, TxQueue};
use cybridge_encoding::{BufferType, Serialize, serialize_to_buffer};

/// Message publisher for a single subject
///
/// Holds the transfer id sequence of the subject. Every queued transfer must expire
/// within `timeout` of its publication time.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Publisher {
    subject: SubjectId,
    priority: Priority,
    timeout: Duration,
    next_transfer_id: TransferId,
}

impl Publisher {
    pub fn new(subject: SubjectId, priority: Priority, timeout: Duration) -> Self {
        Self {
            subject,
            priority,
            timeout,
            next_transfer_id: TransferId::default(),
        }
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn next_transfer_id(&self) -> TransferId {
        self.next_transfer_id
    }

    /// Queues a raw payload on the node
    pub fn push<'a, M: RawMutex, const H: usize, const Q: usize, const S: usize>(
        &mut self,
        node: &mut Node<'a, M, H, Q, S>,
        now: Instant,
        payload: &[u8],
    ) -> Result<usize, PushError> {
        let meta = self.meta();
        let result = node.push(&meta, payload, now.saturating_add(self.timeout));
        self.advance(&result);
        result
    }

    /// Serializes and queues a message
    pub fn push_message<'a, T, M, const H: usize, const Q: usize, const S: usize>(
        &mut self,
        node: &mut Node<'a, M, H, Q, S>,
        now: Instant,
        message: &T,
    ) -> Result<usize, PushError>
    where
        T: Serialize + BufferType,
        M: RawMutex,
    {
        let (buffer, length) = serialize_to_buffer(message);
        self.push(node, now, &buffer.as_ref()[..length])
    }

    pub(crate) fn push_into<const Q: usize>(
        &mut self,
        tx: &mut TxQueue<Q>,
        source: Option<NodeId>,
        now: Instant,
        payload: &[u8],
    ) -> Result<usize, PushError> {
        let meta = TransferMeta {
            source,
            ..self.meta()
        };
        let result = tx.push(&meta, payload, now.saturating_add(self.timeout));
        self.advance(&result);
        result
    }

    fn meta(&self) -> TransferMeta {
        TransferMeta::message(self.priority, self.subject, self.next_transfer_id)
    }

    fn advance(&mut self, result: &Result<usize, PushError>) {
        if result.is_ok() {
            self.next_transfer_id = self.next_transfer_id.next();
        }
    }
}
