//! Cyphal node mainloop
//!
//! [`Node`] owns every piece of transport state: the payload heap, the transmit queue, the
//! reassembly sessions and the subscription registry. Nothing in it blocks or reads a
//! clock; the application calls [`Node::poll`] from its main loop with the current time
//! and a non-blocking [`Link`].
//!
//! The only state shared with interrupt context is the [`RxSignal`], which the CAN
//! interrupt raises when a frame is waiting.
//!
//! ## Example
//!
//! ```
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//! use cybridge::config::Config;
//! use cybridge::core::NodeId;
//! use cybridge::frame::Mtu;
//! use cybridge::node::Node;
//! use cybridge::signal::RxSignal;
//! use cybridge::time::Instant;
//!
//! static RX_PENDING: RxSignal<Mutex> = RxSignal::new();
//!
//! let config = Config::new(NodeId::new(42).unwrap(), Mtu::Fd);
//! // 64 heap units of 16 bytes, 32 queued frames, 8 reassembly sessions
//! let node = Node::<Mutex, 64, 32, 8>::new(config, &RX_PENDING, Instant::MIN);
//! assert_eq!(node.node_id(), NodeId::new(42));
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::{Config, Status};
use crate::core::{DataSpecifier, NodeId};
use crate::data_types::Heartbeat;
use crate::heap::{Diagnostics, Heap};
use crate::link::Link;
use crate::publisher::Publisher;
use crate::receive::{Accepted, Reassembler, RxStatistics, RxTransfer};
use crate::registry::{RegistrationError, Registry, Subscription};
use crate::signal::RxSignal;
use crate::time::{Duration, Instant};
use crate::transfer::{Transfer, TransferMeta};
use crate::transmit::{PushError, ServiceReport, TxQueue, TxStatistics};
use cybridge_encoding::serialize_to_buffer;

/// Outcome of a single [`Node::poll`] iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollReport {
    /// Frames pulled from the link
    pub received: usize,
    pub delivered: usize,
    pub rejected: usize,
    /// Partial transfers dropped by the transfer-id timeout
    pub rx_expired: usize,
    pub tx: ServiceReport,
    /// A heartbeat was queued in this iteration
    pub heartbeat: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeStatistics {
    pub heap: Diagnostics,
    pub tx: TxStatistics,
    pub rx: RxStatistics,
}

/// Single-threaded Cyphal/CAN node
///
/// * `HEAP`: payload arena size in 16-byte units
/// * `TXQ`: transmit queue capacity in frames
/// * `SESSIONS`: concurrent reassembly sessions across all subscriptions
pub struct Node<'a, M: RawMutex, const HEAP: usize, const TXQ: usize, const SESSIONS: usize> {
    config: Config,
    signal: &'a RxSignal<M>,
    heap: Heap<HEAP>,
    tx: TxQueue<TXQ>,
    rx: Reassembler<SESSIONS>,
    registry: Registry<'a>,
    heartbeat: Publisher,
    next_heartbeat: Instant,
    started_at: Instant,
}

impl<'a, M: RawMutex, const HEAP: usize, const TXQ: usize, const SESSIONS: usize>
    Node<'a, M, HEAP, TXQ, SESSIONS>
{
    /// Creates a node started at `now`; the first heartbeat is due immediately
    pub fn new(config: Config, signal: &'a RxSignal<M>, now: Instant) -> Self {
        let heartbeat = Publisher::new(
            Heartbeat::SUBJECT,
            config.heartbeat_priority,
            config.heartbeat_timeout,
        );
        Self {
            config,
            signal,
            heap: Heap::new(),
            tx: TxQueue::new(config.mtu),
            rx: Reassembler::new(),
            registry: Registry::new(),
            heartbeat,
            next_heartbeat: now,
            started_at: now,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn node_id(&self) -> Option<NodeId> {
        self.config.node_id
    }

    pub fn status(&self) -> Status {
        self.config.status
    }

    /// Takes effect from the next heartbeat
    pub fn set_status(&mut self, status: Status) {
        self.config.status = status;
    }

    /// Whole seconds since the node was created, saturating
    pub fn uptime(&self, now: Instant) -> u32 {
        let secs = now.saturating_duration_since(self.started_at).as_secs();
        u32::try_from(secs).unwrap_or(u32::MAX)
    }

    pub fn statistics(&self) -> NodeStatistics {
        NodeStatistics {
            heap: self.heap.diagnostics(),
            tx: self.tx.statistics(),
            rx: self.rx.statistics(),
        }
    }

    pub fn tx_queue(&self) -> &TxQueue<TXQ> {
        &self.tx
    }

    pub fn subscribe(
        &mut self,
        subscription: &'a Subscription<'a>,
    ) -> Result<(), RegistrationError> {
        self.registry.subscribe(subscription)
    }

    /// Unlinks a subscription and drops its partial transfers
    pub fn unsubscribe(&mut self, data_spec: DataSpecifier) -> Option<&'a Subscription<'a>> {
        let subscription = self.registry.unsubscribe(data_spec)?;
        self.rx.purge(&mut self.heap, data_spec);
        Some(subscription)
    }

    /// Queues a transfer sent from this node
    ///
    /// `meta.source` is overwritten with the local node id.
    pub fn push(
        &mut self,
        meta: &TransferMeta,
        payload: &[u8],
        deadline: Instant,
    ) -> Result<usize, PushError> {
        let meta = TransferMeta {
            source: self.config.node_id,
            ..*meta
        };
        self.tx.push(&meta, payload, deadline)
    }

    /// Runs one mainloop iteration
    ///
    /// Drains pending frames if the receive signal is raised, times out stale sessions,
    /// feeds the link from the transmit queue and queues a heartbeat when one is due.
    pub fn poll(&mut self, now: Instant, link: &mut impl Link) -> PollReport {
        let mut report = PollReport::default();
        if self.signal.take() {
            self.drain(now, link, &mut report);
        }
        report.rx_expired = self.rx.expire(&mut self.heap, now);
        report.tx = self.tx.service(now, |frame| link.try_send(frame));
        report.heartbeat = self.publish_heartbeat(now);
        report
    }

    fn drain(&mut self, now: Instant, link: &mut impl Link, report: &mut PollReport) {
        let mut budget = self.config.effective_rx_burst_limit();
        while link.rx_ready() {
            if budget == 0 {
                // Leave the rest for the next iteration
                self.signal.raise();
                break;
            }
            let Some(frame) = link.try_receive() else {
                break;
            };
            budget -= 1;
            report.received += 1;

            let local = self.config.node_id;
            match self
                .rx
                .accept(&mut self.heap, &self.registry, local, now, &frame)
            {
                Accepted::Delivered(transfer) => {
                    self.deliver(transfer);
                    report.delivered += 1;
                }
                Accepted::Incomplete => {}
                Accepted::Rejected(_) => report.rejected += 1,
            }
        }
    }

    fn deliver(&mut self, received: RxTransfer) {
        let transfer = Transfer {
            meta: *received.meta(),
            timestamp: received.timestamp(),
            payload: received.payload(&self.heap),
        };
        if !self.registry.dispatch(&transfer) {
            trace!("node: no handler for {:?}", transfer.meta.data_spec);
        }
        received.release(&mut self.heap);
    }

    fn publish_heartbeat(&mut self, now: Instant) -> bool {
        let Some(node_id) = self.config.node_id else {
            return false;
        };
        if now < self.next_heartbeat {
            return false;
        }
        self.schedule_next_heartbeat(now);

        let status = self.config.status;
        let heartbeat = Heartbeat {
            uptime: self.uptime(now),
            health: status.health,
            mode: status.mode,
            vendor_specific_status_code: status.vendor_specific_status_code,
        };
        let (buffer, length) = serialize_to_buffer(&heartbeat);
        match self
            .heartbeat
            .push_into(&mut self.tx, Some(node_id), now, &buffer.as_ref()[..length])
        {
            Ok(_) => true,
            Err(err) => {
                warn!("node: heartbeat skipped: {:?}", err);
                false
            }
        }
    }

    /// Moves the deadline past `now`, skipping missed periods
    fn schedule_next_heartbeat(&mut self, now: Instant) {
        let period = self.config.effective_heartbeat_period().as_ticks();
        let behind = now.saturating_duration_since(self.next_heartbeat).as_ticks();
        let periods = behind / period + 1;
        self.next_heartbeat = self
            .next_heartbeat
            .saturating_add(Duration::from_ticks(periods.saturating_mul(period)));
    }
}
