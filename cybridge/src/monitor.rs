//! Heartbeat tracking of remote nodes

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use crate::core::NodeId;
use crate::data_types::Heartbeat;
use crate::registry::Handler;
use crate::time::Instant;
use crate::transfer::Transfer;
use cybridge_encoding::Deserialize;

/// Last known state of a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Peer {
    pub node_id: NodeId,
    pub heartbeat: Heartbeat,
    pub last_seen: Instant,
}

/// Subscription handler for [`Heartbeat`] tracking up to `N` peers
///
/// The handler is implemented for `&HeartbeatMonitor`, so the peer table stays readable
/// while the monitor is subscribed. When the table is full, a heartbeat from an unknown node
/// replaces the peer heard from least recently.
pub struct HeartbeatMonitor<M: RawMutex, const N: usize> {
    peers: Mutex<M, RefCell<Vec<Peer, N>>>,
}

impl<M: RawMutex, const N: usize> HeartbeatMonitor<M, N> {
    pub const fn new() -> Self {
        Self {
            peers: Mutex::const_new(M::INIT, RefCell::new(Vec::new())),
        }
    }

    /// Snapshot of the peer table
    pub fn peers(&self) -> Vec<Peer, N> {
        self.peers.lock(|peers| peers.borrow().clone())
    }

    pub fn len(&self) -> usize {
        self.peers.lock(|peers| peers.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, node_id: NodeId) -> Option<Peer> {
        self.peers.lock(|peers| {
            peers
                .borrow()
                .iter()
                .find(|peer| peer.node_id == node_id)
                .copied()
        })
    }

    /// Forgets peers silent for longer than [`Heartbeat::OFFLINE_TIMEOUT`]
    ///
    /// Returns the number of peers removed.
    pub fn prune(&self, now: Instant) -> usize {
        self.peers.lock(|peers| {
            let mut peers = peers.borrow_mut();
            let before = peers.len();
            peers.retain(|peer| {
                let online =
                    now.saturating_duration_since(peer.last_seen) <= Heartbeat::OFFLINE_TIMEOUT;
                if !online {
                    info!("monitor: node {} offline", peer.node_id.into_u8());
                }
                online
            });
            before - peers.len()
        })
    }

    fn record(&self, node_id: NodeId, heartbeat: Heartbeat, timestamp: Instant) {
        let peer = Peer {
            node_id,
            heartbeat,
            last_seen: timestamp,
        };
        self.peers.lock(|peers| {
            let mut peers = peers.borrow_mut();
            if let Some(known) = peers.iter_mut().find(|known| known.node_id == node_id) {
                if heartbeat.uptime < known.heartbeat.uptime {
                    info!("monitor: node {} restarted", node_id.into_u8());
                }
                *known = peer;
                return;
            }

            info!("monitor: node {} online", node_id.into_u8());
            if let Err(peer) = peers.push(peer) {
                if let Some(oldest) = peers.iter_mut().min_by_key(|known| known.last_seen) {
                    *oldest = peer;
                }
            }
        });
    }
}

impl<M: RawMutex, const N: usize> Default for HeartbeatMonitor<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> Handler for &HeartbeatMonitor<M, N> {
    fn on_transfer(&mut self, transfer: &Transfer<'_>) {
        let Some(node_id) = transfer.meta.source else {
            // Anonymous nodes do not publish heartbeats
            return;
        };
        let heartbeat = match Heartbeat::deserialize_from_bytes(transfer.payload) {
            Ok(heartbeat) => heartbeat,
            Err(_) => {
                debug!("monitor: bad heartbeat from node {}", node_id.into_u8());
                return;
            }
        };
        debug!(
            "monitor: node {} uptime {} health {:?} mode {:?}",
            node_id.into_u8(),
            heartbeat.uptime,
            heartbeat.health,
            heartbeat.mode
        );
        self.record(node_id, heartbeat, transfer.timestamp);
    }
}
