use crate::core::{NodeId, Priority};
use crate::data_types::{Health, Heartbeat, Mode};
use crate::frame::Mtu;
use crate::time::Duration;

/// Node state advertised in heartbeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub health: Health,
    pub mode: Mode,
    pub vendor_specific_status_code: u8,
}

/// Node parameters fixed at construction
///
/// Memory sizes (heap arena, transmit queue, session table) are const generics of
/// [`crate::node::Node`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// `None` runs the node anonymously: it receives, but publishes no heartbeat and only
    /// single-frame messages.
    pub node_id: Option<NodeId>,
    pub mtu: Mtu,
    /// Clamped to [`Heartbeat::MAX_PUBLICATION_PERIOD`]
    pub heartbeat_period: Duration,
    /// Transmission deadline of a heartbeat, counted from its publication time
    pub heartbeat_timeout: Duration,
    pub heartbeat_priority: Priority,
    /// Most frames pulled from the link in one poll; 0 counts as 1
    pub rx_burst_limit: usize,
    pub status: Status,
}

impl Config {
    pub fn new(node_id: NodeId, mtu: Mtu) -> Self {
        Self {
            node_id: Some(node_id),
            mtu,
            ..Default::default()
        }
    }

    pub(crate) fn effective_heartbeat_period(&self) -> Duration {
        self.heartbeat_period
            .min(Heartbeat::MAX_PUBLICATION_PERIOD)
            .max(Duration::from_ticks(1))
    }

    pub(crate) fn effective_rx_burst_limit(&self) -> usize {
        self.rx_burst_limit.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: None,
            mtu: Mtu::Fd,
            heartbeat_period: Heartbeat::MAX_PUBLICATION_PERIOD,
            heartbeat_timeout: Duration::from_millis(500),
            heartbeat_priority: Priority::Nominal,
            rx_burst_limit: 16,
            status: Status::default(),
        }
    }
}
