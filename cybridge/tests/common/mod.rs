#![allow(dead_code)]

use std::collections::VecDeque;
use std::vec::Vec;

use cybridge::frame::{Frame, Mtu};
use cybridge::link::{Link, SendStatus};
use cybridge::signal::RxSignal;
use cybridge::time::{Duration, Instant};
use cybridge::transfer::TransferMeta;
use cybridge::transmit::TxQueue;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

pub type Signal = RxSignal<CriticalSectionRawMutex>;

pub fn ts(micros: u64) -> Instant {
    Instant::MIN.saturating_add(Duration::from_micros(micros))
}

/// In-memory CAN controller
#[derive(Default)]
pub struct MockLink {
    pub rx: VecDeque<Frame>,
    pub sent: Vec<Frame>,
    pub busy: bool,
}

impl MockLink {
    /// Queues received frames and raises the signal like a receive interrupt would
    pub fn deliver(&mut self, signal: &Signal, frames: impl IntoIterator<Item = Frame>) {
        self.rx.extend(frames);
        signal.raise();
    }
}

impl Link for MockLink {
    fn try_send(&mut self, frame: &Frame) -> SendStatus {
        if self.busy {
            SendStatus::Busy
        } else {
            self.sent.push(*frame);
            SendStatus::Sent
        }
    }

    fn rx_ready(&mut self) -> bool {
        !self.rx.is_empty()
    }

    fn try_receive(&mut self) -> Option<Frame> {
        self.rx.pop_front()
    }
}

/// Frames another node would put on the bus for a transfer, received at `at`
pub fn remote_frames(meta: &TransferMeta, payload: &[u8], mtu: Mtu, at: Instant) -> Vec<Frame> {
    let mut queue = TxQueue::<32>::new(mtu);
    queue.push(meta, payload, Instant::MAX).unwrap();
    let mut frames = Vec::new();
    queue.service(Instant::MIN, |frame| {
        frames.push(Frame {
            timestamp: at,
            ..*frame
        });
        SendStatus::Sent
    });
    frames
}

/// Moves everything `from` sent into the receive queue of `to`, received at `at`
pub fn relay(from: &mut MockLink, to: &mut MockLink, signal: &Signal, at: Instant) {
    let frames = from.sent.drain(..).map(|frame| Frame {
        timestamp: at,
        ..frame
    });
    to.deliver(signal, frames);
}

pub fn pattern(length: usize) -> Vec<u8> {
    (0..length).map(|i| (i as u8) ^ 0x5a).collect()
}
