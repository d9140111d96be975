mod common;

use std::cell::RefCell;
use std::vec::Vec;

use common::{MockLink, Signal, pattern, remote_frames, ts};
use cybridge::config::Config;
use cybridge::core::{DataSpecifier, NodeId, Priority, ServiceId, SubjectId, TransferId};
use cybridge::frame::{Data, Mtu};
use cybridge::heap::Heap;
use cybridge::link::SendStatus;
use cybridge::node::Node;
use cybridge::receive::{Accepted, Reassembler};
use cybridge::registry::{Registry, Subscription};
use cybridge::time::Duration;
use cybridge::transmit::TxQueue;
use cybridge::transfer::{Transfer, TransferMeta};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

type TestNode<'a> = Node<'a, CriticalSectionRawMutex, 64, 16, 4>;

const LOCAL: NodeId = NodeId::new(42).unwrap();
const REMOTE: NodeId = NodeId::new(7).unwrap();
const SUBJECT: SubjectId = SubjectId::new(1234).unwrap();
const SERVICE: ServiceId = ServiceId::new(100).unwrap();

fn message(transfer_id: u8) -> TransferMeta {
    TransferMeta {
        source: Some(REMOTE),
        ..TransferMeta::message(
            Priority::Nominal,
            SUBJECT,
            TransferId::new(transfer_id).unwrap(),
        )
    }
}

fn message_from(source: NodeId, transfer_id: u8) -> TransferMeta {
    TransferMeta {
        source: Some(source),
        ..message(transfer_id)
    }
}

type Log = RefCell<Vec<(TransferMeta, Vec<u8>)>>;

fn recorder(log: &Log) -> impl FnMut(&Transfer<'_>) + '_ {
    move |transfer| {
        log.borrow_mut()
            .push((transfer.meta, transfer.payload.to_vec()))
    }
}

#[test]
fn test_multi_frame_fd_transfer() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let payload = pattern(130);
    let frames = remote_frames(&message(3), &payload, Mtu::Fd, ts(10));
    assert_eq!(frames.len(), 3);

    for (i, frame) in frames.into_iter().enumerate() {
        link.deliver(&signal, [frame]);
        let report = node.poll(ts(10 + i as u64), &mut link);
        assert_eq!(report.received, 1);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.delivered, usize::from(i == 2));
    }

    let statistics = node.statistics();
    assert_eq!(statistics.heap.allocated, 0);
    assert_eq!(statistics.heap.live_blocks, 0);
    assert_eq!(statistics.rx.delivered, 1);

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    let (meta, received) = &log[0];
    assert_eq!(meta.source, Some(REMOTE));
    assert_eq!(meta.transfer_id.into_u8(), 3);
    assert_eq!(meta.data_spec, DataSpecifier::Message(SUBJECT));
    assert_eq!(received, &payload);
}

#[test]
fn test_repeated_transfer_is_duplicate() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let frames = remote_frames(&message(3), &pattern(130), Mtu::Fd, ts(10));
    link.deliver(&signal, frames.iter().copied());
    assert_eq!(node.poll(ts(10), &mut link).delivered, 1);

    link.deliver(&signal, frames.iter().copied());
    let report = node.poll(ts(20), &mut link);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.rejected, 3);
    assert_eq!(node.statistics().rx.duplicate, 3);

    // The next transfer id is accepted right away
    let frames = remote_frames(&message(4), &[1, 2, 3], Mtu::Fd, ts(30));
    link.deliver(&signal, frames);
    assert_eq!(node.poll(ts(30), &mut link).delivered, 1);
    assert_eq!(log.borrow().len(), 2);
    assert_eq!(node.statistics().heap.allocated, 0);
}

#[test]
fn test_stale_partial_transfer_released() {
    let mut handler = |_: &Transfer<'_>| {};
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let frames = remote_frames(&message(0), &pattern(130), Mtu::Fd, ts(1_000));
    link.deliver(&signal, [frames[0]]);
    assert_eq!(node.poll(ts(1_000), &mut link).received, 1);
    assert_eq!(node.statistics().heap.live_blocks, 1);

    // The default transfer-id timeout is 2 s
    assert_eq!(node.poll(ts(2_001_000), &mut link).rx_expired, 0);
    assert_eq!(node.poll(ts(2_001_001), &mut link).rx_expired, 1);
    let statistics = node.statistics();
    assert_eq!(statistics.heap.allocated, 0);
    assert_eq!(statistics.rx.expired, 1);

    // The rest of the abandoned transfer has no session to attach to
    link.deliver(&signal, frames[1..].iter().copied());
    let report = node.poll(ts(2_001_002), &mut link);
    assert_eq!(report.rejected, 2);
    assert_eq!(node.statistics().rx.out_of_sequence, 2);
}

#[test]
fn test_unsubscribed_frames_use_no_memory() {
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    let mut link = MockLink::default();

    link.deliver(&signal, remote_frames(&message(0), &pattern(130), Mtu::Fd, ts(0)));
    link.deliver(&signal, remote_frames(&message(1), &[1], Mtu::Fd, ts(0)));
    let report = node.poll(ts(0), &mut link);
    assert_eq!(report.received, 4);
    assert_eq!(report.rejected, 4);

    let statistics = node.statistics();
    assert_eq!(statistics.rx.not_subscribed, 4);
    assert_eq!(statistics.heap.peak_allocated, 0);
}

#[test]
fn test_unsubscribe_drops_partial_transfer() {
    let mut handler = |_: &Transfer<'_>| {};
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let frames = remote_frames(&message(0), &pattern(130), Mtu::Fd, ts(0));
    link.deliver(&signal, [frames[0]]);
    node.poll(ts(0), &mut link);
    assert_eq!(node.statistics().heap.live_blocks, 1);

    assert!(node.unsubscribe(DataSpecifier::Message(SUBJECT)).is_some());
    assert_eq!(node.statistics().heap.live_blocks, 0);
    assert!(!subscription.is_linked());
}

#[test]
fn test_burst_limit_defers_frames() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 8, &mut handler);
    let signal = Signal::new();
    let config = Config {
        rx_burst_limit: 2,
        ..Config::new(LOCAL, Mtu::Classic)
    };
    let mut node = TestNode::new(config, &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    for transfer_id in 0..5 {
        let frames = remote_frames(&message(transfer_id), &[transfer_id], Mtu::Classic, ts(0));
        link.deliver(&signal, frames);
    }

    assert_eq!(node.poll(ts(1), &mut link).received, 2);
    assert!(signal.is_raised());
    assert_eq!(node.poll(ts(2), &mut link).received, 2);
    assert!(signal.is_raised());
    assert_eq!(node.poll(ts(3), &mut link).received, 1);
    assert!(!signal.is_raised());
    assert_eq!(node.poll(ts(4), &mut link).received, 0);

    let payloads: Vec<u8> = log.borrow().iter().map(|(_, payload)| payload[0]).collect();
    assert_eq!(payloads, [0, 1, 2, 3, 4]);
}

#[test]
fn test_zero_burst_limit_still_receives() {
    let mut handler = |_: &Transfer<'_>| {};
    let subscription = Subscription::message(SUBJECT, 8, &mut handler);
    let signal = Signal::new();
    let config = Config {
        rx_burst_limit: 0,
        ..Config::new(LOCAL, Mtu::Classic)
    };
    let mut node = TestNode::new(config, &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    for transfer_id in 0..2 {
        let frames = remote_frames(&message(transfer_id), &[transfer_id], Mtu::Classic, ts(0));
        link.deliver(&signal, frames);
    }
    assert_eq!(node.poll(ts(1), &mut link).delivered, 1);
    assert!(signal.is_raised());
    assert_eq!(node.poll(ts(2), &mut link).delivered, 1);
    assert!(link.rx.is_empty());
}

#[test]
fn test_frames_ignored_without_signal() {
    let mut handler = |_: &Transfer<'_>| {};
    let subscription = Subscription::message(SUBJECT, 8, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    link.rx.extend(remote_frames(&message(0), &[1], Mtu::Fd, ts(0)));
    assert_eq!(node.poll(ts(1), &mut link).received, 0);
    signal.raise();
    assert_eq!(node.poll(ts(2), &mut link).delivered, 1);
}

#[test]
fn test_extent_truncates_padding_only() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 20, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    // 20 bytes travel in a 24-byte frame: three zero bytes of padding past the extent
    let payload = pattern(20);
    link.deliver(&signal, remote_frames(&message(0), &payload, Mtu::Fd, ts(0)));
    assert_eq!(node.poll(ts(0), &mut link).delivered, 1);
    assert_eq!(log.borrow()[0].1, payload);

    // One payload byte past the extent
    link.deliver(&signal, remote_frames(&message(1), &pattern(21), Mtu::Fd, ts(0)));
    let report = node.poll(ts(1), &mut link);
    assert_eq!(report.delivered, 0);
    assert_eq!(node.statistics().rx.extent_exceeded, 1);

    // Multi-frame transfer far beyond the extent
    link.deliver(&signal, remote_frames(&message(2), &pattern(130), Mtu::Fd, ts(0)));
    let report = node.poll(ts(2), &mut link);
    assert_eq!(report.delivered, 0);
    assert_eq!(node.statistics().rx.extent_exceeded, 2);
    assert_eq!(node.statistics().heap.allocated, 0);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_corrupted_transfer_discarded() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let mut frames = remote_frames(&message(0), &pattern(130), Mtu::Fd, ts(0));
    let mut bytes = frames[1].data.to_vec();
    bytes[5] ^= 0xff;
    frames[1].data = Data::new(&bytes).unwrap();

    link.deliver(&signal, frames);
    let report = node.poll(ts(0), &mut link);
    assert_eq!(report.received, 3);
    assert_eq!(report.delivered, 0);

    let statistics = node.statistics();
    assert_eq!(statistics.rx.integrity, 1);
    assert_eq!(statistics.heap.allocated, 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_service_requests_addressed_to_local_node() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::request(SERVICE, 16, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Classic), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let request = |destination: NodeId| TransferMeta {
        source: Some(REMOTE),
        ..TransferMeta::request(Priority::High, SERVICE, destination, TransferId::default())
    };
    link.deliver(&signal, remote_frames(&request(LOCAL), &[9, 8], Mtu::Classic, ts(0)));
    link.deliver(
        &signal,
        remote_frames(&request(NodeId::new(50).unwrap()), &[7], Mtu::Classic, ts(0)),
    );
    let report = node.poll(ts(0), &mut link);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(node.statistics().rx.not_addressed, 1);

    let log = log.borrow();
    assert_eq!(log[0].0.destination, Some(LOCAL));
    assert_eq!(log[0].0.data_spec, DataSpecifier::Request(SERVICE));
    assert_eq!(log[0].1, [9, 8]);
}

#[test]
fn test_anonymous_message_delivered() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 8, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::default(), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let meta = TransferMeta::message(Priority::Low, SUBJECT, TransferId::default());
    link.deliver(&signal, remote_frames(&meta, &[1, 2, 3], Mtu::Fd, ts(0)));
    assert_eq!(node.poll(ts(0), &mut link).delivered, 1);

    let log = log.borrow();
    assert_eq!(log[0].0.source, None);
    assert_eq!(log[0].1, [1, 2, 3]);
}

#[test]
fn test_scheduler_to_reassembler() {
    let subject = SubjectId::new(100).unwrap();
    let mut handler = |_: &Transfer<'_>| {};
    let subscription = Subscription::new(
        DataSpecifier::Message(subject),
        130,
        Duration::from_secs(1),
        &mut handler,
    );
    let mut registry = Registry::new();
    registry.subscribe(&subscription).unwrap();
    let mut heap = Heap::<32>::new();
    let mut reassembler = Reassembler::<2>::new();

    let meta = TransferMeta {
        source: Some(REMOTE),
        ..TransferMeta::message(Priority::Nominal, subject, TransferId::new(9).unwrap())
    };
    let payload = pattern(130);
    let mut queue = TxQueue::<8>::new(Mtu::Fd);
    assert_eq!(queue.push(&meta, &payload, ts(500_000)), Ok(3));

    let mut frames = Vec::new();
    while !queue.is_empty() {
        queue.service(ts(0), |frame| {
            frames.push(*frame);
            SendStatus::Sent
        });
    }

    let local = Some(LOCAL);
    let mut outcomes = frames
        .iter()
        .map(|frame| reassembler.accept(&mut heap, &registry, local, ts(1), frame));
    assert!(matches!(outcomes.next(), Some(Accepted::Incomplete)));
    assert!(matches!(outcomes.next(), Some(Accepted::Incomplete)));
    let Some(Accepted::Delivered(transfer)) = outcomes.next() else {
        panic!("transfer not delivered");
    };
    drop(outcomes);

    assert_eq!(transfer.meta().transfer_id.into_u8(), 9);
    assert_eq!(transfer.payload(&heap), &payload[..]);
    transfer.release(&mut heap);
    assert_eq!(heap.diagnostics().allocated, 0);
    assert_eq!(reassembler.statistics().delivered, 1);
}

#[test]
fn test_newer_transfer_supersedes_partial() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let stale = remote_frames(&message(3), &pattern(130), Mtu::Fd, ts(0));
    link.deliver(&signal, [stale[0]]);
    node.poll(ts(0), &mut link);
    assert_eq!(node.statistics().heap.live_blocks, 1);

    let payload: Vec<u8> = pattern(130).iter().map(|byte| !byte).collect();
    link.deliver(&signal, remote_frames(&message(4), &payload, Mtu::Fd, ts(10)));
    assert_eq!(node.poll(ts(10), &mut link).delivered, 1);

    let statistics = node.statistics();
    assert_eq!(statistics.rx.abandoned, 1);
    assert_eq!(statistics.heap.live_blocks, 0);
    assert_eq!(statistics.heap.allocated, 0);

    // Leftovers of the superseded transfer belong to an older transfer id
    link.deliver(&signal, stale[1..].iter().copied());
    assert_eq!(node.poll(ts(20), &mut link).rejected, 2);
    assert_eq!(node.statistics().rx.duplicate, 2);

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0.transfer_id.into_u8(), 4);
    assert_eq!(log[0].1, payload);
}

#[test]
fn test_older_transfer_id_is_duplicate() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 8, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Classic), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    // 16 is half the sequence space behind 0, 15 is ahead of it
    for transfer_id in [30, 29, 31, 0, 31, 16, 15] {
        let frames = remote_frames(&message(transfer_id), &[transfer_id], Mtu::Classic, ts(0));
        link.deliver(&signal, frames);
    }
    let report = node.poll(ts(0), &mut link);
    assert_eq!(report.delivered, 4);
    assert_eq!(report.rejected, 3);
    assert_eq!(node.statistics().rx.duplicate, 3);

    let transfer_ids: Vec<u8> = log
        .borrow()
        .iter()
        .map(|(meta, _)| meta.transfer_id.into_u8())
        .collect();
    assert_eq!(transfer_ids, [30, 31, 0, 15]);
}

#[test]
fn test_repeated_toggle_keeps_transfer() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let payload = pattern(130);
    let frames = remote_frames(&message(5), &payload, Mtu::Fd, ts(0));
    link.deliver(&signal, [frames[0], frames[1], frames[1], frames[2]]);
    let report = node.poll(ts(0), &mut link);
    assert_eq!(report.received, 4);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(node.statistics().rx.duplicate, 1);
    assert_eq!(node.statistics().heap.allocated, 0);
    assert_eq!(log.borrow()[0].1, payload);
}

#[test]
fn test_full_session_table() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 100, &mut handler);
    let signal = Signal::new();
    let mut node = Node::<CriticalSectionRawMutex, 64, 16, 2>::new(
        Config::new(LOCAL, Mtu::Fd),
        &signal,
        ts(0),
    );
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let node_a = REMOTE;
    let node_b = NodeId::new(8).unwrap();
    let node_c = NodeId::new(9).unwrap();
    let single = |source: NodeId, transfer_id: u8| {
        remote_frames(&message_from(source, transfer_id), &[transfer_id], Mtu::Fd, ts(0))
    };
    let long = |source: NodeId, transfer_id: u8| {
        remote_frames(&message_from(source, transfer_id), &pattern(100), Mtu::Fd, ts(0))
    };

    // B keeps accumulating while A and C come and go
    let b_frames = long(node_b, 0);
    link.deliver(&signal, single(node_a, 0));
    link.deliver(&signal, [b_frames[0]]);
    assert_eq!(node.poll(ts(1), &mut link).delivered, 1);
    link.deliver(&signal, single(node_c, 0));
    assert_eq!(node.poll(ts(2), &mut link).delivered, 1);

    // A's record was evicted for C, so its repeated transfer is new again
    link.deliver(&signal, single(node_a, 0));
    assert_eq!(node.poll(ts(3), &mut link).delivered, 1);
    assert_eq!(node.statistics().rx.duplicate, 0);

    // With A and B both accumulating there is no record to give up
    let a_frames = long(node_a, 1);
    link.deliver(&signal, [a_frames[0]]);
    assert_eq!(node.poll(ts(4), &mut link).rejected, 0);
    link.deliver(&signal, [long(node_c, 1)[0]]);
    assert_eq!(node.poll(ts(5), &mut link).rejected, 1);
    let statistics = node.statistics();
    assert_eq!(statistics.rx.out_of_memory, 1);
    assert_eq!(statistics.heap.oom_count, 0);
    assert_eq!(statistics.heap.live_blocks, 2);

    link.deliver(&signal, [a_frames[1], b_frames[1]]);
    assert_eq!(node.poll(ts(6), &mut link).delivered, 2);
    assert_eq!(node.statistics().heap.live_blocks, 0);
    assert_eq!(log.borrow().len(), 5);
}

#[test]
fn test_heap_exhaustion_drops_transfer() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 100, &mut handler);
    let signal = Signal::new();
    // Room for exactly two partial transfers of this extent
    let mut node = Node::<CriticalSectionRawMutex, 16, 16, 4>::new(
        Config::new(LOCAL, Mtu::Fd),
        &signal,
        ts(0),
    );
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    let frames = |source: u8, transfer_id: u8, payload: &[u8]| {
        let meta = message_from(NodeId::new(source).unwrap(), transfer_id);
        remote_frames(&meta, payload, Mtu::Fd, ts(0))
    };
    let a = frames(7, 0, &pattern(100));
    let b = frames(8, 0, &pattern(100));
    let c = frames(9, 0, &pattern(100));
    let c_retry = frames(9, 1, &[5]);

    link.deliver(&signal, [a[0], b[0], c[0], c[1], a[1]]);
    link.deliver(&signal, c_retry);
    let report = node.poll(ts(0), &mut link);
    assert_eq!(report.received, 6);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.rejected, 2);

    let statistics = node.statistics();
    assert_eq!(statistics.rx.out_of_memory, 1);
    assert_eq!(statistics.rx.out_of_sequence, 1);
    assert_eq!(statistics.heap.oom_count, 1);
    // B is still waiting for its last frame
    assert_eq!(statistics.heap.live_blocks, 1);

    let log = log.borrow();
    assert_eq!(log[0].1, pattern(100));
    assert_eq!(log[1].0.source, NodeId::new(9));
    assert_eq!(log[1].1[0], 5);
}

#[test]
fn test_single_frame_padding_delivered() {
    let log = Log::default();
    let mut handler = recorder(&log);
    let subscription = Subscription::message(SUBJECT, 256, &mut handler);
    let signal = Signal::new();
    let mut node = TestNode::new(Config::new(LOCAL, Mtu::Fd), &signal, ts(0));
    node.subscribe(&subscription).unwrap();
    let mut link = MockLink::default();

    // Eight bytes and the tail byte travel in a 12-byte frame
    let payload = pattern(8);
    let frames = remote_frames(&message(0), &payload, Mtu::Fd, ts(0));
    assert_eq!(frames[0].data.len(), 12);
    link.deliver(&signal, frames);
    assert_eq!(node.poll(ts(0), &mut link).delivered, 1);

    let log = log.borrow();
    let received = &log[0].1;
    assert_eq!(received.len(), 11);
    assert_eq!(&received[..8], &payload[..]);
    assert_eq!(&received[8..], &[0, 0, 0]);
}
