#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::extract::ws::Message;
use bytes::Bytes;
use tokio::sync::mpsc;

use botrelay_gateway::realtime::{ClientRegistry, Connection, Frame};
use botrelay_gateway::upstream::FrameSink;

fn client(reg: &ClientRegistry, depth: usize) -> (u64, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(depth);
    (reg.add(Connection { tx }), rx)
}

fn text(rx: &mut mpsc::Receiver<Message>) -> Option<String> {
    match rx.try_recv().ok()? {
        Message::Text(s) => Some(s),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn broadcast_delivers_once_to_each_member() {
    let reg = ClientRegistry::new();
    let mut rxs: Vec<_> = (0..5).map(|_| client(&reg, 8).1).collect();

    let raw = r#"{"type":"event","data":{"battery":87}}"#;
    assert_eq!(reg.broadcast(&Frame::Text(raw.to_string())), 5);

    for rx in &mut rxs {
        assert_eq!(text(rx).as_deref(), Some(raw));
        assert!(rx.try_recv().is_err(), "exactly one delivery");
    }
}

#[tokio::test]
async fn late_joiner_gets_nothing_retroactively() {
    let reg = ClientRegistry::new();
    let (_, mut early) = client(&reg, 8);

    reg.broadcast(&Frame::Text("before".into()));
    let (_, mut late) = client(&reg, 8);
    reg.broadcast(&Frame::Text("after".into()));

    assert_eq!(text(&mut early).as_deref(), Some("before"));
    assert_eq!(text(&mut early).as_deref(), Some("after"));
    assert_eq!(text(&mut late).as_deref(), Some("after"));
    assert!(late.try_recv().is_err());
}

#[tokio::test]
async fn closed_member_is_evicted_without_error() {
    let reg = ClientRegistry::new();
    let (_, mut a) = client(&reg, 8);
    let (gone_id, gone) = client(&reg, 8);
    let (_, mut c) = client(&reg, 8);
    drop(gone);

    assert_eq!(reg.broadcast(&Frame::Text("x".into())), 2);
    assert!(!reg.contains(gone_id));
    assert_eq!(reg.len(), 2);
    assert_eq!(text(&mut a).as_deref(), Some("x"));
    assert_eq!(text(&mut c).as_deref(), Some("x"));

    // next broadcast no longer sees it
    assert_eq!(reg.broadcast(&Frame::Text("y".into())), 2);
}

#[tokio::test]
async fn full_queue_does_not_block_others() {
    let reg = ClientRegistry::new();
    let (slow_id, mut slow) = client(&reg, 1);
    let (_, mut fast) = client(&reg, 8);

    assert_eq!(reg.broadcast(&Frame::Text("1".into())), 2);
    // slow queue is now full: dropped for it, delivered to the other
    assert_eq!(reg.broadcast(&Frame::Text("2".into())), 1);

    assert!(reg.contains(slow_id), "full is not gone");
    assert_eq!(text(&mut slow).as_deref(), Some("1"));
    assert!(slow.try_recv().is_err());
    assert_eq!(text(&mut fast).as_deref(), Some("1"));
    assert_eq!(text(&mut fast).as_deref(), Some("2"));
}

#[tokio::test]
async fn remove_is_idempotent() {
    let reg = ClientRegistry::new();
    let (id, _rx) = client(&reg, 1);

    assert!(reg.remove(id).is_some());
    assert!(reg.remove(id).is_none());
    assert!(reg.remove(9999).is_none());
    assert!(reg.is_empty());
}

#[tokio::test]
async fn default_and_new_hand_out_the_same_ids() {
    let a = ClientRegistry::new();
    let b = ClientRegistry::default();
    let (id_a, _rx_a) = client(&a, 1);
    let (id_b, _rx_b) = client(&b, 1);

    assert_eq!(id_a, id_b);
    assert_ne!(id_a, 0);
}

#[tokio::test]
async fn binary_frames_pass_through_unmodified() {
    let reg = ClientRegistry::new();
    let (_, mut rx) = client(&reg, 1);

    reg.deliver(Frame::Binary(Bytes::from_static(&[0x01, 0xff, 0x00])));
    match rx.try_recv().unwrap() {
        Message::Binary(b) => assert_eq!(b, vec![0x01, 0xff, 0x00]),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_membership_changes_during_broadcast() {
    let reg = std::sync::Arc::new(ClientRegistry::new());
    let mut keep = Vec::new();
    for _ in 0..50 {
        keep.push(client(&reg, 1024));
    }

    let churn = {
        let reg = reg.clone();
        tokio::spawn(async move {
            for _ in 0..500 {
                let (tx, rx) = mpsc::channel(1);
                let id = reg.add(Connection { tx });
                drop(rx);
                reg.remove(id);
                tokio::task::yield_now().await;
            }
        })
    };

    for i in 0..200 {
        reg.broadcast(&Frame::Text(i.to_string()));
        tokio::task::yield_now().await;
    }
    churn.await.unwrap();

    for (_, rx) in &mut keep {
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        assert_eq!(n, 200);
    }
}
