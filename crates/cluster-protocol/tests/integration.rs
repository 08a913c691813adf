//! Integration tests for the cluster-protocol crate.
//!
//! These exercise the public API the way a sender and a receiver would use
//! it together: shared timings, the heartbeat body codec, and TTL scopes.

use std::sync::Arc;
use std::thread;

use cluster_protocol::payload::{decode_heartbeat, encode_heartbeat, HeartbeatBody};
use cluster_protocol::scope::MulticastScope;
use cluster_protocol::timing::HeartbeatTimings;
use cluster_protocol::{
    DEFAULT_HEARTBEAT_INTERVAL_MS, MAX_DATAGRAM_SIZE, MINIMUM_HEARTBEAT_INTERVAL_MS,
};

// ---------------------------------------------------------------------------
// 1. Shared timings
// ---------------------------------------------------------------------------

#[test]
fn timings_shared_between_holders() {
    let timings = Arc::new(HeartbeatTimings::new());
    let other = Arc::clone(&timings);

    other.set_interval_ms(2000);
    assert_eq!(timings.interval_ms(), 2000);
    assert_eq!(timings.stale_time_ms(), 4100);
}

#[test]
fn timings_independent_instances_do_not_interfere() {
    let a = HeartbeatTimings::new();
    let b = HeartbeatTimings::new();

    a.set_interval_ms(1500);
    b.set_stale_time_ms(42);

    assert_eq!(a.interval_ms(), 1500);
    assert_eq!(a.stale_time_ms(), 3100);
    assert_eq!(b.interval_ms(), DEFAULT_HEARTBEAT_INTERVAL_MS);
    assert_eq!(b.stale_time_ms(), 42);
}

#[test]
fn timings_concurrent_writers_leave_a_valid_value() {
    let timings = Arc::new(HeartbeatTimings::new());

    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let timings = Arc::clone(&timings);
            thread::spawn(move || {
                for j in 0..100u64 {
                    timings.set_interval_ms(i * 400 + j);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Whoever wrote last, the floor holds
    assert!(timings.interval_ms() >= MINIMUM_HEARTBEAT_INTERVAL_MS);
}

// ---------------------------------------------------------------------------
// 2. Heartbeat body
// ---------------------------------------------------------------------------

#[test]
fn heartbeat_body_fits_one_datagram() {
    let url = format!("//node-{}.cluster.internal:40001/eventbus", "x".repeat(200));
    let body = encode_heartbeat(&url).unwrap();
    assert!(body.len() < MAX_DATAGRAM_SIZE);
    assert_eq!(decode_heartbeat(&body).unwrap().url(), Some(url.as_str()));
}

#[test]
fn heartbeat_body_is_deterministic() {
    let a = encode_heartbeat("peer-A").unwrap();
    let b = encode_heartbeat("peer-A").unwrap();
    assert_eq!(a, b);
}

#[test]
fn heartbeat_unknown_address() {
    let body = encode_heartbeat("").unwrap();
    assert_eq!(decode_heartbeat(&body), Some(HeartbeatBody::Unknown));
}

#[test]
fn heartbeat_truncated_body_rejected() {
    let body = encode_heartbeat("//10.0.0.5:40001/eventbus").unwrap();
    assert!(decode_heartbeat(&body[..body.len() / 2]).is_none());
}

// ---------------------------------------------------------------------------
// 3. TTL scope
// ---------------------------------------------------------------------------

#[test]
fn scope_ordering_widens_with_ttl() {
    let mut last = MulticastScope::Host;
    for ttl in 0..=255u8 {
        let scope = MulticastScope::from_ttl(ttl);
        assert!(scope >= last, "ttl {} narrowed scope", ttl);
        last = scope;
    }
    assert_eq!(last, MulticastScope::Unrestricted);
}

#[test]
fn scope_display() {
    assert_eq!(MulticastScope::Subnet.to_string(), "subnet");
    assert_eq!(MulticastScope::from_ttl(64).to_string(), "region");
}
