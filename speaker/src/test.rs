// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end speaker tests over the simulated channel network. Each test
//! builds one router with scripted test peers on the far side of its
//! channels, injects messages and checks what comes back out.

use crate::config::RouterConfig;
use crate::connection::{Channel, Poll};
use crate::connection_channel::{channel, ChannelConn, Endpoint};
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::messages::{
    Envelope, Message, RevokeMessage, UpdateMessage,
};
use crate::neighbor::Registry;
use crate::policy::Relationship;
use crate::router::{our_addr, Router};
use pretty_assertions::assert_eq;
use rib::test::logger;
use rib::{Db, Origin, Prefix4};
use std::net::Ipv4Addr;
use std::time::Duration;

/// The far side of one router channel: a scripted neighbor.
struct TestPeer {
    addr: Ipv4Addr,
    ep: Endpoint<Envelope>,
}

impl TestPeer {
    fn recv(&self) -> Option<Envelope> {
        self.ep.rx.try_recv().ok()
    }

    fn drain(&self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Some(env) = self.recv() {
            out.push(env);
        }
        out
    }
}

fn test_router(
    asn: u32,
    peers: &[(&str, Relationship)],
) -> (Router<ChannelConn>, Vec<TestPeer>) {
    let log = logger();
    let mut registry = Registry::default();
    let mut test_peers = Vec::new();
    for (addr, relationship) in peers {
        let addr: Ipv4Addr = addr.parse().unwrap();
        let (near, far) = channel();
        registry
            .add(addr, *relationship, ChannelConn::new(near))
            .unwrap();
        test_peers.push(TestPeer { addr, ep: far });
    }
    let router = Router::new(
        RouterConfig { asn },
        log.clone(),
        Db::new(log),
        registry,
    );
    (router, test_peers)
}

/// Deliver everything queued on one router's channel from `from`, as the
/// dispatcher would.
fn pump(router: &mut Router<ChannelConn>, from: Ipv4Addr) {
    loop {
        let poll = match router.registry.get(from) {
            Some(neighbor) => neighbor.conn.try_recv().unwrap(),
            None => return,
        };
        match poll {
            Poll::Message(env) => {
                router.handle_message(from, &env).unwrap()
            }
            _ => return,
        }
    }
}

fn update(
    peer: Ipv4Addr,
    network: &str,
    netmask: &str,
    localpref: u32,
    as_path: Vec<u32>,
    self_origin: bool,
) -> Envelope {
    Envelope {
        src: peer,
        dst: our_addr(peer),
        message: Message::Update(UpdateMessage {
            network: network.parse().unwrap(),
            netmask: netmask.parse().unwrap(),
            origin: Origin::Igp,
            localpref,
            as_path,
            self_origin,
        }),
    }
}

fn revoke(peer: Ipv4Addr, network: &str, netmask: &str) -> Envelope {
    Envelope {
        src: peer,
        dst: our_addr(peer),
        message: Message::Revoke(RevokeMessage {
            network: network.parse().unwrap(),
            netmask: netmask.parse().unwrap(),
        }),
    }
}

fn data(src: &str, dst: &str) -> Envelope {
    Envelope {
        src: src.parse().unwrap(),
        dst: dst.parse().unwrap(),
        message: Message::Data(serde_json::json!({"payload": "ping"})),
    }
}

fn dump(peer: Ipv4Addr) -> Envelope {
    Envelope {
        src: peer,
        dst: our_addr(peer),
        message: Message::Dump(serde_json::Value::Object(
            Default::default(),
        )),
    }
}

#[test]
fn update_propagation_follows_relationships() {
    let (mut router, peers) = test_router(
        7,
        &[
            ("172.16.0.2", Relationship::Customer),
            ("172.16.1.2", Relationship::Peer),
            ("172.16.2.2", Relationship::Customer),
            ("172.16.3.2", Relationship::Provider),
        ],
    );
    let (n1, n2, n3, n4) = (&peers[0], &peers[1], &peers[2], &peers[3]);

    // A customer-learned route is advertised to everyone else
    router
        .handle_message(
            n1.addr,
            &update(n1.addr, "192.168.1.0", "255.255.255.0", 100, vec![1], true),
        )
        .unwrap();
    assert!(n1.recv().is_none());
    for peer in [n2, n3, n4] {
        let env = peer.recv().expect("expected forwarded update");
        assert_eq!(env.dst, peer.addr);
        let Message::Update(fwd) = env.message else {
            panic!("expected update, got {}", env.message.title());
        };
        // our ASN prepended, self origin cleared
        assert_eq!(fwd.as_path, vec![7, 1]);
        assert!(!fwd.self_origin);
    }

    // A peer announces the same prefix with a higher local preference. It
    // becomes the best route, but only customers hear about it.
    router
        .handle_message(
            n2.addr,
            &update(n2.addr, "192.168.1.0", "255.255.255.0", 150, vec![2], false),
        )
        .unwrap();
    let prefix: Prefix4 = "192.168.1.0/24".parse().unwrap();
    assert_eq!(router.db.selected(prefix).unwrap().neighbor, n2.addr);
    assert_eq!(n1.drain().len(), 1);
    assert_eq!(n3.drain().len(), 1);
    assert!(n2.recv().is_none());
    assert!(n4.recv().is_none());
}

#[test]
fn nonbest_update_never_substitutes_anothers_route() {
    let (mut router, peers) = test_router(
        7,
        &[
            ("172.16.0.2", Relationship::Customer),
            ("172.16.1.2", Relationship::Peer),
            ("172.16.2.2", Relationship::Provider),
        ],
    );
    let (n_cust, n_peer, n_prov) = (&peers[0], &peers[1], &peers[2]);

    // the peer announces first and holds the best route
    router
        .handle_message(
            n_peer.addr,
            &update(n_peer.addr, "192.168.1.0", "255.255.255.0", 150, vec![2], false),
        )
        .unwrap();
    n_cust.drain();
    assert!(n_prov.recv().is_none());

    // a weaker customer announcement for the same prefix does not displace
    // the peer's route, and what fans out to the provider must be the
    // customer's own announcement, never the peer-learned best route
    router
        .handle_message(
            n_cust.addr,
            &update(n_cust.addr, "192.168.1.0", "255.255.255.0", 100, vec![1], false),
        )
        .unwrap();
    let prefix: Prefix4 = "192.168.1.0/24".parse().unwrap();
    assert_eq!(router.db.selected(prefix).unwrap().neighbor, n_peer.addr);

    let env = n_prov.recv().expect("customer announcement forwarded");
    let Message::Update(fwd) = env.message else {
        panic!("expected update, got {}", env.message.title());
    };
    assert_eq!(fwd.as_path, vec![7, 1]);
    let env = n_peer.recv().expect("customer announcement forwarded");
    let Message::Update(fwd) = env.message else {
        panic!("expected update, got {}", env.message.title());
    };
    assert_eq!(fwd.as_path, vec![7, 1]);
}

#[test]
fn data_forwarding_enforces_no_transit() {
    let (mut router, peers) = test_router(
        7,
        &[
            ("172.16.0.2", Relationship::Peer),
            ("172.16.1.2", Relationship::Customer),
            ("172.16.2.2", Relationship::Provider),
        ],
    );
    let (n_peer, n_cust, n_prov) = (&peers[0], &peers[1], &peers[2]);

    // best route to the destination is via the peer
    router
        .handle_message(
            n_peer.addr,
            &update(n_peer.addr, "192.168.1.0", "255.255.255.0", 100, vec![2], false),
        )
        .unwrap();
    n_cust.drain();

    // customer-sourced traffic transits the peer link
    let packet = data("10.9.9.9", "192.168.1.50");
    router.handle_message(n_cust.addr, &packet).unwrap();
    assert_eq!(n_peer.recv().expect("forwarded packet"), packet);

    // provider-sourced traffic toward a peer-learned route is refused
    router.handle_message(n_prov.addr, &packet).unwrap();
    assert!(n_peer.recv().is_none());
    let reply = n_prov.recv().expect("no route reply");
    assert_eq!(reply.message.title(), "no route");
    assert_eq!(reply.src, packet.dst);
    assert_eq!(reply.dst, packet.src);
}

#[test]
fn data_without_matching_prefix_gets_no_route() {
    let (mut router, peers) =
        test_router(7, &[("172.16.0.2", Relationship::Customer)]);
    let n1 = &peers[0];

    let packet = data("10.9.9.9", "203.0.113.77");
    router.handle_message(n1.addr, &packet).unwrap();
    let reply = n1.recv().expect("no route reply");
    assert_eq!(reply.message.title(), "no route");
    assert_eq!(reply.src, packet.dst);
    assert_eq!(reply.dst, packet.src);
}

#[test]
fn aggregation_is_local_to_the_table() {
    let (mut router, peers) = test_router(
        7,
        &[
            ("172.16.0.2", Relationship::Customer),
            ("172.16.1.2", Relationship::Customer),
        ],
    );
    let (n1, n2) = (&peers[0], &peers[1]);

    router
        .handle_message(
            n1.addr,
            &update(n1.addr, "10.0.0.0", "255.255.255.0", 100, vec![1], true),
        )
        .unwrap();
    let first = n2.recv().expect("first advertisement");
    let Message::Update(first) = first.message else {
        panic!("expected update");
    };
    assert_eq!(
        first.netmask,
        "255.255.255.0".parse::<Ipv4Addr>().unwrap()
    );

    // the second constituent coalesces in the table, but the advertisement
    // carries the prefix exactly as announced so the recipient can match a
    // later revoke against it
    router
        .handle_message(
            n1.addr,
            &update(n1.addr, "10.0.1.0", "255.255.255.0", 100, vec![1], true),
        )
        .unwrap();
    let second = n2.recv().expect("second advertisement");
    let Message::Update(second) = second.message else {
        panic!("expected update");
    };
    assert_eq!(
        second.network,
        "10.0.1.0".parse::<Ipv4Addr>().unwrap()
    );
    assert_eq!(
        second.netmask,
        "255.255.255.0".parse::<Ipv4Addr>().unwrap()
    );

    // the dump shows the single aggregated entry
    router.handle_message(n2.addr, &dump(n2.addr)).unwrap();
    let reply = n2.recv().expect("table reply");
    let Message::Table(entries) = reply.message else {
        panic!("expected table");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].network, "10.0.0.0".parse::<Ipv4Addr>().unwrap());
    assert_eq!(
        entries[0].netmask,
        "255.255.254.0".parse::<Ipv4Addr>().unwrap()
    );
    assert_eq!(entries[0].peer, n1.addr);

    // revoking one constituent restores the other in the table
    router
        .handle_message(n1.addr, &revoke(n1.addr, "10.0.1.0", "255.255.255.0"))
        .unwrap();
    let fwd = n2.recv().expect("forwarded revoke");
    assert_eq!(fwd.message.title(), "revoke");

    router.handle_message(n2.addr, &dump(n2.addr)).unwrap();
    let reply = n2.recv().expect("table reply");
    let Message::Table(entries) = reply.message else {
        panic!("expected table");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].netmask,
        "255.255.255.0".parse::<Ipv4Addr>().unwrap()
    );
}

#[test]
fn constituent_revoke_converges_downstream() {
    // one real speaker behind another: n1 -> a -> b, all customer links
    let addr_n1: Ipv4Addr = "172.16.0.2".parse().unwrap();
    let addr_b: Ipv4Addr = "172.16.5.2".parse().unwrap();
    let addr_a = our_addr(addr_b);

    let log = logger();
    let (n1_near, n1_far) = channel();
    let (a_side, b_side) = channel();

    let mut reg_a = Registry::default();
    reg_a
        .add(addr_n1, Relationship::Customer, ChannelConn::new(n1_near))
        .unwrap();
    reg_a
        .add(addr_b, Relationship::Customer, ChannelConn::new(a_side))
        .unwrap();
    let mut a = Router::new(
        RouterConfig { asn: 7 },
        log.clone(),
        Db::new(log.clone()),
        reg_a,
    );

    let mut reg_b = Registry::default();
    reg_b
        .add(addr_a, Relationship::Customer, ChannelConn::new(b_side))
        .unwrap();
    let mut b = Router::new(
        RouterConfig { asn: 8 },
        log.clone(),
        Db::new(log),
        reg_b,
    );

    let n1 = TestPeer {
        addr: addr_n1,
        ep: n1_far,
    };

    a.handle_message(
        n1.addr,
        &update(n1.addr, "10.0.0.0", "255.255.255.0", 100, vec![1], true),
    )
    .unwrap();
    a.handle_message(
        n1.addr,
        &update(n1.addr, "10.0.1.0", "255.255.255.0", 100, vec![1], true),
    )
    .unwrap();
    pump(&mut b, addr_a);

    // b coalesced the pair in its own table and routes into both halves
    assert_eq!(b.db.snapshot().len(), 1);
    assert!(b.db.lookup("10.0.1.50".parse().unwrap()).is_some());

    // the withdrawal names the prefix b was actually sent, so b can match
    // it against its candidates and disaggregate
    a.handle_message(
        n1.addr,
        &revoke(n1.addr, "10.0.1.0", "255.255.255.0"),
    )
    .unwrap();
    pump(&mut b, addr_a);
    assert!(b.db.lookup("10.0.1.50".parse().unwrap()).is_none());
    assert!(b.db.lookup("10.0.0.50".parse().unwrap()).is_some());
}

#[test]
fn unknown_neighbor_is_rejected() {
    let (mut router, _peers) =
        test_router(7, &[("172.16.0.2", Relationship::Customer)]);
    let stranger: Ipv4Addr = "203.0.113.99".parse().unwrap();
    let result = router.handle_message(
        stranger,
        &update(stranger, "10.0.0.0", "255.255.255.0", 100, vec![9], false),
    );
    assert!(matches!(result, Err(Error::UnknownNeighbor(a)) if a == stranger));
    assert!(router.db.is_empty());
}

#[test]
fn neighbor_down_withdraws_and_propagates() {
    let (mut router, peers) = test_router(
        7,
        &[
            ("172.16.0.2", Relationship::Customer),
            ("172.16.1.2", Relationship::Peer),
        ],
    );
    let (n1, n2) = (&peers[0], &peers[1]);

    router
        .handle_message(
            n1.addr,
            &update(n1.addr, "10.0.0.0", "255.255.255.0", 100, vec![1], true),
        )
        .unwrap();
    router
        .handle_message(
            n1.addr,
            &update(n1.addr, "172.30.0.0", "255.255.0.0", 100, vec![1], true),
        )
        .unwrap();
    n2.drain();

    router.neighbor_down(n1.addr);
    assert!(router.db.is_empty());
    assert!(router.registry.get(n1.addr).is_none());

    let revokes = n2.drain();
    assert_eq!(revokes.len(), 2);
    for env in revokes {
        assert_eq!(env.message.title(), "revoke");
    }
}

#[test]
fn revoke_of_unheld_prefix_is_not_propagated() {
    let (mut router, peers) = test_router(
        7,
        &[
            ("172.16.0.2", Relationship::Customer),
            ("172.16.1.2", Relationship::Customer),
        ],
    );
    let (n1, n2) = (&peers[0], &peers[1]);

    router
        .handle_message(n1.addr, &revoke(n1.addr, "10.0.0.0", "255.255.255.0"))
        .unwrap();
    assert!(n2.recv().is_none());
    // the revoke is still recorded in the log
    assert_eq!(router.db.update_log().len(), 1);
}

#[test]
fn dispatcher_runs_until_neighbors_leave() {
    let (router, peers) = test_router(
        7,
        &[
            ("172.16.0.2", Relationship::Customer),
            ("172.16.1.2", Relationship::Customer),
        ],
    );
    let mut dispatcher = Dispatcher::new(router, logger());
    let handle = std::thread::spawn(move || dispatcher.run());

    let n1 = &peers[0];
    let n2 = &peers[1];
    n1.ep
        .tx
        .send(update(n1.addr, "10.0.0.0", "255.255.255.0", 100, vec![1], true))
        .unwrap();

    let fwd = n2
        .ep
        .rx
        .recv_timeout(Duration::from_secs(5))
        .expect("forwarded update");
    assert_eq!(fwd.message.title(), "update");

    // dropping both peers closes the channels, the loop withdraws
    // everything and exits
    drop(peers);
    handle.join().expect("dispatcher exits cleanly");
}
