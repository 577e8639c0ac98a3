// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::connection::Channel;
use crate::error::Error;
use crate::policy::Relationship;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// One peering: a neighbor's link address, the commercial relationship with
/// it and the channel its messages travel over. Immutable after
/// registration; removed only when the channel fails.
pub struct Neighbor<Cnx: Channel> {
    pub addr: Ipv4Addr,
    pub relationship: Relationship,
    pub conn: Cnx,
}

/// The neighbor registry. Keeps an addr-keyed map for lookups plus the
/// registration order, which the dispatcher uses as its fixed polling
/// order. The channel handle and the address are associated only here, at
/// add/remove time, so per-message channel-to-identity scans are never
/// needed.
pub struct Registry<Cnx: Channel> {
    neighbors: BTreeMap<Ipv4Addr, Neighbor<Cnx>>,
    order: Vec<Ipv4Addr>,
}

impl<Cnx: Channel> Default for Registry<Cnx> {
    fn default() -> Self {
        Self {
            neighbors: BTreeMap::new(),
            order: Vec::new(),
        }
    }
}

impl<Cnx: Channel> Registry<Cnx> {
    pub fn add(
        &mut self,
        addr: Ipv4Addr,
        relationship: Relationship,
        conn: Cnx,
    ) -> Result<(), Error> {
        if self.neighbors.contains_key(&addr) {
            return Err(Error::NeighborExists(addr));
        }
        self.neighbors.insert(
            addr,
            Neighbor {
                addr,
                relationship,
                conn,
            },
        );
        self.order.push(addr);
        Ok(())
    }

    pub fn remove(&mut self, addr: Ipv4Addr) -> Option<Neighbor<Cnx>> {
        self.order.retain(|a| *a != addr);
        self.neighbors.remove(&addr)
    }

    pub fn get(&self, addr: Ipv4Addr) -> Option<&Neighbor<Cnx>> {
        self.neighbors.get(&addr)
    }

    pub fn relationship(&self, addr: Ipv4Addr) -> Option<Relationship> {
        self.neighbors.get(&addr).map(|n| n.relationship)
    }

    /// Neighbor addresses in registration order.
    pub fn polling_order(&self) -> Vec<Ipv4Addr> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neighbor<Cnx>> {
        self.neighbors.values()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}
