// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The propagation controller. One `Router` is one autonomous system
//! speaker: it applies inbound updates and revokes to the routing
//! database, answers dump and data messages, and drives re-advertisement
//! to eligible neighbors under the relationship export policy. It holds no
//! state of its own between messages beyond the database and registry it
//! owns.

use crate::config::RouterConfig;
use crate::connection::Channel;
use crate::error::Error;
use crate::log::router_log;
use crate::messages::{
    Envelope, Message, RevokeMessage, TableEntry, UpdateMessage,
};
use crate::neighbor::Registry;
use crate::policy::{may_advertise, Relationship};
use rib::{Db, Prefix4};
use slog::Logger;
use std::net::Ipv4Addr;

pub struct Router<Cnx: Channel> {
    /// The routing database this speaker updates in response to update and
    /// revoke messages, and reads to forward data and answer dumps.
    pub db: Db,

    /// The static configuration associated with this router.
    pub config: RouterConfig,

    /// The neighbors this speaker exchanges messages with.
    pub registry: Registry<Cnx>,

    /// The logger used by this router.
    log: Logger,
}

impl<Cnx: Channel> Router<Cnx> {
    pub fn new(
        config: RouterConfig,
        log: Logger,
        db: Db,
        registry: Registry<Cnx>,
    ) -> Self {
        Self {
            db,
            config,
            registry,
            log,
        }
    }

    /// Apply one inbound message received on the channel registered for
    /// `srcif`. Errors bubble up to the dispatcher, which answers the
    /// sender; the loop itself never stops for a bad message.
    pub fn handle_message(
        &mut self,
        srcif: Ipv4Addr,
        env: &Envelope,
    ) -> Result<(), Error> {
        let src_rel = self
            .registry
            .relationship(srcif)
            .ok_or(Error::UnknownNeighbor(srcif))?;

        match &env.message {
            Message::Update(update) => {
                self.handle_update(srcif, src_rel, update)
            }
            Message::Revoke(revoke) => {
                self.handle_revoke(srcif, src_rel, revoke)
            }
            Message::Data(_) => self.handle_data(srcif, src_rel, env),
            Message::Dump(_) => self.handle_dump(srcif, env),
            Message::Table(_) | Message::NoRoute(_) => {
                // Responses carry no action for us
                router_log!(
                    self,
                    debug,
                    "ignoring {} message from {srcif}",
                    env.message.title()
                );
                Ok(())
            }
        }
    }

    /// A neighbor's channel failed. Remove it and withdraw everything it
    /// had announced, as if a revoke had arrived for each prefix, and
    /// propagate those withdrawals to the neighbors that were eligible to
    /// hear about the routes.
    pub fn neighbor_down(&mut self, addr: Ipv4Addr) {
        let Some(neighbor) = self.registry.remove(addr) else {
            return;
        };
        router_log!(
            self,
            info,
            "neighbor {addr} ({}) down",
            neighbor.relationship
        );
        let withdrawn = self.db.withdraw_all(addr);
        for prefix in withdrawn {
            self.fanout_revoke(addr, neighbor.relationship, prefix);
        }
    }

    fn handle_update(
        &mut self,
        srcif: Ipv4Addr,
        src_rel: Relationship,
        update: &UpdateMessage,
    ) -> Result<(), Error> {
        let prefix = update.prefix()?;
        let best = self.db.apply_update(srcif, prefix, update.attrs())?;
        router_log!(
            self,
            info,
            "update from {srcif}: {prefix}, best via {}",
            best.neighbor;
            "prefix" => format!("{prefix}"),
            "localpref" => update.localpref
        );

        // Forward the announcement as received. The export gate below is the
        // announcing neighbor's relationship, so only what that neighbor
        // sent may travel onward; the selected route for the prefix can be
        // someone else's and is never substituted here. Aggregation stays a
        // local table optimization and does not change what is advertised.
        let adv = update.forwarded(self.config.asn);

        for neighbor in self.registry.iter() {
            if neighbor.addr == srcif
                || !may_advertise(src_rel, neighbor.relationship)
            {
                continue;
            }
            self.fanout_send(Envelope {
                src: our_addr(neighbor.addr),
                dst: neighbor.addr,
                message: Message::Update(adv.clone()),
            });
        }
        Ok(())
    }

    fn handle_revoke(
        &mut self,
        srcif: Ipv4Addr,
        src_rel: Relationship,
        revoke: &RevokeMessage,
    ) -> Result<(), Error> {
        let prefix = revoke.prefix()?;
        let changed = self.db.apply_revoke(srcif, prefix);
        router_log!(
            self,
            info,
            "revoke from {srcif}: {prefix} (held: {changed})";
            "prefix" => format!("{prefix}")
        );
        // Only neighbors eligible under the export policy ever received the
        // route, so only they get the withdrawal
        if changed {
            self.fanout_revoke(srcif, src_rel, prefix);
        }
        Ok(())
    }

    fn handle_data(
        &mut self,
        srcif: Ipv4Addr,
        src_rel: Relationship,
        env: &Envelope,
    ) -> Result<(), Error> {
        let Some((prefix, route)) = self.db.lookup(env.dst) else {
            router_log!(self, debug, "no route for data to {}", env.dst);
            self.reply(srcif, env.no_route());
            return Ok(());
        };

        // The no-transit rule applies to forwarding exactly as it does to
        // advertisement: traffic between two non-customers is refused.
        let route_rel = self
            .registry
            .relationship(route.neighbor)
            .ok_or(Error::UnknownNeighbor(route.neighbor))?;
        if !may_advertise(src_rel, route_rel) {
            router_log!(
                self,
                debug,
                "refusing transit for data to {} ({src_rel} -> {route_rel})",
                env.dst
            );
            self.reply(srcif, env.no_route());
            return Ok(());
        }

        router_log!(
            self,
            debug,
            "forwarding data to {} via {} ({prefix})",
            env.dst,
            route.neighbor
        );
        let nexthop = route.neighbor;
        self.reply(nexthop, env.clone());
        Ok(())
    }

    fn handle_dump(
        &mut self,
        srcif: Ipv4Addr,
        env: &Envelope,
    ) -> Result<(), Error> {
        let entries: Vec<TableEntry> =
            self.db.snapshot().into_iter().map(TableEntry::from).collect();
        router_log!(
            self,
            info,
            "dump from {srcif}: {} table entries",
            entries.len()
        );
        self.reply(
            srcif,
            Envelope {
                src: env.dst,
                dst: env.src,
                message: Message::Table(entries),
            },
        );
        Ok(())
    }

    /// Send a revoke for `prefix` to every neighbor other than `origin`
    /// that was eligible to receive the route under the export policy.
    fn fanout_revoke(
        &self,
        origin: Ipv4Addr,
        learned_rel: Relationship,
        prefix: Prefix4,
    ) {
        for neighbor in self.registry.iter() {
            if neighbor.addr == origin
                || !may_advertise(learned_rel, neighbor.relationship)
            {
                continue;
            }
            self.fanout_send(Envelope {
                src: our_addr(neighbor.addr),
                dst: neighbor.addr,
                message: Message::Revoke(prefix.into()),
            });
        }
    }

    fn fanout_send(&self, env: Envelope) {
        let Some(neighbor) = self.registry.get(env.dst) else {
            return;
        };
        if let Err(e) = neighbor.conn.send(&env) {
            router_log!(self, error, "egress fanout failed: {e}");
        }
    }

    /// Send a message out the channel registered for `addr`, logging send
    /// failures rather than surfacing them; channel death is detected and
    /// handled on the receive path.
    fn reply(&self, addr: Ipv4Addr, env: Envelope) {
        let Some(neighbor) = self.registry.get(addr) else {
            return;
        };
        if let Err(e) = neighbor.conn.send(&env) {
            router_log!(self, error, "send to {addr} failed: {e}");
        }
    }
}

/// Our link address toward a neighbor: the neighbor's address with the
/// final octet replaced by one.
pub fn our_addr(neighbor: Ipv4Addr) -> Ipv4Addr {
    let o = neighbor.octets();
    Ipv4Addr::new(o[0], o[1], o[2], 1)
}
