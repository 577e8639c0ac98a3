// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The routing information base (rib).
//!
//! The database holds three views of routing state. The update log is an
//! append-only record of every accepted update and revoke. `rib_in` is the
//! active candidate index derived from the log: one route per announcing
//! neighbor per prefix, where a later update from a neighbor supersedes its
//! earlier one and a revoke retires it. `rib_loc` is the selected table,
//! rebuilt after every mutation by running bestpath over each announced
//! prefix and then coalescing adjacent equivalent prefixes, so it is never
//! stale relative to the log.

use crate::bestpath::bestpath;
use crate::coalesce::coalesce;
use crate::error::Error;
use crate::log::rib_log;
use crate::types::*;
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Active candidate routes, indexed by prefix and then announcing neighbor.
pub type RibIn = BTreeMap<Prefix4, BTreeMap<Ipv4Addr, Route>>;

/// The selected (and possibly coalesced) table, one route per prefix.
pub type RibLoc = BTreeMap<Prefix4, Route>;

/// What a log entry records: an announcement with attributes, or a
/// withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub enum LogKind {
    Update(RouteAttrs),
    Revoke,
}

/// One accepted message, as recorded in the append-only update log.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LogEntry {
    pub neighbor: Ipv4Addr,
    pub prefix: Prefix4,
    pub kind: LogKind,
    pub seq: u64,
}

/// The central routing information base. All route state for one speaker is
/// managed through this structure. Mutation happens on a single thread, so
/// no interior locking is carried.
pub struct Db {
    /// Append-only record of every accepted update and revoke.
    updates: Vec<LogEntry>,

    /// Active candidates per prefix, kept equivalent to a replay of the
    /// update log.
    rib_in: RibIn,

    /// Selected routes, bestpath plus coalesce over `rib_in`.
    rib_loc: RibLoc,

    log: Logger,
}

impl Db {
    pub fn new(log: Logger) -> Self {
        Self {
            updates: Vec::new(),
            rib_in: RibIn::new(),
            rib_loc: RibLoc::new(),
            log,
        }
    }

    /// Record an announcement from `neighbor` for `prefix`, replacing any
    /// earlier announcement from the same neighbor, and return the route now
    /// selected for that prefix.
    pub fn apply_update(
        &mut self,
        neighbor: Ipv4Addr,
        prefix: Prefix4,
        attrs: RouteAttrs,
    ) -> Result<Route, Error> {
        let seq = self.append(neighbor, prefix, LogKind::Update(attrs.clone()));
        let route = Route {
            neighbor,
            attrs,
            seq,
        };
        self.rib_in.entry(prefix).or_default().insert(neighbor, route);
        self.rebuild();

        // A prefix with at least one active candidate always selects a
        // route; anything else is a bestpath defect, not a no-route outcome.
        bestpath(prefix, &self.rib_in).ok_or_else(|| {
            Error::Internal(format!(
                "no route selected for announced prefix {prefix}"
            ))
        })
    }

    /// Record a withdrawal from `neighbor` for `prefix`. Returns true when
    /// the active candidate set changed. Revoking an announcement the
    /// neighbor does not hold is a table no-op, though it is still logged.
    pub fn apply_revoke(
        &mut self,
        neighbor: Ipv4Addr,
        prefix: Prefix4,
    ) -> bool {
        self.append(neighbor, prefix, LogKind::Revoke);
        let changed = match self.rib_in.get_mut(&prefix) {
            Some(candidates) => candidates.remove(&neighbor).is_some(),
            None => false,
        };
        if changed {
            if self
                .rib_in
                .get(&prefix)
                .map(|c| c.is_empty())
                .unwrap_or(false)
            {
                self.rib_in.remove(&prefix);
            }
            self.rebuild();
        } else {
            rib_log!(
                self,
                debug,
                "revoke from {neighbor} for unheld prefix {prefix}"
            );
        }
        changed
    }

    /// Withdraw every active announcement from `neighbor`, as if a revoke
    /// had arrived for each. Used for neighbor-down handling. Returns the
    /// withdrawn prefixes.
    pub fn withdraw_all(&mut self, neighbor: Ipv4Addr) -> Vec<Prefix4> {
        let held: Vec<Prefix4> = self
            .rib_in
            .iter()
            .filter(|(_, candidates)| candidates.contains_key(&neighbor))
            .map(|(prefix, _)| *prefix)
            .collect();

        for prefix in &held {
            self.append(neighbor, *prefix, LogKind::Revoke);
            if let Some(candidates) = self.rib_in.get_mut(prefix) {
                candidates.remove(&neighbor);
                if candidates.is_empty() {
                    self.rib_in.remove(prefix);
                }
            }
        }
        if !held.is_empty() {
            self.rebuild();
        }
        rib_log!(
            self,
            info,
            "withdrew {} prefixes for downed neighbor {neighbor}",
            held.len()
        );
        held
    }

    /// The active announcement set for a prefix.
    pub fn candidates(&self, prefix: Prefix4) -> Vec<Route> {
        self.rib_in
            .get(&prefix)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// The currently selected route for an exact prefix in the selected
    /// table.
    pub fn selected(&self, prefix: Prefix4) -> Option<&Route> {
        self.rib_loc.get(&prefix)
    }

    /// Longest-prefix match of a destination address against the selected
    /// table.
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<(Prefix4, &Route)> {
        for length in (0..=Prefix4::MAX_LENGTH).rev() {
            let p = Prefix4::new(addr, length);
            if let Some(route) = self.rib_loc.get(&p) {
                return Some((p, route));
            }
        }
        None
    }

    /// The full selected table in prefix order, for dump responses.
    pub fn snapshot(&self) -> Vec<(Prefix4, Route)> {
        self.rib_loc
            .iter()
            .map(|(prefix, route)| (*prefix, route.clone()))
            .collect()
    }

    /// The append-only update log.
    pub fn update_log(&self) -> &[LogEntry] {
        &self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.rib_loc.is_empty()
    }

    fn append(
        &mut self,
        neighbor: Ipv4Addr,
        prefix: Prefix4,
        kind: LogKind,
    ) -> u64 {
        let seq = self.updates.len() as u64;
        self.updates.push(LogEntry {
            neighbor,
            prefix,
            kind,
            seq,
        });
        seq
    }

    /// Recompute the selected table from the candidate index: bestpath per
    /// announced prefix, then coalesce to fixed point. Rebuilding from the
    /// un-aggregated candidates is what makes coalescing reversible.
    fn rebuild(&mut self) {
        let mut loc = RibLoc::new();
        for prefix in self.rib_in.keys() {
            if let Some(route) = bestpath(*prefix, &self.rib_in) {
                loc.insert(*prefix, route);
            }
        }
        coalesce(&mut loc);
        rib_log!(
            self,
            trace,
            "rebuilt selected table: {} candidates, {} selected",
            self.rib_in.len(),
            loc.len()
        );
        self.rib_loc = loc;
    }
}
