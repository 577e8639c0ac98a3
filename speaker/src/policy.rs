// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commercial relationship export policy.
//!
//! A speaker sells transit to its customers and buys it from its providers.
//! Routes learned from a customer are advertised to everyone. Routes
//! learned from a peer or a provider are advertised only to customers,
//! never to other peers or providers (the no-transit rule). The same
//! predicate gates data forwarding.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Formatter};
use std::str::FromStr;

/// The commercial relationship with a neighbor, fixed at startup.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum Relationship {
    Customer,
    Peer,
    Provider,
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cust" | "customer" => Ok(Self::Customer),
            "peer" => Ok(Self::Peer),
            "prov" | "provider" => Ok(Self::Provider),
            _ => Err(format!(
                "unknown relationship '{s}', must be cust, peer or prov"
            )),
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "cust"),
            Self::Peer => write!(f, "peer"),
            Self::Provider => write!(f, "prov"),
        }
    }
}

/// Whether a route learned from a neighbor with relationship `learned_from`
/// may be advertised (or a packet forwarded) toward a neighbor with
/// relationship `to`.
pub fn may_advertise(learned_from: Relationship, to: Relationship) -> bool {
    learned_from == Relationship::Customer || to == Relationship::Customer
}
