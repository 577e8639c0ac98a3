// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::policy::Relationship;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// One neighbor as named on the command line: `<addr>-<cust|peer|prov>`.
/// The address doubles as the name of the channel endpoint to open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct NeighborSpec {
    pub addr: Ipv4Addr,
    pub relationship: Relationship,
}

impl FromStr for NeighborSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, relationship) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidNeighborSpec(s.to_string()))?;
        Ok(Self {
            addr: addr
                .parse()
                .map_err(|_| Error::InvalidNeighborSpec(s.to_string()))?,
            relationship: relationship
                .parse()
                .map_err(|_| Error::InvalidNeighborSpec(s.to_string()))?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// The autonomous system number this speaker represents.
    pub asn: u32,
}
