// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 CIDR prefix. Host bits are always zero.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, Eq, Hash, PartialEq, JsonSchema,
)]
pub struct Prefix4 {
    pub value: Ipv4Addr,
    pub length: u8,
}

impl PartialOrd for Prefix4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Prefix4 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

impl Prefix4 {
    pub const MAX_LENGTH: u8 = 32;

    /// Create a new `Prefix4` from an IP address and prefix length.
    /// The newly created `Prefix4` will have its host bits zeroed upon
    /// creation e.g.
    /// ```
    /// use rib::types::Prefix4;
    /// use std::net::Ipv4Addr;
    /// use std::str::FromStr;
    /// let p4 = Prefix4::new(Ipv4Addr::from_str("10.0.0.10").unwrap(), 24);
    /// assert_eq!(p4.value, Ipv4Addr::from_str("10.0.0.0").unwrap());
    /// ```
    pub fn new(ip: Ipv4Addr, length: u8) -> Self {
        let mut new = Self { value: ip, length };
        new.unset_host_bits();
        new
    }

    /// Create a `Prefix4` from the wire representation used by update and
    /// revoke messages: a network address plus a dotted-quad netmask. The
    /// netmask must be contiguous ones followed by zeros.
    pub fn from_netmask(
        network: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<Self, Error> {
        let bits = netmask.to_bits();
        let length = bits.count_ones() as u8;
        let expected = match length {
            0 => 0,
            _ => (!0u32) << (32 - length),
        };
        if bits != expected {
            return Err(Error::InvalidNetmask(netmask));
        }
        Ok(Self::new(network, length))
    }

    /// The dotted-quad netmask corresponding to this prefix length.
    pub fn mask(&self) -> Ipv4Addr {
        match self.length {
            0 => Ipv4Addr::UNSPECIFIED,
            _ => Ipv4Addr::from_bits((!0u32) << (32 - self.length)),
        }
    }

    pub fn unset_host_bits(&mut self) {
        let mask = match self.length {
            0 => 0,
            _ => (!0u32) << (32 - self.length),
        };

        self.value = Ipv4Addr::from_bits(self.value.to_bits() & mask)
    }

    /// Check whether an address falls within this prefix.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        if self.length == 0 {
            // /0 contains everything
            return true;
        }
        let mask = (!0u32) << (32 - self.length);
        addr.to_bits() & mask == self.value.to_bits()
    }

    /// Check if this prefix is contained within another prefix.
    /// Returns true if this prefix is equal to or more specific than the
    /// other.
    pub fn within(&self, other: &Prefix4) -> bool {
        if self.length < other.length {
            return false;
        }
        other.contains(self.value)
    }

    /// The adjacent sibling prefix at the same length. Together a prefix and
    /// its buddy form an exact block one bit shorter. Returns `None` for /0,
    /// which has no sibling.
    pub fn buddy(&self) -> Option<Prefix4> {
        if self.length == 0 {
            return None;
        }
        let flip = 1u32 << (32 - self.length);
        Some(Prefix4 {
            value: Ipv4Addr::from_bits(self.value.to_bits() ^ flip),
            length: self.length,
        })
    }

    /// The covering prefix one bit shorter.
    pub fn supernet(&self) -> Option<Prefix4> {
        if self.length == 0 {
            return None;
        }
        Some(Prefix4::new(self.value, self.length - 1))
    }

    /// True when this prefix occupies the numerically lower half of its
    /// supernet block.
    pub fn is_lower_half(&self) -> bool {
        match self.length {
            0 => false,
            _ => self.value.to_bits() & (1u32 << (32 - self.length)) == 0,
        }
    }
}

impl fmt::Display for Prefix4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix4 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) =
            s.split_once('/').ok_or("malformed prefix".to_string())?;

        Ok(Self {
            value: value
                .parse()
                .map_err(|_| "malformed ip addr".to_string())?,
            length: length
                .parse()
                .map_err(|_| "malformed length".to_string())?,
        })
    }
}

/// How a route entered the routing system. Used as a decision tie break,
/// ranked IGP > EGP > UNK.
#[derive(
    Debug,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    PartialOrd,
    Ord,
    JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Origin {
    Igp,
    Egp,
    Unk,
}

impl Origin {
    /// Numeric rank for bestpath selection, higher is better.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Igp => 2,
            Self::Egp => 1,
            Self::Unk => 0,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Igp => write!(f, "IGP"),
            Self::Egp => write!(f, "EGP"),
            Self::Unk => write!(f, "UNK"),
        }
    }
}

/// Forwarding attributes carried by an update message. Two routes are
/// equivalent for aggregation purposes when all four attributes match.
#[derive(
    Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash, JsonSchema,
)]
pub struct RouteAttrs {
    pub origin: Origin,
    pub local_pref: u32,
    pub as_path: Vec<u32>,
    pub self_origin: bool,
}

/// A candidate path to a prefix: the neighbor it was learned from (which is
/// also the next hop) plus its attributes. `seq` is the update log sequence
/// number of the announcement that produced this route and orders routes by
/// arrival.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, JsonSchema)]
pub struct Route {
    pub neighbor: Ipv4Addr,
    pub attrs: RouteAttrs,
    pub seq: u64,
}

// Define a basic ordering on routes so table iteration is deterministic
impl PartialOrd for Route {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Route {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.neighbor != other.neighbor {
            return self.neighbor.cmp(&other.neighbor);
        }
        self.seq.cmp(&other.seq)
    }
}
