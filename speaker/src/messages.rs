// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message types exchanged between neighboring speakers.
//!
//! Every message travels in a JSON envelope of the form
//! `{"src": .., "dst": .., "type": .., "msg": ..}` where the payload shape
//! is selected by the `type` discriminator. The envelope is modeled as a
//! tagged sum type rather than probed field-by-field.

use crate::error::Error;
use rib::{Origin, Prefix4, Route, RouteAttrs};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// The maximum encoded size of a message accepted from a channel.
pub const MAX_MESSAGE_SIZE: usize = 65535;

/// The outer message envelope. For routing messages `src` and `dst` are
/// the link addresses of the exchanging speakers; for data messages `dst`
/// is the final destination address.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, JsonSchema)]
pub struct Envelope {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    #[serde(flatten)]
    pub message: Message,
}

impl Envelope {
    /// The reply sent when a message cannot be routed or acted on: the
    /// original `src`/`dst` reversed with a `no route` discriminator.
    pub fn no_route(&self) -> Envelope {
        Envelope {
            src: self.dst,
            dst: self.src,
            message: Message::NoRoute(serde_json::Value::Object(
                Default::default(),
            )),
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_wire(buf: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(buf)?)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.message.title(),
            self.src,
            self.dst
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, JsonSchema)]
#[serde(tag = "type", content = "msg")]
pub enum Message {
    /// Announce a route to a prefix.
    #[serde(rename = "update")]
    Update(UpdateMessage),

    /// Withdraw a previously announced route.
    #[serde(rename = "revoke")]
    Revoke(RevokeMessage),

    /// A data packet to be forwarded along the best known path. The payload
    /// is opaque to the speaker; forwarding is driven by the envelope `dst`.
    #[serde(rename = "data")]
    Data(serde_json::Value),

    /// Request a copy of this speaker's forwarding table.
    #[serde(rename = "dump")]
    Dump(serde_json::Value),

    /// The response to a dump request.
    #[serde(rename = "table")]
    Table(Vec<TableEntry>),

    /// No usable route, or the message could not be acted on.
    #[serde(rename = "no route")]
    NoRoute(serde_json::Value),
}

impl Message {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Update(_) => "update",
            Self::Revoke(_) => "revoke",
            Self::Data(_) => "data",
            Self::Dump(_) => "dump",
            Self::Table(_) => "table",
            Self::NoRoute(_) => "no route",
        }
    }
}

/// Update payload. Field names follow the wire protocol.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, JsonSchema)]
pub struct UpdateMessage {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub origin: Origin,
    pub localpref: u32,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
    #[serde(rename = "selfOrigin")]
    pub self_origin: bool,
}

impl UpdateMessage {
    pub fn prefix(&self) -> Result<Prefix4, Error> {
        Ok(Prefix4::from_netmask(self.network, self.netmask)?)
    }

    pub fn attrs(&self) -> RouteAttrs {
        RouteAttrs {
            origin: self.origin,
            local_pref: self.localpref,
            as_path: self.as_path.clone(),
            self_origin: self.self_origin,
        }
    }

    /// The update forwarded onward for this announcement: our ASN is
    /// prepended to the path and the route is no longer self-originated
    /// from the recipient's point of view. Everything else travels as
    /// received.
    pub fn forwarded(&self, asn: u32) -> Self {
        let mut as_path = Vec::with_capacity(self.as_path.len() + 1);
        as_path.push(asn);
        as_path.extend_from_slice(&self.as_path);
        Self {
            as_path,
            self_origin: false,
            ..self.clone()
        }
    }
}

/// Revoke payload.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, JsonSchema)]
pub struct RevokeMessage {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl RevokeMessage {
    pub fn prefix(&self) -> Result<Prefix4, Error> {
        Ok(Prefix4::from_netmask(self.network, self.netmask)?)
    }
}

impl From<Prefix4> for RevokeMessage {
    fn from(prefix: Prefix4) -> Self {
        Self {
            network: prefix.value,
            netmask: prefix.mask(),
        }
    }
}

/// One row of a table dump: the prefix, the neighbor it was learned from
/// (the next hop) and the route attributes.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, JsonSchema)]
pub struct TableEntry {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub peer: Ipv4Addr,
    pub origin: Origin,
    pub localpref: u32,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
    #[serde(rename = "selfOrigin")]
    pub self_origin: bool,
}

impl From<(Prefix4, Route)> for TableEntry {
    fn from((prefix, route): (Prefix4, Route)) -> Self {
        Self {
            network: prefix.value,
            netmask: prefix.mask(),
            peer: route.neighbor,
            origin: route.attrs.origin,
            localpref: route.attrs.local_pref,
            as_path: route.attrs.as_path,
            self_origin: route.attrs.self_origin,
        }
    }
}
